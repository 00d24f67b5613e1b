//! The view of a graph the matrix algorithms need.

use kin_core::RelationMatrix;

/// A dense weighted graph addressed by vertex index.
///
/// A weight of zero means "no edge". Callers pass indexes below
/// `vertex_count()`; a cell missing from a malformed matrix reads as no edge.
pub trait WeightedGraph {
    fn vertex_count(&self) -> usize;

    fn edge_weight(&self, from: usize, to: usize) -> i64;
}

impl WeightedGraph for RelationMatrix {
    fn vertex_count(&self) -> usize {
        self.size()
    }

    fn edge_weight(&self, from: usize, to: usize) -> i64 {
        self.weight(from, to).map_or(0, i64::from)
    }
}

impl WeightedGraph for Vec<Vec<i64>> {
    fn vertex_count(&self) -> usize {
        self.len()
    }

    fn edge_weight(&self, from: usize, to: usize) -> i64 {
        self.get(from).and_then(|row| row.get(to)).copied().unwrap_or(0)
    }
}
