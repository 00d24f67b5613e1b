//! Dense weighted adjacency matrix.
//!
//! The matrix is the structure the path and spanning algorithms read. It
//! keeps a bijection between member ids and the dense indexes `0..size`.

use crate::error::{ModelError, Result};
use crate::relation::NO_RELATION;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// N×N relation weights plus the member id ↔ index mapping.
///
/// Invariants: `weights` is square with dimension `ids.len()`, `index` is the
/// inverse of `ids`, and the diagonal is always zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMatrix {
    /// Member id at each index.
    ids: Vec<String>,

    /// Member id to index.
    index: HashMap<String, usize>,

    /// Row-major weights, `weights[from][to]`.
    weights: Vec<Vec<u8>>,
}

impl RelationMatrix {
    /// Creates an empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn size(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Appends a zero row and column for a new member.
    ///
    /// Returns the member's index, which is always the previous size.
    pub fn add_member(&mut self, id: impl Into<String>) -> Result<usize> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(ModelError::DuplicateMember(id));
        }

        let index = self.ids.len();
        for row in &mut self.weights {
            row.push(NO_RELATION);
        }
        self.weights.push(vec![NO_RELATION; index + 1]);
        self.index.insert(id.clone(), index);
        self.ids.push(id);

        Ok(index)
    }

    /// Removes a member's row and column and shifts every higher index down by one.
    ///
    /// Returns the index the member had, or `None` if it was unknown.
    pub fn remove_member(&mut self, id: &str) -> Option<usize> {
        let removed = self.index.remove(id)?;

        self.ids.remove(removed);
        self.weights.remove(removed);
        for row in &mut self.weights {
            row.remove(removed);
        }
        for (position, member_id) in self.ids.iter().enumerate().skip(removed) {
            self.index.insert(member_id.clone(), position);
        }

        Some(removed)
    }

    /// Sets the weight of the directed edge `from -> to`.
    pub fn set_edge(&mut self, from: usize, to: usize, weight: u8) -> Result<()> {
        self.check_bounds(from, to)?;
        if from == to && weight != NO_RELATION {
            return Err(ModelError::SelfLoop(self.ids[from].clone()));
        }
        *self.cell_mut(from, to)? = weight;
        Ok(())
    }

    /// Removes the directed edge `from -> to`.
    pub fn clear_edge(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_bounds(from, to)?;
        *self.cell_mut(from, to)? = NO_RELATION;
        Ok(())
    }

    /// Weight of `from -> to`, or `None` when either index is out of range.
    pub fn weight(&self, from: usize, to: usize) -> Option<u8> {
        self.weights.get(from)?.get(to).copied()
    }

    /// Gets the index of a member id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Gets the member id at an index.
    pub fn id_at(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    /// Member ids in index order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Raw rows, for algorithms that scan the whole matrix.
    pub fn rows(&self) -> &[Vec<u8>] {
        &self.weights
    }

    /// Iterates over all nonzero entries as `(from, to, weight)`, row by row.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        self.weights.iter().enumerate().flat_map(|(from, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, w)| **w != NO_RELATION)
                .map(move |(to, w)| (from, to, *w))
        })
    }

    /// Number of nonzero entries.
    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Verifies the structural invariants of the matrix.
    pub fn check_invariants(&self) -> Result<()> {
        let size = self.ids.len();
        if self.index.len() != size {
            return Err(ModelError::InvariantViolation(format!(
                "index map has {} entries for {} members",
                self.index.len(),
                size
            )));
        }
        for (position, id) in self.ids.iter().enumerate() {
            if self.index.get(id) != Some(&position) {
                return Err(ModelError::InvariantViolation(format!(
                    "member {} is not mapped to index {}",
                    id, position
                )));
            }
        }
        if self.weights.len() != size || self.weights.iter().any(|row| row.len() != size) {
            return Err(ModelError::InvariantViolation(format!(
                "matrix is not {}x{}",
                size, size
            )));
        }
        if let Some(i) = (0..size).find(|&i| self.weight(i, i) != Some(NO_RELATION)) {
            return Err(ModelError::SelfLoop(self.ids[i].clone()));
        }
        Ok(())
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<()> {
        let size = self.size();
        if row >= size || col >= size {
            return Err(ModelError::IndexOutOfBounds { row, col, size });
        }
        Ok(())
    }

    /// A stored cell, which a malformed snapshot may lack even within `size`.
    fn cell_mut(&mut self, row: usize, col: usize) -> Result<&mut u8> {
        let size = self.size();
        self.weights
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or(ModelError::IndexOutOfBounds { row, col, size })
    }
}
