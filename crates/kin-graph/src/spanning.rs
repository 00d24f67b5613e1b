//! Spanning structures and connected components.
//!
//! [`minimum_connecting_edges`] grows a single tree from vertex 0.
//! [`spanning_forest`] treats every relation as undirected and returns both
//! the forest edges and the component partition the rest of the system calls
//! sub-families.

use crate::weighted::WeightedGraph;
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An edge between two vertex indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedEdge {
    pub from: usize,
    pub to: usize,
    pub weight: i64,
}

impl WeightedEdge {
    pub fn new(from: usize, to: usize, weight: i64) -> Self {
        Self { from, to, weight }
    }
}

/// Forest edges plus the vertex groups they span.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forest {
    pub edges: Vec<WeightedEdge>,
    pub groups: Vec<Vec<usize>>,
}

/// Greedy tree grown from vertex 0 over positive directed weights.
///
/// Each step scans included `i` against excluded `j` in index order and takes
/// the first minimum `graph[i][j]`. Stops early if nothing connects, so a
/// disconnected graph yields the tree of vertex 0's reachable part.
pub fn minimum_connecting_edges<G>(graph: &G) -> Vec<WeightedEdge>
where
    G: WeightedGraph + ?Sized,
{
    let size = graph.vertex_count();
    if size == 0 {
        return Vec::new();
    }

    let mut included = vec![false; size];
    included[0] = true;
    let mut edges = Vec::with_capacity(size - 1);

    while edges.len() < size - 1 {
        let mut best: Option<WeightedEdge> = None;
        for from in (0..size).filter(|&i| included[i]) {
            for to in (0..size).filter(|&j| !included[j]) {
                let weight = graph.edge_weight(from, to);
                if weight > 0 && best.map_or(true, |b| weight < b.weight) {
                    best = Some(WeightedEdge::new(from, to, weight));
                }
            }
        }

        let Some(edge) = best else {
            break;
        };
        included[edge.to] = true;
        edges.push(edge);
    }

    edges
}

/// One undirected edge per related pair `i < j`.
///
/// The weight is whichever direction is nonzero, or the smaller of the two.
pub fn undirected_edges<G>(graph: &G) -> Vec<WeightedEdge>
where
    G: WeightedGraph + ?Sized,
{
    let size = graph.vertex_count();
    let mut edges = Vec::new();

    for i in 0..size {
        for j in (i + 1)..size {
            let weight = match (graph.edge_weight(i, j), graph.edge_weight(j, i)) {
                (0, 0) => continue,
                (w, 0) | (0, w) => w,
                (a, b) => a.min(b),
            };
            edges.push(WeightedEdge::new(i, j, weight));
        }
    }

    edges
}

/// Minimum spanning forest over the undirected view of the graph.
///
/// Groups are ordered by their smallest index; members inside a group are
/// ascending.
pub fn spanning_forest<G>(graph: &G) -> Forest
where
    G: WeightedGraph + ?Sized,
{
    let size = graph.vertex_count();
    let mut candidates = undirected_edges(graph);
    // Stable, so equal weights keep (i, j) order.
    candidates.sort_by_key(|edge| edge.weight);

    let mut sets = UnionFind::<usize>::new(size);
    let mut edges = Vec::new();
    for edge in candidates {
        if sets.union(edge.from, edge.to) {
            edges.push(edge);
        }
    }

    let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut root_order = Vec::new();
    for vertex in 0..size {
        let root = sets.find_mut(vertex);
        by_root
            .entry(root)
            .or_insert_with(|| {
                root_order.push(root);
                Vec::new()
            })
            .push(vertex);
    }

    let groups = root_order
        .into_iter()
        .filter_map(|root| by_root.remove(&root))
        .collect();

    Forest { edges, groups }
}

/// Vertex groups of [`spanning_forest`].
pub fn partition<G>(graph: &G) -> Vec<Vec<usize>>
where
    G: WeightedGraph + ?Sized,
{
    spanning_forest(graph).groups
}
