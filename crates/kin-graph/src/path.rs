//! Path search over the relation matrix.
//!
//! Two searches are provided:
//! - [`shortest_path`]: label-setting search for non-negative weights.
//!   Vertex selection is a linear scan, ties go to the lowest index.
//! - [`relaxation_path`]: edge relaxation that tolerates negative weights
//!   and reports negative cycles.
//!
//! Parent→child edges are directed, so neither search walks from a child
//! up to its parent. Ancestor queries go through [`crate::lineage`].

use crate::weighted::WeightedGraph;
use kin_core::ModelError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of a path search between two vertex indexes.
///
/// An unreachable target has an empty `path` and no `distance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPath {
    pub distance: Option<i64>,
    pub path: Vec<usize>,
    pub has_negative_cycle: bool,
}

impl IndexPath {
    pub fn unreachable() -> Self {
        Self {
            distance: None,
            path: Vec::new(),
            has_negative_cycle: false,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.distance.is_some()
    }
}

/// Distances and predecessors from a single source after relaxation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relaxation {
    pub source: usize,
    pub distance: Vec<Option<i64>>,
    pub predecessor: Vec<Option<usize>>,
    pub has_negative_cycle: bool,
}

impl Relaxation {
    /// Walks predecessors back from `target`.
    ///
    /// A chain that breaks before reaching the source is reported as unreachable.
    pub fn path_to(&self, target: usize) -> IndexPath {
        if self.has_negative_cycle {
            return IndexPath {
                has_negative_cycle: true,
                ..IndexPath::unreachable()
            };
        }
        let Some(distance) = self.distance.get(target).copied().flatten() else {
            return IndexPath::unreachable();
        };
        match walk_back(&self.predecessor, self.source, target) {
            Some(path) => IndexPath {
                distance: Some(distance),
                path,
                has_negative_cycle: false,
            },
            None => IndexPath::unreachable(),
        }
    }
}

/// Finds the cheapest path from `source` to `target` over positive-weight edges.
pub fn shortest_path<G>(graph: &G, source: usize, target: usize) -> Result<IndexPath, ModelError>
where
    G: WeightedGraph + ?Sized,
{
    let size = graph.vertex_count();
    check_bounds(source, target, size)?;

    let mut distance: Vec<Option<i64>> = vec![None; size];
    let mut previous: Vec<Option<usize>> = vec![None; size];
    let mut visited = vec![false; size];
    distance[source] = Some(0);

    for _ in 0..size {
        // Unvisited vertex with the smallest tentative distance; strict `<`
        // keeps the lowest index on ties.
        let mut current: Option<(usize, i64)> = None;
        for (vertex, tentative) in distance.iter().enumerate() {
            if visited[vertex] {
                continue;
            }
            if let Some(d) = *tentative {
                if current.map_or(true, |(_, best)| d < best) {
                    current = Some((vertex, d));
                }
            }
        }

        let Some((vertex, base)) = current else {
            break;
        };
        visited[vertex] = true;
        if vertex == target {
            break;
        }

        for next in 0..size {
            let weight = graph.edge_weight(vertex, next);
            if weight <= 0 {
                continue;
            }
            let candidate = base + weight;
            if distance[next].map_or(true, |d| candidate < d) {
                distance[next] = Some(candidate);
                previous[next] = Some(vertex);
            }
        }
    }

    let Some(total) = distance[target] else {
        debug!("No path from {} to {}", source, target);
        return Ok(IndexPath::unreachable());
    };

    Ok(match walk_back(&previous, source, target) {
        Some(path) => IndexPath {
            distance: Some(total),
            path,
            has_negative_cycle: false,
        },
        None => IndexPath::unreachable(),
    })
}

/// Relaxes every edge up to `V - 1` times from `source`, then runs one more
/// pass to detect a negative cycle reachable from the source.
pub fn relax_from<G>(graph: &G, source: usize) -> Result<Relaxation, ModelError>
where
    G: WeightedGraph + ?Sized,
{
    let size = graph.vertex_count();
    check_bounds(source, source, size)?;

    let edges: Vec<(usize, usize, i64)> = (0..size)
        .flat_map(|from| (0..size).map(move |to| (from, to)))
        .filter_map(|(from, to)| {
            let weight = graph.edge_weight(from, to);
            (weight != 0).then_some((from, to, weight))
        })
        .collect();

    let mut distance: Vec<Option<i64>> = vec![None; size];
    let mut predecessor: Vec<Option<usize>> = vec![None; size];
    distance[source] = Some(0);

    for _ in 1..size {
        let mut changed = false;
        for &(from, to, weight) in &edges {
            if let Some(base) = distance[from] {
                let candidate = base + weight;
                if distance[to].map_or(true, |d| candidate < d) {
                    distance[to] = Some(candidate);
                    predecessor[to] = Some(from);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let has_negative_cycle = edges.iter().any(|&(from, to, weight)| {
        matches!((distance[from], distance[to]), (Some(base), Some(d)) if base + weight < d)
    });

    Ok(Relaxation {
        source,
        distance,
        predecessor,
        has_negative_cycle,
    })
}

/// Path search built on [`relax_from`]. Used for indirect-relation queries.
pub fn relaxation_path<G>(graph: &G, source: usize, target: usize) -> Result<IndexPath, ModelError>
where
    G: WeightedGraph + ?Sized,
{
    check_bounds(source, target, graph.vertex_count())?;
    Ok(relax_from(graph, source)?.path_to(target))
}

fn walk_back(previous: &[Option<usize>], source: usize, target: usize) -> Option<Vec<usize>> {
    let mut path = vec![target];
    let mut current = target;

    while current != source {
        // A chain longer than the vertex count means the predecessors loop.
        if path.len() > previous.len() {
            return None;
        }
        current = previous[current]?;
        path.push(current);
    }

    path.reverse();
    Some(path)
}

fn check_bounds(source: usize, target: usize, size: usize) -> Result<(), ModelError> {
    if source >= size || target >= size {
        return Err(ModelError::IndexOutOfBounds {
            row: source,
            col: target,
            size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0 -> 1 (parent), 1 <-> 2 (spouse)
    fn scenario_a() -> Vec<Vec<i64>> {
        vec![vec![0, 1, 0], vec![0, 0, 2], vec![0, 2, 0]]
    }

    #[test]
    fn test_shortest_path_scenario_a() {
        let result = shortest_path(&scenario_a(), 0, 2).unwrap();
        assert_eq!(result.path, vec![0, 1, 2]);
        assert_eq!(result.distance, Some(3));
        assert!(!result.has_negative_cycle);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let result = shortest_path(&scenario_a(), 1, 1).unwrap();
        assert_eq!(result.distance, Some(0));
        assert_eq!(result.path, vec![1]);
    }

    #[test]
    fn test_directed_edges_block_upward_paths() {
        // Child 1 cannot reach parent 0.
        let result = shortest_path(&scenario_a(), 2, 0).unwrap();
        assert!(!result.is_reachable());
        assert!(result.path.is_empty());
    }

    #[test]
    fn test_disconnected_is_unreachable_not_error() {
        let graph = vec![vec![0, 1, 0, 0], vec![0, 0, 0, 0], vec![0, 0, 0, 2], vec![0, 0, 2, 0]];
        assert_eq!(shortest_path(&graph, 0, 3).unwrap(), IndexPath::unreachable());
        assert_eq!(relaxation_path(&graph, 0, 3).unwrap(), IndexPath::unreachable());
    }

    #[test]
    fn test_tie_break_prefers_lowest_index() {
        // Two equal-cost routes 0 -> 1 -> 3 and 0 -> 2 -> 3.
        let graph = vec![
            vec![0, 1, 1, 0],
            vec![0, 0, 0, 1],
            vec![0, 0, 0, 1],
            vec![0, 0, 0, 0],
        ];
        let result = shortest_path(&graph, 0, 3).unwrap();
        assert_eq!(result.path, vec![0, 1, 3]);
        assert_eq!(result.distance, Some(2));
    }

    #[test]
    fn test_prefers_cheaper_longer_route() {
        // 0 -> 2 directly costs 5, 0 -> 1 -> 2 costs 2.
        let graph = vec![vec![0, 1, 5], vec![0, 0, 1], vec![0, 0, 0]];
        let result = shortest_path(&graph, 0, 2).unwrap();
        assert_eq!(result.path, vec![0, 1, 2]);
        assert_eq!(result.distance, Some(2));
    }

    #[test]
    fn test_distance_non_decreasing_along_path() {
        let graph = vec![
            vec![0, 1, 0, 0, 0],
            vec![0, 0, 2, 0, 0],
            vec![0, 2, 0, 1, 0],
            vec![0, 0, 0, 0, 1],
            vec![0, 0, 0, 0, 0],
        ];
        let full = shortest_path(&graph, 0, 4).unwrap();
        let mut last = 0;
        for &hop in &full.path {
            let d = shortest_path(&graph, 0, hop).unwrap().distance.unwrap();
            assert!(d >= last);
            last = d;
        }
        assert_eq!(last, full.distance.unwrap());
    }

    #[test]
    fn test_out_of_bounds_is_hard_error() {
        assert!(matches!(
            shortest_path(&scenario_a(), 0, 3),
            Err(ModelError::IndexOutOfBounds { size: 3, .. })
        ));
        assert!(relax_from(&scenario_a(), 7).is_err());
    }

    #[test]
    fn test_relaxation_matches_shortest_path_on_positive_weights() {
        let graph = scenario_a();
        for source in 0..3 {
            for target in 0..3 {
                let a = shortest_path(&graph, source, target).unwrap();
                let b = relaxation_path(&graph, source, target).unwrap();
                assert_eq!(a.distance, b.distance, "{} -> {}", source, target);
                assert!(!b.has_negative_cycle);
            }
        }
    }

    #[test]
    fn test_relaxation_handles_negative_edge() {
        // 0 -> 1 costs 4, 0 -> 2 -> 1 costs 5 + (-3) = 2
        let graph = vec![vec![0, 4, 5], vec![0, 0, 0], vec![0, -3, 0]];
        let result = relaxation_path(&graph, 0, 1).unwrap();
        assert_eq!(result.path, vec![0, 2, 1]);
        assert_eq!(result.distance, Some(2));
    }

    #[test]
    fn test_negative_cycle_flag() {
        // 0 -> 1 -> 2 -> 1 with a negative loop between 1 and 2.
        let graph = vec![vec![0, 1, 0], vec![0, 0, -2], vec![0, 1, 0]];
        let relaxation = relax_from(&graph, 0).unwrap();
        assert!(relaxation.has_negative_cycle);

        let result = relaxation_path(&graph, 0, 2).unwrap();
        assert!(result.has_negative_cycle);
        assert!(result.path.is_empty());
        assert_eq!(result.distance, None);
    }

    #[test]
    fn test_positive_domain_never_flags_cycle() {
        // Spouse edges form a 2-cycle of positive weight.
        let relaxation = relax_from(&scenario_a(), 0).unwrap();
        assert!(!relaxation.has_negative_cycle);
        assert_eq!(relaxation.distance, vec![Some(0), Some(1), Some(3)]);
        assert_eq!(relaxation.predecessor, vec![None, Some(0), Some(1)]);
    }

    #[test]
    fn test_broken_predecessor_chain_is_unreachable() {
        let relaxation = Relaxation {
            source: 0,
            distance: vec![Some(0), Some(1), Some(2)],
            predecessor: vec![None, None, Some(1)],
            has_negative_cycle: false,
        };
        assert_eq!(relaxation.path_to(2), IndexPath::unreachable());
    }
}
