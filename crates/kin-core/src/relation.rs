//! Relation kinds and their matrix weights.
//!
//! The weight doubles as the edge cost in path and spanning computations,
//! so a parent/child hop is cheaper than a spouse hop.

use serde::{Deserialize, Serialize};

/// Matrix weight meaning "no edge".
pub const NO_RELATION: u8 = 0;

/// The kind of a direct relation between two members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Directed edge from a parent to a child.
    ParentChild,

    /// Symmetric edge between spouses.
    Spouse,
}

impl RelationKind {
    /// Weight stored in the relation matrix.
    pub fn weight(self) -> u8 {
        match self {
            Self::ParentChild => 1,
            Self::Spouse => 2,
        }
    }

    /// Maps a matrix weight back to a kind. Zero and unknown weights give `None`.
    pub fn from_weight(weight: i64) -> Option<Self> {
        match weight {
            1 => Some(Self::ParentChild),
            2 => Some(Self::Spouse),
            _ => None,
        }
    }

    /// Whether the matrix must hold this edge in both directions.
    pub fn is_symmetric(self) -> bool {
        matches!(self, Self::Spouse)
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ParentChild => "parent_child",
            Self::Spouse => "spouse",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parent_child" | "parent-child" | "parent" | "1" => Ok(Self::ParentChild),
            "spouse" | "2" => Ok(Self::Spouse),
            other => Err(format!("unknown relation kind: {}", other)),
        }
    }
}
