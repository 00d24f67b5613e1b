//! Records returned by graph queries.
//!
//! Everything here is id-based and serializable, ready for the wire.

use crate::classify::Relationship;
use chrono::NaiveDate;
use kin_core::{Gender, Member, RelationKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Summary of a member for query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub death_date: Option<NaiveDate>,
}

impl From<&Member> for MemberInfo {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.clone(),
            first_name: member.first_name.clone(),
            last_name: member.last_name.clone(),
            gender: member.gender,
            birth_date: member.birth_date,
            death_date: member.death_date,
        }
    }
}

/// A path between two members.
///
/// `relations` has one description per consecutive pair in `path`. An
/// unreachable target gives an empty `path` and no `distance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationPath {
    pub source: String,
    pub target: String,
    pub path: Vec<String>,
    pub relations: Vec<Relationship>,
    pub distance: Option<i64>,
    pub has_negative_cycle: bool,
}

impl RelationPath {
    pub fn is_reachable(&self) -> bool {
        self.distance.is_some()
    }

    /// The descriptions alone, one per step.
    pub fn descriptions(&self) -> Vec<&str> {
        self.relations.iter().map(|r| r.description.as_str()).collect()
    }
}

/// An edge of a spanning structure, by member id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEdge {
    pub from: String,
    pub to: String,
    pub weight: i64,
    pub kind: Option<RelationKind>,
}

/// A relative of the queried member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KinRecord {
    pub member: MemberInfo,
    pub relationship: Relationship,
    /// Hops from the queried member; 0 for same-generation relatives.
    pub generation: usize,
}

/// Path search used by [`crate::GraphService::relation_path`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    #[default]
    Dijkstra,
    BellmanFord,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Dijkstra => write!(f, "dijkstra"),
            Algorithm::BellmanFord => write!(f, "bellman-ford"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(Algorithm::Dijkstra),
            "bellman-ford" | "bellman_ford" | "bellmanford" => Ok(Algorithm::BellmanFord),
            other => Err(format!("unknown algorithm: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("dijkstra".parse::<Algorithm>(), Ok(Algorithm::Dijkstra));
        assert_eq!("Bellman-Ford".parse::<Algorithm>(), Ok(Algorithm::BellmanFord));
        assert_eq!("bellman_ford".parse::<Algorithm>(), Ok(Algorithm::BellmanFord));
        assert!("astar".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::default(), Algorithm::Dijkstra);
    }

    #[test]
    fn test_algorithm_wire_name() {
        let json = serde_json::to_string(&Algorithm::BellmanFord).unwrap();
        assert_eq!(json, "\"bellman-ford\"");
    }
}
