//! Kin Graph - Relationship queries over a family
//!
//! This crate runs the graph algorithms on a [`kin_core::Family`] snapshot.
//! Nothing here mutates the family or touches storage.
//!
//! # Architecture
//!
//! Two views of the family are used:
//! - The relation matrix, for path search and spanning structures
//!   (index-addressed, through [`WeightedGraph`])
//! - The parents/children/spouse lists, for lineage queries and
//!   relationship labels
//!
//! [`GraphService`] is the id-level entry point that ties them together.
//!
//! # Example
//!
//! ```no_run
//! use kin_core::Family;
//! use kin_graph::GraphService;
//!
//! # fn load() -> Family { unimplemented!() }
//! let family = load();
//! let service = GraphService::new();
//!
//! if let Ok(Some(path)) = service.shortest_path(&family, "m1", "m3") {
//!     for step in path.descriptions() {
//!         println!("{}", step);
//!     }
//! }
//! ```

mod classify;
mod lineage;
mod path;
mod query;
mod service;
mod spanning;
mod weighted;

pub use classify::{classify, classify_members, describe_path, Relationship, RelationshipKind};
pub use lineage::{ancestors, cousins, descendants, siblings, traverse, uncles_aunts, Direction, LineageEntry};
pub use path::{relax_from, relaxation_path, shortest_path, IndexPath, Relaxation};
pub use query::{Algorithm, ConnectionEdge, KinRecord, MemberInfo, RelationPath};
pub use service::GraphService;
pub use spanning::{minimum_connecting_edges, partition, spanning_forest, undirected_edges, Forest, WeightedEdge};
pub use weighted::WeightedGraph;
