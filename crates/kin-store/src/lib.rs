//! Kin Store - Persistence and CRUD for families
//!
//! Families are stored as whole snapshots in a sled database, serialized
//! with bincode. [`FamilyRegistry`] layers the family and member CRUD on
//! top and is what the server and the CLI talk to.

mod error;
mod registry;
mod store;

pub use error::{Result, StoreError};
pub use registry::{FamilyPatch, FamilyRegistry, FamilySummary, NewFamily};
pub use store::FamilyStore;
