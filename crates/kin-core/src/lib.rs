//! Kin Core - Family data model
//!
//! This crate defines the canonical representation of a family: its members
//! with their parent/child/spouse lists, and the dense relation matrix that
//! the graph algorithms work on. Every mutator on [`Family`] keeps the two
//! views in sync.
//!
//! # Example
//!
//! ```no_run
//! use chrono::{NaiveDate, Utc};
//! use kin_core::{Family, Gender, Member, NewMember};
//!
//! let mut family = Family::new("f1", "Durand", Utc::now());
//!
//! let birth = NaiveDate::from_ymd_opt(1950, 3, 1).unwrap();
//! let alice = Member::new("a", "f1", NewMember::new("Alice", "Durand", birth, Gender::Female));
//! let bob = Member::new("b", "f1", NewMember::new("Bob", "Durand", birth, Gender::Male));
//!
//! family.add_member(alice).unwrap();
//! family.add_member(bob).unwrap();
//! family.add_parent_child("a", "b").unwrap();
//! ```

mod error;
mod family;
mod format;
mod matrix;
mod member;
mod relation;

pub use error::{ModelError, Result};
pub use family::{Family, MemberQuery};
pub use format::{nullable, Metadata};
pub use matrix::RelationMatrix;
pub use member::{Gender, Member, MemberPatch, NewMember};
pub use relation::{RelationKind, NO_RELATION};
