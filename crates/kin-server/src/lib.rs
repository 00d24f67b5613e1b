//! Kin Server - WebSocket server for family graph queries
//!
//! This crate exposes the family registry and the graph queries over
//! JSON-RPC 2.0 on a WebSocket.
//!
//! The server supports:
//! - Multiple concurrent connections
//! - Family, member and relation CRUD
//! - Path, spanning and lineage queries

use kin_store::FamilyRegistry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared registry state across connections.
pub type SharedRegistry = Arc<RwLock<FamilyRegistry>>;

mod handlers;
mod protocol;
mod server;

pub use protocol::{codes, Request, Response, RpcError};
pub use server::{process_message, KinServer, ServerConfig, DEFAULT_PORT};
