//! In-memory storage backend for the todos server.
//!
//! This backend provides:
//! - Lock-free concurrent access via papaya::HashMap
//! - Monotonic id assignment and soft deletes
//! - Write-set transactions for atomic batch inserts
//! - Optional JSON snapshot persistence to a single local file

pub mod snapshot;
pub mod storage;
pub mod transaction;

pub use storage::MemoryStore;
pub use transaction::MemoryTransaction;
