//! # nab-graph
//!
//! Store adapters for the listing engine.
//!
//! This crate provides:
//! - `MemoryScope`: canonical in-memory graph with JSON snapshots and
//!   invalidation broadcast
//! - `TimeoutScope`: read deadlines over any `GraphScope`
//!
//! Replication and durability are not modeled; the engine only needs the
//! read capabilities of `nab_kernel::GraphScope`.

pub mod memory;
pub mod timeout;

pub use memory::{MemoryScope, Snapshot, SnapshotError};
pub use timeout::TimeoutScope;
