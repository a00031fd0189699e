//! # nab-oracle
//!
//! Route table and oracles for the listing engine.
//!
//! ## Architecture
//!
//! ```text
//! path ─► OracleRegistry ─► Oracle ─► Route (priority desc, predicate)
//!                              │
//!                              ├─► ResultCache   ← coalesce / retain by TTL
//!                              ├─► Semaphore     ← concurrency ceiling
//!                              ▼
//!                        RouteHandler ─► nab_query ─► nab_rank
//!                              │
//!                              ▼
//!                        assembler ─► Listing | VoteCounts
//! ```
//!
//! The standard oracles are [`indexer`] (listings) and [`tabulator`]
//! (vote tallies); [`EngineConfig::registry`] builds both.

pub mod assembler;
pub mod cache;
pub mod config;
pub mod indexer;
pub mod oracle;
pub mod output;
pub mod route;
pub mod state;
pub mod tabulator;

pub use assembler::{ListingHeader, assemble, serialize_listing, tab_path, tab_paths};
pub use cache::{CacheKey, ResultCache};
pub use config::{ConfigError, EngineConfig};
pub use oracle::{Oracle, OracleRegistry, OracleSettings, normalize_path};
pub use output::OracleOutput;
pub use route::{Predicate, Route, RouteHandler, RouteMatch, RouteRequest};
pub use state::RequestState;
