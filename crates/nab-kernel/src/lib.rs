//! # nab kernel
//!
//! Vocabulary shared by every layer of the listing engine.
//!
//! ## Architecture
//!
//! ```text
//! PathPattern        ← `:param` / `*splat` patterns, shared with routes
//!     │
//! Soul / NodeType    ← deterministic graph keys and their left inverse
//!     │
//! GraphScope         ← get / souls / count / subscribe over the store
//!     │
//! Thing, VoteCounts  ← per-item metadata derived from nodes
//!     │
//! Listing            ← serialized, ordered result payload
//! ```
//!
//! Nothing here owns storage; adapters implement [`GraphScope`].

pub mod error;
pub mod listing;
pub mod pattern;
pub mod scope;
pub mod soul;
pub mod thing;

pub use error::{QueryError, QueryResult};
pub use listing::{ID_DELIMITER, Listing, MAX_LISTING_SIZE, SOUL_DELIMITER, join_ids, join_tabs};
pub use pattern::{Captures, PathPattern};
pub use scope::{GraphScope, Node, node_i64, node_ref, node_str};
pub use soul::{NodeType, PREFIX, Soul, SoulParams};
pub use thing::{Thing, ThingMeta, VoteCounts};
