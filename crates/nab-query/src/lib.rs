//! # nab-query
//!
//! Query algebra over a [`GraphScope`](nab_kernel::GraphScope).
//!
//! ## Architecture
//!
//! ```text
//! single.rs    ← one index family → Empty | Set
//!     │
//! multi.rs     ← value list → union; absent list → Unconstrained
//!     │
//! lens.rs      ← ∩ active dimensions, narrowed by stored sets;
//!     │          spaces = ∪good − ∪bad, nested and cycle-checked
//!     │
//! source.rs    ← item source + sort → candidate souls
//!     │
//! meta.rs      ← things + votes, undecodable items dropped, ranked
//! ```
//!
//! Every resolver is a pure function of the scope snapshot and
//! [`QueryOptions`]. [`Resolved`] keeps "no criterion" and "nothing matched"
//! apart all the way up.

pub mod lens;
pub mod meta;
pub mod multi;
pub mod options;
pub mod resolved;
pub mod single;
pub mod source;

pub use lens::{Lens, Space, multi_lens, multi_space, resolve_lens, resolve_space};
pub use meta::{
    multi_thing, multi_thing_data, multi_thing_meta, sort_things, thing, thing_data, thing_meta,
    thing_scores,
};
pub use multi::{
    multi_author, multi_domain, multi_listing, multi_submission, multi_topic, multi_url,
};
pub use options::{DEFAULT_TOPIC_DAYS, DEFAULT_TOPIC_SOUL_LIMIT, MAX_TOPIC_DAYS, QueryOptions};
pub use resolved::{Resolved, SoulSet};
pub use single::{
    AuthorKind, listing_ids, replies_to_author, single_author, single_domain, single_listing,
    single_submission, single_topic, single_url, topic_day_souls,
};
pub use source::{FALLBACK_TOPIC, ItemSource, ListingRequest, fetch, source_souls};
