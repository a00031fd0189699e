//! Knobs every resolver reads.

use chrono::{DateTime, Utc};

pub const DEFAULT_TOPIC_DAYS: u32 = 90;
pub const DEFAULT_TOPIC_SOUL_LIMIT: usize = 1000;

/// Widest topic window a resolver will walk, one bucket per day.
pub const MAX_TOPIC_DAYS: u32 = 3660;

/// Resolution parameters. `now` is explicit so a resolution is a pure
/// function of the store snapshot and these options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub now: DateTime<Utc>,
    /// Width of the day-bucket window topic resolution walks.
    pub topic_days: u32,
    /// Topic accumulation stops once this many souls are collected.
    pub topic_soul_limit: usize,
}

impl QueryOptions {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            topic_days: DEFAULT_TOPIC_DAYS,
            topic_soul_limit: DEFAULT_TOPIC_SOUL_LIMIT,
        }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}
