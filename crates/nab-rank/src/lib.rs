//! # nab-rank
//!
//! Ranking engine: each [`Sort`] maps a [`ThingMeta`] to a [`RankKey`] and
//! listings are ordered by ascending key. Keys are pure functions of the
//! thing and its votes; ties keep input order.

use nab_kernel::ThingMeta;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Seconds offset the time-decayed sorts measure age from.
pub const EPOCH_OFFSET_SECONDS: f64 = 1_134_028_003.0;

/// Seconds of age worth one order of magnitude of votes.
pub const DECAY_SECONDS: f64 = 45_000.0;

/// Baseline for threads nobody replied to in the `discussed` sort.
pub const UNDISCUSSED_BASELINE: f64 = 1_000_000_000.0;

/// z for an 80% confidence interval.
pub const WILSON_Z: f64 = 1.281_551_565_545;

/// Named ranking algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    New,
    Old,
    Active,
    Top,
    Comments,
    Discussed,
    Hot,
    Best,
    Controversial,
}

impl Sort {
    pub const ALL: [Sort; 9] = [
        Sort::New,
        Sort::Old,
        Sort::Active,
        Sort::Top,
        Sort::Comments,
        Sort::Discussed,
        Sort::Hot,
        Sort::Best,
        Sort::Controversial,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Sort::New => "new",
            Sort::Old => "old",
            Sort::Active => "active",
            Sort::Top => "top",
            Sort::Comments => "comments",
            Sort::Discussed => "discussed",
            Sort::Hot => "hot",
            Sort::Best => "best",
            Sort::Controversial => "controversial",
        }
    }

    /// Exact lookup, for route predicates that must reject unknown sorts.
    pub fn from_name(name: &str) -> Option<Sort> {
        Self::ALL.into_iter().find(|sort| sort.name() == name)
    }

    /// Lenient lookup: unknown or absent names rank as `new`.
    pub fn or_new(name: Option<&str>) -> Sort {
        name.and_then(Sort::from_name).unwrap_or(Sort::New)
    }

    /// Whether the key reads vote counts. `new` and `old` only need time.
    pub fn needs_votes(&self) -> bool {
        !matches!(self, Sort::New | Sort::Old)
    }

    /// Ascending sort key for `item`.
    pub fn key(&self, item: &ThingMeta) -> RankKey {
        let thing = &item.thing;
        let votes = &item.votes;
        match self {
            Sort::New => RankKey::Int(thing.timestamp.saturating_neg()),
            Sort::Old => RankKey::Int(thing.timestamp),
            Sort::Active => RankKey::Int(thing.last_active.unwrap_or(thing.timestamp).saturating_neg()),
            Sort::Top => RankKey::Int(votes.score.saturating_neg()),
            Sort::Comments => RankKey::Int(votes.comment.saturating_neg()),
            Sort::Discussed => RankKey::Float(discussed_key(votes.comment, thing.timestamp)),
            Sort::Hot => RankKey::Float(hot_key(votes.score, thing.timestamp)),
            Sort::Best => RankKey::Float(-wilson_lower_bound(votes.up, votes.down)),
            Sort::Controversial => RankKey::Float(-controversy(votes.up, votes.down)),
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A sort key; smaller ranks first.
///
/// `top`, `comments` and the time sorts are integer-derived, the rest are
/// floating point. Floats compare with IEEE total order so NaN cannot
/// break the sort.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankKey {
    Int(i64),
    Float(f64),
}

impl RankKey {
    fn as_f64(&self) -> f64 {
        match *self {
            RankKey::Int(v) => v as f64,
            RankKey::Float(v) => v,
        }
    }
}

impl Eq for RankKey {}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (RankKey::Int(a), RankKey::Int(b)) => a.cmp(b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

fn age_seconds(timestamp: i64) -> f64 {
    timestamp as f64 / 1000.0 - EPOCH_OFFSET_SECONDS
}

/// `discussed`: magnitude of the reply count plus recency. Threads without
/// replies get a flat baseline that sinks them below every discussed
/// thread, newest first among themselves.
pub fn discussed_key(comments: i64, timestamp: i64) -> f64 {
    let seconds = age_seconds(timestamp);
    if comments == 0 {
        return UNDISCUSSED_BASELINE - seconds;
    }
    let order = (comments.unsigned_abs().max(1) as f64).log10();
    -(order + seconds / DECAY_SECONDS)
}

/// `hot`: like `discussed` over the score, with the sign of the score
/// multiplying its magnitude so net-negative items lose ground.
pub fn hot_key(score: i64, timestamp: i64) -> f64 {
    let seconds = age_seconds(timestamp);
    let order = (score.unsigned_abs().max(1) as f64).log10();
    let sign = score.signum() as f64;
    -(sign * order + seconds / DECAY_SECONDS)
}

/// Lower bound of the Wilson score interval for `ups` out of `ups + downs`.
/// No votes scores 0.
pub fn wilson_lower_bound(ups: i64, downs: i64) -> f64 {
    let n = ups as f64 + downs as f64;
    if n <= 0.0 {
        return 0.0;
    }
    let z = WILSON_Z;
    let p = ups as f64 / n;
    let left = p + z * z / (2.0 * n);
    let right = z * (p * (1.0 - p) / n + z * z / (4.0 * n * n)).sqrt();
    let under = 1.0 + z * z / n;
    (left - right) / under
}

/// Vote volume raised to how evenly it splits. Needs both ups and downs.
pub fn controversy(ups: i64, downs: i64) -> f64 {
    if ups <= 0 || downs <= 0 {
        return 0.0;
    }
    let magnitude = ups as f64 + downs as f64;
    let balance = if ups > downs {
        downs as f64 / ups as f64
    } else {
        ups as f64 / downs as f64
    };
    magnitude.powf(balance)
}

/// Order `items` by `sort`. Stable: equal keys keep their input order.
pub fn rank(sort: Sort, items: Vec<ThingMeta>) -> Vec<ThingMeta> {
    let mut keyed: Vec<(RankKey, ThingMeta)> = items
        .into_iter()
        .map(|item| (sort.key(&item), item))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nab_kernel::{Thing, VoteCounts};

    fn item(id: &str, timestamp: i64, up: i64, down: i64, comment: i64) -> ThingMeta {
        ThingMeta::new(
            Thing {
                id: id.to_string(),
                timestamp,
                last_active: None,
                op_id: None,
                reply_to_id: None,
            },
            VoteCounts::new(up, down, comment),
        )
    }

    fn ids(items: &[ThingMeta]) -> Vec<&str> {
        items.iter().map(|i| i.id()).collect()
    }

    #[test]
    fn new_and_old_order_by_timestamp() {
        let items = vec![item("a", 5, 0, 0, 0), item("b", 1, 0, 0, 0), item("c", 3, 0, 0, 0)];
        assert_eq!(ids(&rank(Sort::New, items.clone())), vec!["a", "c", "b"]);
        assert_eq!(ids(&rank(Sort::Old, items)), vec!["b", "c", "a"]);
    }

    #[test]
    fn top_orders_by_score() {
        let items = vec![item("a", 0, 2, 0, 0), item("b", 0, 0, 1, 0), item("c", 0, 5, 0, 0)];
        assert_eq!(ids(&rank(Sort::Top, items)), vec!["c", "a", "b"]);
    }

    #[test]
    fn comments_orders_by_reply_count() {
        let items = vec![item("a", 0, 0, 0, 1), item("b", 0, 0, 0, 9), item("c", 0, 0, 0, 4)];
        assert_eq!(ids(&rank(Sort::Comments, items)), vec!["b", "c", "a"]);
    }

    #[test]
    fn active_prefers_last_activity_over_creation() {
        let mut revived = item("old", 10, 0, 0, 0);
        revived.thing.last_active = Some(100);
        let items = vec![item("fresh", 50, 0, 0, 0), revived];
        assert_eq!(ids(&rank(Sort::Active, items)), vec!["old", "fresh"]);
    }

    #[test]
    fn best_without_votes_keeps_input_order() {
        let items = vec![item("x", 3, 0, 0, 0), item("y", 1, 0, 0, 0), item("z", 2, 0, 0, 0)];
        for i in &items {
            assert_eq!(wilson_lower_bound(i.votes.up, i.votes.down), 0.0);
        }
        assert_eq!(ids(&rank(Sort::Best, items)), vec!["x", "y", "z"]);
    }

    #[test]
    fn best_rewards_confidence() {
        assert!(wilson_lower_bound(100, 10) > wilson_lower_bound(10, 1));
        assert!(wilson_lower_bound(10, 1) > wilson_lower_bound(1, 1));
    }

    #[test]
    fn controversial_needs_both_directions() {
        assert_eq!(controversy(10, 0), 0.0);
        assert_eq!(controversy(0, 10), 0.0);
        assert_eq!(controversy(5, 5), 10.0);
        assert!(controversy(50, 50) > controversy(90, 10));

        let items = vec![item("one-sided", 0, 40, 0, 0), item("split", 0, 20, 20, 0)];
        assert_eq!(ids(&rank(Sort::Controversial, items)), vec!["split", "one-sided"]);
    }

    #[test]
    fn discussed_sinks_threads_without_replies() {
        let now = 1_600_000_000_000;
        let items = vec![
            item("quiet-new", now, 0, 0, 0),
            item("busy-old", now - 86_400_000, 0, 0, 3),
            item("quiet-old", now - 86_400_000, 0, 0, 0),
        ];
        assert_eq!(
            ids(&rank(Sort::Discussed, items)),
            vec!["busy-old", "quiet-new", "quiet-old"]
        );
    }

    #[test]
    fn hot_penalizes_negative_scores() {
        let ts = 1_600_000_000_000;
        assert!(hot_key(10, ts) < hot_key(0, ts));
        assert!(hot_key(0, ts) < hot_key(-10, ts));
        assert_eq!(hot_key(1, ts), hot_key(0, ts));
        // A newer item outranks an older one with the same score.
        assert!(hot_key(5, ts + 3_600_000) < hot_key(5, ts));
    }

    #[test]
    fn extreme_counts_and_timestamps_rank_without_overflow() {
        let items = vec![
            item("floor", i64::MIN, i64::MIN, i64::MIN, i64::MIN),
            item("ceiling", i64::MAX, i64::MAX, i64::MAX, i64::MAX),
            item("plain", 0, 1, 0, 1),
        ];
        for sort in Sort::ALL {
            let ranked = rank(sort, items.clone());
            assert_eq!(ranked.len(), 3, "{sort}");
        }

        assert_eq!(ids(&rank(Sort::New, items.clone())), vec!["ceiling", "plain", "floor"]);
        assert_eq!(ids(&rank(Sort::Old, items.clone())), vec!["floor", "plain", "ceiling"]);
        assert_eq!(ids(&rank(Sort::Comments, items)), vec!["ceiling", "plain", "floor"]);
        assert!(wilson_lower_bound(i64::MAX, i64::MAX).is_finite());
        assert!(controversy(i64::MAX, i64::MAX).is_finite());
    }

    #[test]
    fn unknown_sort_names_fall_back_to_new() {
        assert_eq!(Sort::or_new(Some("sideways")), Sort::New);
        assert_eq!(Sort::or_new(None), Sort::New);
        assert_eq!(Sort::or_new(Some("hot")), Sort::Hot);
        assert_eq!(Sort::from_name("sideways"), None);
    }

    #[test]
    fn only_time_sorts_skip_votes() {
        let voteless: Vec<Sort> = Sort::ALL.into_iter().filter(|s| !s.needs_votes()).collect();
        assert_eq!(voteless, vec![Sort::New, Sort::Old]);
    }
}
