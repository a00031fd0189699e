//! Things (posts and comments) and the vote metadata attached to them.
//!
//! Neither is stored by this engine: both are derived from graph nodes on
//! every query.

use crate::scope::{Node, node_i64};
use serde::{Deserialize, Serialize};

/// An immutable post or comment as seen by ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thing {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

/// Vote and reply tallies for one thing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub up: i64,
    pub down: i64,
    pub comment: i64,
    pub score: i64,
}

impl VoteCounts {
    pub fn new(up: i64, down: i64, comment: i64) -> Self {
        Self {
            up,
            down,
            comment,
            score: up.saturating_sub(down),
        }
    }

    /// Read a tabulator's cached tallies. Missing counters read as zero and
    /// a missing score is recomputed from up/down.
    pub fn from_node(node: &Node) -> Self {
        let up = node_i64(node, "up").unwrap_or(0);
        let down = node_i64(node, "down").unwrap_or(0);
        let comment = node_i64(node, "comment").unwrap_or(0);
        let score = node_i64(node, "score").unwrap_or(up.saturating_sub(down));
        Self {
            up,
            down,
            comment,
            score,
        }
    }
}

/// A thing joined with its votes; the unit the ranking engine orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThingMeta {
    #[serde(flatten)]
    pub thing: Thing,
    #[serde(default)]
    pub votes: VoteCounts,
}

impl ThingMeta {
    pub fn new(thing: Thing, votes: VoteCounts) -> Self {
        Self { thing, votes }
    }

    /// A thing ranked only by time carries zero votes.
    pub fn unvoted(thing: Thing) -> Self {
        Self {
            thing,
            votes: VoteCounts::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.thing.id
    }
}
