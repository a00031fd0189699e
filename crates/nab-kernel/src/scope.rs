//! The narrow capability set the engine consumes from the graph store.
//!
//! The store itself (replication, sync, durability) lives elsewhere. The
//! engine only reads: fetch one node, enumerate a node's member set, count
//! it, and hear about changes.

use crate::error::QueryResult;
use crate::soul::Soul;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

/// Field map of one graph node.
pub type Node = Map<String, Value>;

/// Key under which a node field stores a reference to another soul.
pub const REF_KEY: &str = "#";

/// Node fields that carry store metadata rather than content.
pub const META_KEY: &str = "_";

/// Read capabilities of an eventually-consistent graph store.
///
/// Every method is a suspension point. Implementations own timeouts and
/// report store failures as [`crate::QueryError::UpstreamUnavailable`].
#[async_trait]
pub trait GraphScope: Send + Sync {
    /// Fetch one node, `None` when nothing is stored under `soul`.
    async fn get(&self, soul: &Soul) -> QueryResult<Option<Node>>;

    /// Enumerate the souls referenced by the member set stored at `soul`.
    /// A missing set is an empty set.
    async fn souls(&self, soul: &Soul) -> QueryResult<Vec<Soul>>;

    /// Number of members in the set stored at `soul`.
    async fn count(&self, soul: &Soul) -> QueryResult<u64> {
        Ok(self.souls(soul).await?.len() as u64)
    }

    /// Invalidation notices: each message is a soul that changed. Only used
    /// to trigger client refreshes; resolvers never listen.
    fn subscribe(&self) -> broadcast::Receiver<Soul>;
}

/// Read a `{"#": soul}` reference stored in `field`.
pub fn node_ref(node: &Node, field: &str) -> Option<Soul> {
    node.get(field)?
        .get(REF_KEY)?
        .as_str()
        .filter(|raw| !raw.is_empty())
        .map(Soul::new)
}

/// Read a numeric field, accepting JSON numbers and numeric strings.
/// Values outside the `i64` range read as absent.
pub fn node_i64(node: &Node, field: &str) -> Option<i64> {
    match node.get(field)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(truncate),
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let f = f.trunc();
    (f.is_finite() && (-LIMIT..LIMIT).contains(&f)).then_some(f as i64)
}

pub fn node_str<'a>(node: &'a Node, field: &str) -> Option<&'a str> {
    node.get(field)?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: Value) -> Node {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn refs_are_read_from_hash_objects() {
        let n = node(json!({ "op": { "#": "nab/things/a" }, "replyTo": "plain" }));
        assert_eq!(node_ref(&n, "op"), Some(Soul::new("nab/things/a")));
        assert_eq!(node_ref(&n, "replyTo"), None);
        assert_eq!(node_ref(&n, "missing"), None);
    }

    #[test]
    fn numbers_accept_strings_and_floats() {
        let n = node(json!({ "a": 5, "b": "12", "c": 7.9, "d": "x", "e": true }));
        assert_eq!(node_i64(&n, "a"), Some(5));
        assert_eq!(node_i64(&n, "b"), Some(12));
        assert_eq!(node_i64(&n, "c"), Some(7));
        assert_eq!(node_i64(&n, "d"), None);
        assert_eq!(node_i64(&n, "e"), None);
    }

    #[test]
    fn numbers_outside_i64_read_as_absent() {
        let n = node(json!({ "low": -1e30, "high": 1e30, "text": "9.3e18", "edge": -9.2e18 }));
        assert_eq!(node_i64(&n, "low"), None);
        assert_eq!(node_i64(&n, "high"), None);
        assert_eq!(node_i64(&n, "text"), None);
        assert_eq!(node_i64(&n, "edge"), Some(-9_200_000_000_000_000_000));
    }
}
