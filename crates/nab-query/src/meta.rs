//! Per-item metadata: things, vote tallies, thing data, and sorting.

use futures::future::join_all;
use nab_kernel::scope::META_KEY;
use nab_kernel::soul::{self, NodeType};
use nab_kernel::{
    GraphScope, Node, QueryError, QueryResult, Soul, Thing, ThingMeta, VoteCounts, node_i64,
    node_ref, node_str,
};
use nab_rank::{Sort, rank};
use std::collections::BTreeMap;

/// Read the thing at `soul`.
///
/// `None` when the node is missing, has no id or timestamp, or references
/// an op/parent that is not a thing soul.
pub async fn thing(scope: &dyn GraphScope, soul: &Soul) -> QueryResult<Option<Thing>> {
    let Some(node) = scope.get(soul).await? else {
        return Ok(None);
    };
    Ok(thing_from_node(soul, &node))
}

fn thing_from_node(soul: &Soul, node: &Node) -> Option<Thing> {
    let id = node_str(node, "id").filter(|id| !id.is_empty())?;
    let timestamp = node_i64(node, "timestamp")?;

    let op_id = match node_ref(node, "op") {
        Some(op) => Some(referenced_id(soul, "op", &op)?),
        None => None,
    };
    let reply_to_id = match node_ref(node, "replyTo") {
        Some(parent) => Some(referenced_id(soul, "replyTo", &parent)?),
        None => None,
    };

    Some(Thing {
        id: id.to_string(),
        timestamp,
        last_active: node_i64(node, "lastActive"),
        op_id,
        reply_to_id,
    })
}

fn referenced_id(owner: &Soul, field: &str, target: &Soul) -> Option<String> {
    let id = soul::thing_id(target.as_str());
    if id.is_none() {
        tracing::warn!(%owner, field, %target, "reference is not a thing soul");
    }
    id
}

/// Count up votes, down votes and thread comments under a thing.
pub async fn thing_scores(scope: &dyn GraphScope, thing: &Soul) -> QueryResult<VoteCounts> {
    let up = soul::thing_child(thing, NodeType::ThingVotesUp)?;
    let down = soul::thing_child(thing, NodeType::ThingVotesDown)?;
    let comments = soul::thing_child(thing, NodeType::ThingAllComments)?;
    let (up, down, comment) =
        futures::try_join!(scope.count(&up), scope.count(&down), scope.count(&comments))?;
    Ok(VoteCounts::new(up as i64, down as i64, comment as i64))
}

/// Thing plus votes. With a tabulator the votes come from its cached
/// perspective (missing counts read as zero) instead of being recounted.
pub async fn thing_meta(
    scope: &dyn GraphScope,
    thing_soul: &Soul,
    tabulator: Option<&str>,
) -> QueryResult<Option<ThingMeta>> {
    let votes = async {
        match tabulator {
            Some(tabulator) => {
                let counts = soul::thing_vote_counts(thing_soul, tabulator)?;
                Ok(scope
                    .get(&counts)
                    .await?
                    .map(|node| VoteCounts::from_node(&node))
                    .unwrap_or_default())
            }
            None => thing_scores(scope, thing_soul).await,
        }
    };
    let (meta, votes) = futures::try_join!(thing(scope, thing_soul), votes)?;
    Ok(meta.map(|meta| ThingMeta::new(meta, votes)))
}

/// Keep what resolved; drop items that failed or were absent. Invariant
/// violations still abort the whole batch.
fn tolerate<T>(souls: &[Soul], results: Vec<QueryResult<Option<T>>>) -> QueryResult<Vec<T>> {
    let mut out = Vec::with_capacity(results.len());
    for (soul, result) in souls.iter().zip(results) {
        match result {
            Ok(Some(item)) => out.push(item),
            Ok(None) => tracing::debug!(%soul, "dropping undecodable item"),
            Err(err @ QueryError::InvariantViolation(_)) => return Err(err),
            Err(err) => tracing::warn!(%soul, %err, "dropping item whose metadata failed"),
        }
    }
    Ok(out)
}

pub async fn multi_thing(scope: &dyn GraphScope, souls: &[Soul]) -> QueryResult<Vec<Thing>> {
    let results = join_all(souls.iter().map(|soul| thing(scope, soul))).await;
    tolerate(souls, results)
}

pub async fn multi_thing_meta(
    scope: &dyn GraphScope,
    souls: &[Soul],
    tabulator: Option<&str>,
) -> QueryResult<Vec<ThingMeta>> {
    check_tabulator(tabulator)?;
    let results = join_all(souls.iter().map(|soul| thing_meta(scope, soul, tabulator))).await;
    tolerate(souls, results)
}

/// Data node of one thing without store metadata; `None` when absent.
pub async fn thing_data(scope: &dyn GraphScope, thing_id: &str) -> QueryResult<Option<Node>> {
    let data = soul::thing_data(thing_id)?;
    Ok(scope.get(&data).await?.map(|mut node| {
        node.remove(META_KEY);
        node
    }))
}

/// Data nodes keyed by thing id.
pub async fn multi_thing_data(
    scope: &dyn GraphScope,
    thing_ids: &[String],
) -> QueryResult<BTreeMap<String, Option<Node>>> {
    let nodes = futures::future::try_join_all(thing_ids.iter().map(|id| thing_data(scope, id)))
        .await?;
    Ok(thing_ids.iter().cloned().zip(nodes).collect())
}

/// A malformed tabulator would fail every item alike, so it is refused
/// before any item is read.
fn check_tabulator(tabulator: Option<&str>) -> QueryResult<()> {
    match tabulator {
        Some(tabulator) => soul::split_tabulator(tabulator).map(|_| ()),
        None => Ok(()),
    }
}

/// Fetch metadata for `souls` and order it by `sort`.
///
/// Time sorts skip vote lookups. Items whose metadata cannot be read are
/// left out.
pub async fn sort_things(
    scope: &dyn GraphScope,
    souls: &[Soul],
    sort: Sort,
    tabulator: Option<&str>,
) -> QueryResult<Vec<ThingMeta>> {
    check_tabulator(tabulator)?;
    let items = if sort.needs_votes() {
        multi_thing_meta(scope, souls, tabulator).await?
    } else {
        multi_thing(scope, souls)
            .await?
            .into_iter()
            .map(ThingMeta::unvoted)
            .collect()
    };
    Ok(rank(sort, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nab_graph::MemoryScope;
    use serde_json::{Value, json};

    fn put(scope: &MemoryScope, soul: &str, value: Value) {
        scope
            .put(Soul::new(soul), value.as_object().cloned().expect("object"))
            .expect("put");
    }

    fn link(scope: &MemoryScope, set: &str, member: &str) {
        scope.link(Soul::new(set), Soul::new(member)).expect("link");
    }

    #[tokio::test]
    async fn thing_decodes_references_to_ids() {
        let scope = MemoryScope::new();
        put(
            &scope,
            "nab/things/c1",
            json!({
                "id": "c1",
                "timestamp": 20,
                "op": { "#": "nab/things/op" },
                "replyTo": { "#": "nab/things/p" }
            }),
        );
        let thing = thing(&scope, &Soul::new("nab/things/c1"))
            .await
            .expect("read")
            .expect("present");
        assert_eq!(thing.op_id.as_deref(), Some("op"));
        assert_eq!(thing.reply_to_id.as_deref(), Some("p"));
    }

    #[tokio::test]
    async fn undecodable_things_read_as_none() {
        let scope = MemoryScope::new();
        put(&scope, "nab/things/x", json!({ "timestamp": 1 }));
        put(
            &scope,
            "nab/things/y",
            json!({ "id": "y", "timestamp": 1, "op": { "#": "garbage" } }),
        );
        assert!(thing(&scope, &Soul::new("nab/things/x")).await.expect("read").is_none());
        assert!(thing(&scope, &Soul::new("nab/things/y")).await.expect("read").is_none());
        assert!(thing(&scope, &Soul::new("nab/things/z")).await.expect("read").is_none());
    }

    #[tokio::test]
    async fn scores_count_child_sets() {
        let scope = MemoryScope::new();
        link(&scope, "nab/things/a/votesup", "v1");
        link(&scope, "nab/things/a/votesup", "v2");
        link(&scope, "nab/things/a/votesdown", "v3");
        link(&scope, "nab/things/a/allcomments", "nab/things/c");
        let votes = thing_scores(&scope, &Soul::new("nab/things/a"))
            .await
            .expect("scores");
        assert_eq!(votes, VoteCounts::new(2, 1, 1));
        assert_eq!(votes.score, 1);
    }

    #[tokio::test]
    async fn tabulator_perspective_replaces_counting() {
        let scope = MemoryScope::new();
        put(&scope, "nab/things/a", json!({ "id": "a", "timestamp": 1 }));
        link(&scope, "nab/things/a/votesup", "v1");
        put(
            &scope,
            "nab/things/a/votecounts@~t1.t2.",
            json!({ "up": 9, "down": 2, "comment": 4 }),
        );

        let meta = thing_meta(&scope, &Soul::new("nab/things/a"), Some("~t1.t2"))
            .await
            .expect("meta")
            .expect("present");
        assert_eq!(meta.votes, VoteCounts::new(9, 2, 4));

        let meta = thing_meta(&scope, &Soul::new("nab/things/a"), Some("~other.tab"))
            .await
            .expect("meta")
            .expect("present");
        assert_eq!(meta.votes, VoteCounts::default());
    }

    #[tokio::test]
    async fn sort_things_drops_missing_items() {
        let scope = MemoryScope::new();
        put(&scope, "nab/things/a", json!({ "id": "a", "timestamp": 100 }));
        put(&scope, "nab/things/b", json!({ "id": "b", "timestamp": 300 }));
        let souls = vec![
            Soul::new("nab/things/a"),
            Soul::new("nab/things/missing"),
            Soul::new("nab/things/b"),
        ];
        let sorted = sort_things(&scope, &souls, Sort::New, None).await.expect("sort");
        let ids: Vec<&str> = sorted.iter().map(ThingMeta::id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn malformed_tabulator_fails_the_batch() {
        let scope = MemoryScope::new();
        put(&scope, "nab/things/a", json!({ "id": "a", "timestamp": 100 }));
        let souls = vec![Soul::new("nab/things/a")];

        for sort in [Sort::Hot, Sort::New] {
            let err = sort_things(&scope, &souls, sort, Some("~a.b.c"))
                .await
                .expect_err("malformed tabulator");
            assert!(matches!(err, QueryError::UnresolvableQuery(_)), "{sort}: {err}");
        }
    }

    #[tokio::test]
    async fn thing_data_strips_store_metadata() {
        let scope = MemoryScope::new();
        put(
            &scope,
            "nab/things/a/data",
            json!({ "_": { "#": "nab/things/a/data" }, "topic": "art" }),
        );
        let data = multi_thing_data(&scope, &["a".to_string(), "b".to_string()])
            .await
            .expect("data");
        assert_eq!(data["a"].as_ref().and_then(|n| n.get("topic")), Some(&json!("art")));
        assert!(!data["a"].as_ref().expect("present").contains_key("_"));
        assert!(data["b"].is_none());
    }
}
