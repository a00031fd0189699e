//! Item sources: where a listing's candidate things come from before they
//! are ranked.

use crate::meta::sort_things;
use crate::multi::{multi_author, multi_domain, multi_listing, multi_submission, multi_topic};
use crate::options::QueryOptions;
use crate::resolved::Resolved;
use crate::single::{AuthorKind, replies_to_author};
use nab_kernel::soul;
use nab_kernel::{GraphScope, QueryResult, Soul, ThingMeta};
use nab_rank::Sort;
use serde::{Deserialize, Serialize};

/// Topic every empty filter falls back to.
pub const FALLBACK_TOPIC: &str = "all";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    #[default]
    Topic,
    Domain,
    Author,
    Replies,
    Op,
    Listing,
}

/// Parameters of one listing fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ListingRequest {
    pub source: ItemSource,
    pub topics: Vec<String>,
    pub domains: Vec<String>,
    pub authors: Vec<String>,
    #[serde(rename = "type")]
    pub author_kind: Option<AuthorKind>,
    pub replies_to: Option<String>,
    pub ops: Vec<String>,
    pub listings: Vec<Soul>,
    /// Sort name; unknown or absent ranks as `new`.
    pub sort: Option<String>,
    /// Identity whose vote tallies are read instead of recounting.
    pub tabulator: Option<String>,
    /// Identity whose precomputed topic/domain listings are read.
    pub indexer: Option<String>,
}

impl ListingRequest {
    pub fn sort(&self) -> Sort {
        Sort::or_new(self.sort.as_deref())
    }

    /// Precomputed listing soul an indexer keeps under `segments`.
    fn indexed(&self, indexer: &str, segments: &[&str]) -> QueryResult<Soul> {
        soul::listing(segments, self.sort().name(), indexer)
    }
}

/// Candidate thing souls for `request`, unranked.
pub async fn source_souls(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    request: &ListingRequest,
) -> QueryResult<Vec<Soul>> {
    let resolved = match request.source {
        ItemSource::Listing if !request.listings.is_empty() => {
            multi_listing(scope, Some(&request.listings)).await?
        }
        ItemSource::Replies => match &request.replies_to {
            Some(author) => replies_to_author(scope, author, request.author_kind).await?,
            None => topics(scope, options, request).await?,
        },
        ItemSource::Op if !request.ops.is_empty() => {
            multi_submission(scope, Some(&request.ops)).await?
        }
        ItemSource::Author if !request.authors.is_empty() => {
            multi_author(scope, Some(&request.authors), request.author_kind).await?
        }
        ItemSource::Domain if !request.domains.is_empty() => match &request.indexer {
            Some(indexer) => {
                let listings: Vec<Soul> = request
                    .domains
                    .iter()
                    .map(|domain| request.indexed(indexer, &["domain", domain.as_str()]))
                    .collect::<QueryResult<_>>()?;
                multi_listing(scope, Some(&listings)).await?
            }
            None => multi_domain(scope, Some(&request.domains)).await?,
        },
        _ => topics(scope, options, request).await?,
    };
    Ok(resolved.into_souls().unwrap_or_default())
}

async fn topics(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    request: &ListingRequest,
) -> QueryResult<Resolved> {
    let topics = if request.topics.is_empty() {
        vec![FALLBACK_TOPIC.to_string()]
    } else {
        request.topics.clone()
    };
    match &request.indexer {
        Some(indexer) => {
            let listings: Vec<Soul> = topics
                .iter()
                .map(|topic| request.indexed(indexer, &["t", topic.as_str()]))
                .collect::<QueryResult<_>>()?;
            multi_listing(scope, Some(&listings)).await
        }
        None => multi_topic(scope, options, Some(&topics)).await,
    }
}

/// Resolve the request's source and rank it.
pub async fn fetch(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    request: &ListingRequest,
) -> QueryResult<Vec<ThingMeta>> {
    let souls = source_souls(scope, options, request).await?;
    tracing::debug!(source = ?request.source, candidates = souls.len(), "fetched item source");
    sort_things(scope, &souls, request.sort(), request.tabulator.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use nab_graph::MemoryScope;
    use serde_json::{Value, json};

    fn options() -> QueryOptions {
        QueryOptions::at(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap())
    }

    fn put(scope: &MemoryScope, soul: &str, value: Value) {
        scope
            .put(Soul::new(soul), value.as_object().cloned().expect("object"))
            .expect("put");
    }

    fn link(scope: &MemoryScope, set: &str, member: &str) {
        scope.link(Soul::new(set), Soul::new(member)).expect("link");
    }

    fn request(value: Value) -> ListingRequest {
        serde_json::from_value(value).expect("request")
    }

    #[tokio::test]
    async fn empty_filter_falls_back_to_all() {
        let scope = MemoryScope::new();
        link(&scope, "nab/topics/all/days/2024/3/10", "nab/things/a");
        link(&scope, "nab/domains/x.org", "nab/things/b");

        let souls = source_souls(&scope, &options(), &request(json!({ "source": "domain" })))
            .await
            .expect("souls");
        assert_eq!(souls, vec![Soul::new("nab/things/a")]);
    }

    #[tokio::test]
    async fn indexer_reads_precomputed_listings() {
        let scope = MemoryScope::new();
        put(&scope, "nab/t/art/hot@~ix.pub.", json!({ "ids": "b+a" }));
        let souls = source_souls(
            &scope,
            &options(),
            &request(json!({ "topics": ["art"], "sort": "hot", "indexer": "~ix.pub" })),
        )
        .await
        .expect("souls");
        assert_eq!(souls, vec![Soul::new("nab/things/b"), Soul::new("nab/things/a")]);
    }

    #[tokio::test]
    async fn malformed_indexer_is_unresolvable() {
        let scope = MemoryScope::new();
        let err = source_souls(
            &scope,
            &options(),
            &request(json!({ "topics": ["art"], "indexer": "~a.b.c" })),
        )
        .await
        .expect_err("malformed indexer");
        assert!(matches!(err, nab_kernel::QueryError::UnresolvableQuery(_)));
    }

    #[tokio::test]
    async fn fetch_ranks_with_the_requested_sort() {
        let scope = MemoryScope::new();
        for (id, ts) in [("a", 1), ("b", 3), ("c", 2)] {
            let soul = format!("nab/things/{id}");
            put(&scope, &soul, json!({ "id": id, "timestamp": ts }));
            link(&scope, "~pk.me/submissions", &soul);
        }
        let items = fetch(
            &scope,
            &options(),
            &request(json!({ "source": "author", "authors": ["pk.me"], "sort": "old" })),
        )
        .await
        .expect("fetch");
        let ids: Vec<&str> = items.iter().map(ThingMeta::id).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn unknown_request_fields_are_rejected() {
        let err = serde_json::from_value::<ListingRequest>(json!({ "curators": ["x"] }));
        assert!(err.is_err());
    }
}
