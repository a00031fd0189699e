//! Listing assembly: candidate souls → ranked, truncated wire payload.

use nab_kernel::soul;
use nab_kernel::{GraphScope, Listing, QueryResult, Soul, ThingMeta, join_ids, join_tabs};
use nab_query::sort_things;
use nab_rank::Sort;

/// Listing fields other than the ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingHeader {
    pub name: String,
    pub tabs: Vec<String>,
    pub include_ranks: bool,
    pub submit_topic: Option<String>,
    pub op_id: Option<String>,
    pub is_chat: Option<bool>,
    pub user_id: Option<String>,
}

impl ListingHeader {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Listing soul of one tab: `segments` sorted by `sort`, kept by `indexer`.
pub fn tab_path(segments: &[&str], sort: &str, indexer: &str) -> QueryResult<String> {
    soul::listing(segments, sort, indexer).map(Soul::into_string)
}

/// One tab per name in `tabs`, all under `segments`.
pub fn tab_paths(segments: &[&str], tabs: &[&str], indexer: &str) -> QueryResult<Vec<String>> {
    tabs.iter()
        .map(|tab| tab_path(segments, tab, indexer))
        .collect()
}

/// Serialize ranked items, keeping the first `max_size`.
pub fn serialize_listing(header: ListingHeader, items: &[ThingMeta], max_size: usize) -> Listing {
    Listing {
        name: header.name,
        ids: join_ids(items.iter().take(max_size).map(ThingMeta::id)),
        tabs: join_tabs(header.tabs),
        include_ranks: header.include_ranks,
        submit_topic: header.submit_topic,
        op_id: header.op_id,
        is_chat: header.is_chat,
        user_id: header.user_id,
    }
}

/// Rank `souls` with `sort` (votes from `tabulator` when given) and
/// serialize the first `max_size`. Items whose metadata cannot be read are
/// skipped.
pub async fn assemble(
    scope: &dyn GraphScope,
    souls: &[Soul],
    sort: Sort,
    tabulator: Option<&str>,
    header: ListingHeader,
    max_size: usize,
) -> QueryResult<Listing> {
    let ranked = sort_things(scope, souls, sort, tabulator).await?;
    tracing::debug!(
        name = %header.name,
        sort = sort.name(),
        candidates = souls.len(),
        ranked = ranked.len(),
        "assembled listing"
    );
    Ok(serialize_listing(header, &ranked, max_size))
}
