//! The `indexer` oracle: topic, front page, firehose, chat, comment thread,
//! domain and user listings, ranked from a tabulator's perspective.
//!
//! Every path ends in `@~:id1.:id2.`, the indexer's own key, which doubles
//! as the tabulator whose vote counts rank the listing and as the suffix of
//! every tab path.

use crate::assembler::{ListingHeader, assemble, tab_path, tab_paths};
use crate::oracle::Oracle;
use crate::output::OracleOutput;
use crate::route::{Route, RouteHandler, RouteRequest};
use async_trait::async_trait;
use nab_kernel::soul;
use nab_kernel::{Captures, GraphScope, PREFIX, QueryResult, Soul, node_str};
use nab_query::{AuthorKind, Resolved, multi_topic, replies_to_author, single_author, single_domain, thing_data};
use nab_rank::Sort;
use std::sync::Arc;

pub const NAME: &str = "indexer";

/// Topics merged into the front page.
pub const FRONTPAGE_TOPICS: [&str; 23] = [
    "art",
    "ask",
    "books",
    "food",
    "funny",
    "gaming",
    "gifs",
    "movies",
    "music",
    "news",
    "notabug",
    "pics",
    "politics",
    "programming",
    "religion",
    "quotes",
    "science",
    "space",
    "technology",
    "travel",
    "tv",
    "videos",
    "whatever",
];

/// Topic offered for new submissions when a listing has no better one.
pub const DEFAULT_SUBMIT_TOPIC: &str = "whatever";

const SORT_TABS: [&str; 5] = ["hot", "new", "discussed", "controversial", "top"];
const FIREHOSE: &str = "firehose";
const CHAT: &str = "chat";
const FRONT: &str = "front";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerRoute {
    Firehose,
    Chat,
    Front,
    Comments,
    Domain,
    Topic,
    Replies,
    User,
}

fn is_lower(value: &str) -> bool {
    !value.is_empty() && value.to_lowercase() == value
}

fn capture<'a>(params: &'a Captures, name: &str) -> &'a str {
    params.get(name).map(String::as_str).unwrap_or_default()
}

fn valid_sort(params: &Captures) -> bool {
    Sort::from_name(capture(params, "sort")).is_some()
}

fn plain_topic(params: &Captures) -> bool {
    let topic = capture(params, "topic");
    is_lower(topic) && !topic.contains(':')
}

fn sorted_topic(params: &Captures) -> bool {
    let topic = capture(params, "topic");
    valid_sort(params) && is_lower(topic) && topic != FRONT
}

fn sorted_domain(params: &Captures) -> bool {
    valid_sort(params) && is_lower(capture(params, "domain"))
}

fn user_listing(params: &Captures) -> bool {
    valid_sort(params)
        && !capture(params, "authorId").is_empty()
        && capture(params, "type").parse::<AuthorKind>().is_ok()
}

/// The indexer's routes in declaration order.
pub fn routes() -> QueryResult<Vec<Route>> {
    let at = "@~:id1.:id2.";
    Ok(vec![
        Route::new(
            "firehose",
            &format!("{PREFIX}/t/:topic/firehose{at}"),
            75,
            IndexerRoute::Firehose,
        )?
        .with_predicate(plain_topic),
        Route::new(
            "chat",
            &format!("{PREFIX}/t/:topic/chat{at}"),
            80,
            IndexerRoute::Chat,
        )?
        .with_predicate(plain_topic),
        Route::new(
            "front",
            &format!("{PREFIX}/t/front/:sort{at}"),
            25,
            IndexerRoute::Front,
        )?
        .with_predicate(valid_sort),
        Route::new(
            "comments",
            &format!("{PREFIX}/things/:thingid/comments/:sort{at}"),
            85,
            IndexerRoute::Comments,
        )?
        .with_predicate(valid_sort),
        Route::new(
            "domain",
            &format!("{PREFIX}/domain/:domain/:sort{at}"),
            25,
            IndexerRoute::Domain,
        )?
        .with_predicate(sorted_domain),
        Route::new(
            "topic",
            &format!("{PREFIX}/t/:topic/:sort{at}"),
            60,
            IndexerRoute::Topic,
        )?
        .with_predicate(sorted_topic),
        Route::new(
            "replies",
            &format!("{PREFIX}/user/:authorId/replies/:type/:sort{at}"),
            20,
            IndexerRoute::Replies,
        )?
        .with_predicate(user_listing),
        Route::new(
            "user",
            &format!("{PREFIX}/user/:authorId/:type/:sort{at}"),
            30,
            IndexerRoute::User,
        )?
        .with_predicate(user_listing),
    ])
}

/// The indexer oracle, one execution at a time.
pub fn oracle(scope: Arc<dyn GraphScope>) -> QueryResult<Oracle> {
    Ok(Oracle::new(NAME, scope)
        .with_routes(routes()?)
        .with_concurrency(Some(1)))
}

fn souls(resolved: Resolved) -> Vec<Soul> {
    resolved.into_souls().unwrap_or_default()
}

/// Topics named by a `+`-joined capture; `front` is the front page list.
fn split_topics(topic: &str) -> Vec<String> {
    if topic == FRONT {
        return FRONTPAGE_TOPICS.iter().map(|t| t.to_string()).collect();
    }
    topic
        .split('+')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn chat_submit_topic(topic: &str, topics: &[String]) -> String {
    if topic == FRONT || topic == "all" {
        return DEFAULT_SUBMIT_TOPIC.to_string();
    }
    topics
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_SUBMIT_TOPIC.to_string())
}

#[async_trait]
impl RouteHandler for IndexerRoute {
    async fn query(
        &self,
        scope: &dyn GraphScope,
        request: &RouteRequest,
    ) -> QueryResult<OracleOutput> {
        let indexer_soul = soul::tabulator(request.param("id1")?, request.param("id2")?)?;
        let indexer = indexer_soul.as_str();
        let tabulator = Some(indexer);
        let max = request.max_listing_size;
        let options = &request.options;

        let listing = match self {
            IndexerRoute::Firehose | IndexerRoute::Chat => {
                let topic = request.param("topic")?;
                let base = split_topics(topic);
                let topics: Vec<String> = if *self == IndexerRoute::Chat {
                    base.iter().map(|t| format!("chat:{t}")).collect()
                } else {
                    base.iter()
                        .flat_map(|t| [t.clone(), format!("chat:{t}"), format!("comments:{t}")])
                        .collect()
                };
                let mut tabs = SORT_TABS.to_vec();
                tabs.push(FIREHOSE);
                if *self == IndexerRoute::Chat {
                    tabs.push(CHAT);
                }
                let found = souls(multi_topic(scope, options, Some(&topics)).await?);
                let header = ListingHeader {
                    tabs: tab_paths(&["t", topic], &tabs, indexer)?,
                    submit_topic: Some(chat_submit_topic(topic, &base)),
                    is_chat: Some(true),
                    ..ListingHeader::named(topic)
                };
                assemble(scope, &found, Sort::New, tabulator, header, max).await?
            }
            IndexerRoute::Front => {
                let sort = Sort::or_new(Some(request.param("sort")?));
                let topics = split_topics(FRONT);
                let found = souls(multi_topic(scope, options, Some(&topics)).await?);
                let mut tabs = SORT_TABS.to_vec();
                tabs.push(FIREHOSE);
                let header = ListingHeader {
                    tabs: tab_paths(&["t", FRONT], &tabs, indexer)?,
                    include_ranks: true,
                    submit_topic: Some(DEFAULT_SUBMIT_TOPIC.to_string()),
                    ..ListingHeader::named(FRONT)
                };
                assemble(scope, &found, sort, tabulator, header, max).await?
            }
            IndexerRoute::Comments => {
                let thing_id = request.param("thingid")?;
                let sort_name = request.param("sort")?;
                let thread = soul::thing_all_comments(thing_id)?;
                let mut found = vec![soul::thing(thing_id)?];
                found.extend(scope.souls(&thread).await?);
                let topic = thing_data(scope, thing_id)
                    .await?
                    .and_then(|data| node_str(&data, "topic").map(str::to_string));
                let header = ListingHeader {
                    tabs: vec![tab_path(&["things", thing_id, "comments"], sort_name, indexer)?],
                    op_id: Some(thing_id.to_string()),
                    submit_topic: Some(
                        topic.clone().unwrap_or_else(|| DEFAULT_SUBMIT_TOPIC.to_string()),
                    ),
                    ..ListingHeader::named(topic.unwrap_or_default())
                };
                assemble(scope, &found, Sort::or_new(Some(sort_name)), tabulator, header, max)
                    .await?
            }
            IndexerRoute::Domain => {
                let domain = request.param("domain")?;
                let sort = Sort::or_new(Some(request.param("sort")?));
                let found = souls(single_domain(scope, domain).await?);
                let header = ListingHeader {
                    tabs: tab_paths(&["domain", domain], &SORT_TABS, indexer)?,
                    include_ranks: true,
                    submit_topic: Some(DEFAULT_SUBMIT_TOPIC.to_string()),
                    ..ListingHeader::named(domain)
                };
                assemble(scope, &found, sort, tabulator, header, max).await?
            }
            IndexerRoute::Topic => {
                let topic = request.param("topic")?;
                let sort = Sort::or_new(Some(request.param("sort")?));
                let topics = split_topics(topic);
                let submit_topic = topics
                    .iter()
                    .find(|t| !t.contains(':'))
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_SUBMIT_TOPIC.to_string());
                let mut tabs = SORT_TABS.to_vec();
                if !topic.contains(':') {
                    tabs.push(FIREHOSE);
                }
                let found = souls(multi_topic(scope, options, Some(&topics)).await?);
                let header = ListingHeader {
                    tabs: tab_paths(&["t", topic], &tabs, indexer)?,
                    include_ranks: true,
                    submit_topic: Some(submit_topic),
                    ..ListingHeader::named(topic)
                };
                assemble(scope, &found, sort, tabulator, header, max).await?
            }
            IndexerRoute::Replies => {
                let author_id = request.param("authorId")?;
                let kind = request.param("type")?.parse::<AuthorKind>()?;
                let sort = Sort::or_new(Some(request.param("sort")?));
                let found = souls(replies_to_author(scope, author_id, Some(kind)).await?);
                assemble(scope, &found, sort, tabulator, ListingHeader::named("message"), max)
                    .await?
            }
            IndexerRoute::User => {
                let author_id = request.param("authorId")?;
                let kind = request.param("type")?.parse::<AuthorKind>()?;
                let sort_name = request.param("sort")?;
                let author = soul::author(author_id)?;
                let (found, profile) = futures::try_join!(
                    single_author(scope, author.as_str(), Some(kind)),
                    scope.get(&author),
                )?;
                let alias = profile
                    .as_ref()
                    .and_then(|node| node_str(node, "alias"))
                    .unwrap_or_default()
                    .to_string();
                let header = ListingHeader {
                    tabs: ["overview", "comments", "submitted"]
                        .into_iter()
                        .map(|kind| tab_path(&["user", author_id, kind], sort_name, indexer))
                        .collect::<QueryResult<_>>()?,
                    user_id: Some(author_id.to_string()),
                    ..ListingHeader::named(alias)
                };
                assemble(scope, &souls(found), Sort::or_new(Some(sort_name)), tabulator, header, max)
                    .await?
            }
        };
        Ok(listing.into())
    }
}
