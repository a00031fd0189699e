//! Soul codec: the only place graph keys are built or taken apart.
//!
//! Every addressable node type declares one [`PathPattern`]. Encoding
//! renders the pattern from params; decoding is its left inverse and
//! returns `None` on any mismatch instead of failing.

use crate::error::{QueryError, QueryResult};
use crate::pattern::{Captures, PathPattern};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Namespace every content soul lives under.
pub const PREFIX: &str = "nab";

/// Parameters bound into (or out of) a soul.
pub type SoulParams = Captures;

/// Opaque key addressing one graph node. Equal souls denote the same node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Soul(String);

impl Soul {
    /// Wrap a raw key read from the store. Prefer [`NodeType::soul`] when
    /// building keys.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Soul {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Soul {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Soul {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Addressable node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Thing,
    ThingData,
    ThingAllComments,
    ThingComments,
    ThingVotesUp,
    ThingVotesDown,
    ThingVoteCounts,
    TopicDay,
    Domain,
    Url,
    Author,
    AuthorSubmissions,
    AuthorComments,
    Lens,
    LensThings,
    Space,
    SpaceGood,
    SpaceBad,
    Listing,
}

impl NodeType {
    pub const ALL: [NodeType; 19] = [
        NodeType::Thing,
        NodeType::ThingData,
        NodeType::ThingAllComments,
        NodeType::ThingComments,
        NodeType::ThingVotesUp,
        NodeType::ThingVotesDown,
        NodeType::ThingVoteCounts,
        NodeType::TopicDay,
        NodeType::Domain,
        NodeType::Url,
        NodeType::Author,
        NodeType::AuthorSubmissions,
        NodeType::AuthorComments,
        NodeType::Lens,
        NodeType::LensThings,
        NodeType::Space,
        NodeType::SpaceGood,
        NodeType::SpaceBad,
        NodeType::Listing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NodeType::Thing => "thing",
            NodeType::ThingData => "thingData",
            NodeType::ThingAllComments => "thingAllComments",
            NodeType::ThingComments => "thingComments",
            NodeType::ThingVotesUp => "thingVotesUp",
            NodeType::ThingVotesDown => "thingVotesDown",
            NodeType::ThingVoteCounts => "thingVoteCounts",
            NodeType::TopicDay => "topicDay",
            NodeType::Domain => "domain",
            NodeType::Url => "url",
            NodeType::Author => "author",
            NodeType::AuthorSubmissions => "authorSubmissions",
            NodeType::AuthorComments => "authorComments",
            NodeType::Lens => "lens",
            NodeType::LensThings => "lensThings",
            NodeType::Space => "space",
            NodeType::SpaceGood => "spaceGood",
            NodeType::SpaceBad => "spaceBad",
            NodeType::Listing => "listing",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            NodeType::Thing => "nab/things/:thingid",
            NodeType::ThingData => "nab/things/:thingid/data",
            NodeType::ThingAllComments => "nab/things/:thingid/allcomments",
            NodeType::ThingComments => "nab/things/:thingid/comments",
            NodeType::ThingVotesUp => "nab/things/:thingid/votesup",
            NodeType::ThingVotesDown => "nab/things/:thingid/votesdown",
            NodeType::ThingVoteCounts => "nab/things/:thingid/votecounts@~:tab1.:tab2.",
            NodeType::TopicDay => "nab/topics/:topic/days/:year/:month/:day",
            NodeType::Domain => "nab/domains/:domain",
            NodeType::Url => "nab/urls/*url",
            NodeType::Author => "~:authorid",
            NodeType::AuthorSubmissions => "~:authorid/submissions",
            NodeType::AuthorComments => "~:authorid/comments",
            NodeType::Lens => "nab/lenses/:lensid",
            NodeType::LensThings => "nab/lenses/:lensid/things",
            NodeType::Space => "nab/spaces/:spaceid",
            NodeType::SpaceGood => "nab/spaces/:spaceid/good",
            NodeType::SpaceBad => "nab/spaces/:spaceid/bad",
            NodeType::Listing => "nab/*path/:sort@~:tab1.:tab2.",
        }
    }

    /// The compiled pattern for this node type.
    pub fn pattern(&self) -> &'static PathPattern {
        &PATTERNS[self.index()]
    }

    // `ALL` lists the variants in declaration order.
    fn index(&self) -> usize {
        *self as usize
    }

    /// Encode `params` into a soul.
    pub fn soul(&self, params: &SoulParams) -> QueryResult<Soul> {
        self.pattern().render(params).map(Soul)
    }

    /// Encode from borrowed `(name, value)` pairs.
    pub fn soul_with(&self, pairs: &[(&str, &str)]) -> QueryResult<Soul> {
        let params: SoulParams = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.soul(&params)
    }

    /// Decode `soul` as this node type.
    pub fn is_match(&self, soul: &str) -> Option<SoulParams> {
        self.pattern().captures(soul)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for NodeType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|ty| ty.name() == s)
            .ok_or_else(|| QueryError::unresolvable(format!("unknown node type: {s}")))
    }
}

static PATTERNS: LazyLock<Vec<PathPattern>> = LazyLock::new(|| {
    NodeType::ALL
        .iter()
        .map(|ty| {
            PathPattern::parse(ty.source())
                .unwrap_or_else(|e| panic!("soul pattern for {ty} is malformed: {e}"))
        })
        .collect()
});

/// Decode a soul against every node type, first match wins.
pub fn decode(soul: &str) -> Option<(NodeType, SoulParams)> {
    NodeType::ALL
        .into_iter()
        .find_map(|ty| ty.is_match(soul).map(|params| (ty, params)))
}

pub fn thing(thingid: &str) -> QueryResult<Soul> {
    NodeType::Thing.soul_with(&[("thingid", thingid)])
}

pub fn thing_data(thingid: &str) -> QueryResult<Soul> {
    NodeType::ThingData.soul_with(&[("thingid", thingid)])
}

pub fn thing_all_comments(thingid: &str) -> QueryResult<Soul> {
    NodeType::ThingAllComments.soul_with(&[("thingid", thingid)])
}

pub fn domain(domain: &str) -> QueryResult<Soul> {
    NodeType::Domain.soul_with(&[("domain", domain)])
}

pub fn url(url: &str) -> QueryResult<Soul> {
    NodeType::Url.soul_with(&[("url", url)])
}

/// Thing id encoded in a thing soul, if `soul` is one.
pub fn thing_id(soul: &str) -> Option<String> {
    NodeType::Thing
        .is_match(soul)
        .and_then(|mut params| params.remove("thingid"))
}

/// Child soul of a thing (`votesup`, `votesdown`, `allcomments`, `comments`).
///
/// Works from the thing soul directly so a reference read from the store
/// needs no round trip through its id.
pub fn thing_child(thing: &Soul, child: NodeType) -> QueryResult<Soul> {
    let params = NodeType::Thing.is_match(thing.as_str()).ok_or_else(|| {
        QueryError::unresolvable(format!("not a thing soul: {thing}"))
    })?;
    match child {
        NodeType::ThingAllComments
        | NodeType::ThingComments
        | NodeType::ThingVotesUp
        | NodeType::ThingVotesDown
        | NodeType::ThingData => child.soul(&params),
        other => Err(QueryError::invariant(format!(
            "{other} is not a child of a thing"
        ))),
    }
}

/// Tabulator-scoped vote count soul. `tabulator` is an author soul such as
/// `~pub.key`.
pub fn thing_vote_counts(thing: &Soul, tabulator: &str) -> QueryResult<Soul> {
    let mut params = NodeType::Thing.is_match(thing.as_str()).ok_or_else(|| {
        QueryError::unresolvable(format!("not a thing soul: {thing}"))
    })?;
    let (tab1, tab2) = split_tabulator(tabulator)?;
    params.insert("tab1".to_string(), tab1.to_string());
    params.insert("tab2".to_string(), tab2.to_string());
    NodeType::ThingVoteCounts.soul(&params)
}

/// Split an author id `~tab1.tab2` (or `tab1.tab2`) into its key halves.
pub fn split_tabulator(tabulator: &str) -> QueryResult<(&str, &str)> {
    let raw = tabulator.strip_prefix('~').unwrap_or(tabulator);
    raw.split_once('.')
        .filter(|(a, b)| !a.is_empty() && !b.is_empty() && !b.contains('.'))
        .ok_or_else(|| QueryError::unresolvable(format!("malformed tabulator: {tabulator}")))
}

/// Tabulator author soul `~tab1.tab2` from its key halves.
pub fn tabulator(tab1: &str, tab2: &str) -> QueryResult<Soul> {
    if [tab1, tab2].iter().any(|half| half.is_empty() || half.contains('.')) {
        return Err(QueryError::unresolvable(format!(
            "malformed tabulator halves: {tab1:?}, {tab2:?}"
        )));
    }
    author(&format!("{tab1}.{tab2}"))
}

/// Listing soul `nab/<segments joined by />/<sort>@~tab1.tab2.` kept by
/// the indexer `tabulator`.
pub fn listing(segments: &[&str], sort: &str, tabulator: &str) -> QueryResult<Soul> {
    if segments.is_empty() || segments.iter().any(|s| s.is_empty() || s.contains('/')) {
        return Err(QueryError::unresolvable(format!(
            "malformed listing path: {segments:?}"
        )));
    }
    let (tab1, tab2) = split_tabulator(tabulator)?;
    let path = segments.join("/");
    NodeType::Listing.soul_with(&[("path", &path), ("sort", sort), ("tab1", tab1), ("tab2", tab2)])
}

/// Author soul (`~id`) from an id with or without the leading tilde.
pub fn author(authorid: &str) -> QueryResult<Soul> {
    NodeType::Author.soul_with(&[("authorid", authorid.strip_prefix('~').unwrap_or(authorid))])
}

pub fn author_child(author_soul: &Soul, child: NodeType) -> QueryResult<Soul> {
    let params = NodeType::Author.is_match(author_soul.as_str()).ok_or_else(|| {
        QueryError::unresolvable(format!("not an author soul: {author_soul}"))
    })?;
    match child {
        NodeType::AuthorSubmissions | NodeType::AuthorComments => child.soul(&params),
        other => Err(QueryError::invariant(format!(
            "{other} is not a child of an author"
        ))),
    }
}

/// Day-bucket index soul for `topic` on the UTC calendar day of `date`.
pub fn topic_day(topic: &str, date: NaiveDate) -> QueryResult<Soul> {
    let (year, month, day) = day_parts(date);
    NodeType::TopicDay.soul_with(&[
        ("topic", topic),
        ("year", &year),
        ("month", &month),
        ("day", &day),
    ])
}

/// `YYYY/M/D` with unpadded month and day.
pub fn day_string(at: DateTime<Utc>) -> String {
    let (year, month, day) = day_parts(at.date_naive());
    format!("{year}/{month}/{day}")
}

fn day_parts(date: NaiveDate) -> (String, String, String) {
    (
        date.year().to_string(),
        date.month().to_string(),
        date.day().to_string(),
    )
}

/// Stored lens and space children.
pub fn child_of(parent: &Soul, parent_type: NodeType, child: NodeType) -> QueryResult<Soul> {
    let params = parent_type.is_match(parent.as_str()).ok_or_else(|| {
        QueryError::unresolvable(format!("not a {parent_type} soul: {parent}"))
    })?;
    child.soul(&params)
}
