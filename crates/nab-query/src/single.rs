//! Single-source resolvers.
//!
//! Each resolver reads one family of index sets from the scope and returns
//! a constrained result (`Empty` or `Set`). They hold no state between
//! calls.

use crate::options::{MAX_TOPIC_DAYS, QueryOptions};
use crate::resolved::{Resolved, SoulSet};
use chrono::Duration;
use futures::future::try_join_all;
use nab_kernel::soul::{self, NodeType};
use nab_kernel::{GraphScope, ID_DELIMITER, QueryError, QueryResult, Soul, node_str};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which of an author's things to include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorKind {
    Overview,
    Submitted,
    Comments,
}

impl AuthorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorKind::Overview => "overview",
            AuthorKind::Submitted => "submitted",
            AuthorKind::Comments => "comments",
        }
    }

    fn includes_submissions(kind: Option<AuthorKind>) -> bool {
        !matches!(kind, Some(AuthorKind::Comments))
    }

    fn includes_comments(kind: Option<AuthorKind>) -> bool {
        !matches!(kind, Some(AuthorKind::Submitted))
    }
}

impl fmt::Display for AuthorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overview" => Ok(AuthorKind::Overview),
            "submitted" => Ok(AuthorKind::Submitted),
            "comments" => Ok(AuthorKind::Comments),
            other => Err(QueryError::unresolvable(format!(
                "unknown author listing type: {other}"
            ))),
        }
    }
}

/// Day-bucket index souls for `topic`, newest first.
///
/// The window spans `topic_days` back from `now` plus one day ahead, so
/// items stamped just past midnight in another zone are not missed.
pub fn topic_day_souls(options: &QueryOptions, topic: &str) -> QueryResult<Vec<Soul>> {
    if options.topic_days > MAX_TOPIC_DAYS {
        return Err(QueryError::unresolvable(format!(
            "topic window of {} days exceeds {MAX_TOPIC_DAYS}",
            options.topic_days
        )));
    }
    let days = i64::from(options.topic_days);
    let out_of_range =
        || QueryError::unresolvable(format!("topic window of {days} days leaves the calendar"));
    let start = options
        .now
        .checked_sub_signed(Duration::days(days))
        .ok_or_else(out_of_range)?;
    let mut souls = (0..=days + 1)
        .map(|offset| {
            let day = start
                .checked_add_signed(Duration::days(offset))
                .ok_or_else(out_of_range)?;
            soul::topic_day(topic, day.date_naive())
        })
        .collect::<QueryResult<Vec<_>>>()?;
    souls.reverse();
    Ok(souls)
}

/// Things filed under `topic` within the day window.
///
/// Buckets are accumulated newest first and accumulation stops once
/// `topic_soul_limit` souls are held; the bucket that crosses the limit is
/// kept whole.
pub async fn single_topic(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    topic: &str,
) -> QueryResult<Resolved> {
    let buckets = topic_day_souls(options, topic)?;
    let members = try_join_all(buckets.iter().map(|bucket| scope.souls(bucket))).await?;

    let mut out = SoulSet::new();
    for (bucket, souls) in buckets.iter().zip(members) {
        if out.len() >= options.topic_soul_limit {
            tracing::debug!(topic, %bucket, held = out.len(), "topic accumulation limit reached");
            break;
        }
        out.extend(souls);
    }
    Ok(Resolved::from_souls(out.into_vec()))
}

/// Submissions and/or comments written by `author_id` (`~key` or `key`).
pub async fn single_author(
    scope: &dyn GraphScope,
    author_id: &str,
    kind: Option<AuthorKind>,
) -> QueryResult<Resolved> {
    let author = soul::author(author_id)?;
    let submissions = async {
        if AuthorKind::includes_submissions(kind) {
            let set = soul::author_child(&author, NodeType::AuthorSubmissions)?;
            scope.souls(&set).await
        } else {
            Ok(Vec::new())
        }
    };
    let comments = async {
        if AuthorKind::includes_comments(kind) {
            let set = soul::author_child(&author, NodeType::AuthorComments)?;
            scope.souls(&set).await
        } else {
            Ok(Vec::new())
        }
    };
    let (submissions, comments) = futures::try_join!(submissions, comments)?;
    Ok(Resolved::from_souls(submissions.into_iter().chain(comments)))
}

/// Direct replies to anything `author_id` wrote.
///
/// Authored members that are not thing souls have no reply set and are
/// skipped.
pub async fn replies_to_author(
    scope: &dyn GraphScope,
    author_id: &str,
    kind: Option<AuthorKind>,
) -> QueryResult<Resolved> {
    let Some(authored) = single_author(scope, author_id, kind).await?.into_souls() else {
        return Ok(Resolved::Empty);
    };

    let reply_sets: Vec<Soul> = authored
        .iter()
        .filter_map(|thing| match soul::thing_child(thing, NodeType::ThingComments) {
            Ok(set) => Some(set),
            Err(err) => {
                tracing::warn!(%thing, %err, "authored member is not a thing; skipping");
                None
            }
        })
        .collect();

    let replies = try_join_all(reply_sets.iter().map(|set| scope.souls(set))).await?;
    Ok(Resolved::from_souls(replies.into_iter().flatten()))
}

pub async fn single_domain(scope: &dyn GraphScope, domain: &str) -> QueryResult<Resolved> {
    let index = soul::domain(domain)?;
    Ok(Resolved::from_souls(scope.souls(&index).await?))
}

pub async fn single_url(scope: &dyn GraphScope, url: &str) -> QueryResult<Resolved> {
    let index = soul::url(url)?;
    Ok(Resolved::from_souls(scope.souls(&index).await?))
}

/// A submission followed by every comment in its thread.
pub async fn single_submission(
    scope: &dyn GraphScope,
    submission_id: &str,
) -> QueryResult<Resolved> {
    let op = soul::thing(submission_id)?;
    let thread = soul::thing_all_comments(submission_id)?;
    let comments = scope.souls(&thread).await?;
    Ok(Resolved::from_souls(std::iter::once(op).chain(comments)))
}

/// Ids stored on a precomputed listing node, blanks dropped.
pub async fn listing_ids(scope: &dyn GraphScope, listing: &Soul) -> QueryResult<Vec<String>> {
    let node = scope.get(listing).await?;
    Ok(node
        .as_ref()
        .and_then(|node| node_str(node, "ids"))
        .map(|ids| {
            ids.split(ID_DELIMITER)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

/// Thing souls of a precomputed listing, in listing order.
pub async fn single_listing(scope: &dyn GraphScope, listing: &Soul) -> QueryResult<Resolved> {
    let things = listing_ids(scope, listing)
        .await?
        .iter()
        .map(|id| soul::thing(id))
        .collect::<QueryResult<Vec<_>>>()?;
    Ok(Resolved::from_souls(things))
}
