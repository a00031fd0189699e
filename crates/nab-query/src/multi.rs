//! Multi-source quantifiers: lift a single-source resolver over a list of
//! values and union the results.
//!
//! An absent or empty list means the dimension is inactive and yields
//! `Unconstrained`, which is not the same as a list whose members resolve
//! to nothing.

use crate::options::QueryOptions;
use crate::resolved::Resolved;
use crate::single::{
    AuthorKind, single_author, single_domain, single_listing, single_submission, single_topic,
    single_url,
};
use futures::future::try_join_all;
use nab_kernel::{GraphScope, QueryResult, Soul};
use std::future::Future;

/// Union `resolve(value)` over `values`.
pub async fn quantify<'v, T, F, Fut>(values: Option<&'v [T]>, resolve: F) -> QueryResult<Resolved>
where
    F: Fn(&'v T) -> Fut,
    Fut: Future<Output = QueryResult<Resolved>>,
{
    let Some(values) = values.filter(|values| !values.is_empty()) else {
        return Ok(Resolved::Unconstrained);
    };
    let parts = try_join_all(values.iter().map(resolve)).await?;
    Ok(Resolved::union_all(parts))
}

pub async fn multi_topic(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    topics: Option<&[String]>,
) -> QueryResult<Resolved> {
    quantify(topics, |topic| single_topic(scope, options, topic)).await
}

pub async fn multi_author(
    scope: &dyn GraphScope,
    author_ids: Option<&[String]>,
    kind: Option<AuthorKind>,
) -> QueryResult<Resolved> {
    quantify(author_ids, |author| single_author(scope, author, kind)).await
}

pub async fn multi_domain(
    scope: &dyn GraphScope,
    domains: Option<&[String]>,
) -> QueryResult<Resolved> {
    quantify(domains, |domain| single_domain(scope, domain)).await
}

pub async fn multi_url(scope: &dyn GraphScope, urls: Option<&[String]>) -> QueryResult<Resolved> {
    quantify(urls, |url| single_url(scope, url)).await
}

pub async fn multi_submission(
    scope: &dyn GraphScope,
    submission_ids: Option<&[String]>,
) -> QueryResult<Resolved> {
    quantify(submission_ids, |id| single_submission(scope, id)).await
}

pub async fn multi_listing(
    scope: &dyn GraphScope,
    listings: Option<&[Soul]>,
) -> QueryResult<Resolved> {
    quantify(listings, |listing| single_listing(scope, listing)).await
}
