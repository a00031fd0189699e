//! The `tabulator` oracle: vote and comment tallies per thing.

use crate::oracle::Oracle;
use crate::output::OracleOutput;
use crate::route::{Route, RouteHandler, RouteRequest};
use async_trait::async_trait;
use nab_kernel::soul;
use nab_kernel::{GraphScope, PREFIX, QueryResult};
use nab_query::thing_scores;
use std::sync::Arc;
use std::time::Duration;

pub const NAME: &str = "tabulator";

/// Tallies are recounted at most this often per thing.
pub const VOTE_COUNTS_TTL: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Debug, Clone, Copy)]
pub struct VoteCountsRoute;

#[async_trait]
impl RouteHandler for VoteCountsRoute {
    async fn query(
        &self,
        scope: &dyn GraphScope,
        request: &RouteRequest,
    ) -> QueryResult<OracleOutput> {
        let thing = soul::thing(request.param("thingid")?)?;
        Ok(thing_scores(scope, &thing).await?.into())
    }
}

pub fn routes() -> QueryResult<Vec<Route>> {
    Ok(vec![
        Route::new(
            "votecounts",
            &format!("{PREFIX}/things/:thingid/votecounts@~:tab1.:tab2."),
            10,
            VoteCountsRoute,
        )?
        .with_cache_ttl(Some(VOTE_COUNTS_TTL)),
    ])
}

pub fn oracle(scope: Arc<dyn GraphScope>) -> QueryResult<Oracle> {
    Ok(Oracle::new(NAME, scope).with_routes(routes()?))
}
