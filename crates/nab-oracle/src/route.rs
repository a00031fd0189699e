//! Routes: a path pattern, a priority, a predicate over the captures, an
//! optional cache TTL and the handler that answers the path.

use crate::output::OracleOutput;
use async_trait::async_trait;
use nab_kernel::{Captures, GraphScope, PathPattern, QueryError, QueryResult};
use nab_query::QueryOptions;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Accepts or rejects the captures of a pattern match.
pub type Predicate = fn(&Captures) -> bool;

fn accept_all(_: &Captures) -> bool {
    true
}

/// Everything a handler gets for one execution.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Normalized request path.
    pub path: String,
    pub params: Captures,
    pub options: QueryOptions,
    pub max_listing_size: usize,
}

impl RouteRequest {
    /// A capture the route's pattern guarantees.
    pub fn param(&self, name: &str) -> QueryResult<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| QueryError::invariant(format!("route bound no `{name}` for {}", self.path)))
    }
}

/// Answers a matched path against the graph.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn query(
        &self,
        scope: &dyn GraphScope,
        request: &RouteRequest,
    ) -> QueryResult<OracleOutput>;
}

#[derive(Clone)]
pub struct Route {
    /// Stable name, used by configuration overrides.
    pub name: String,
    pub pattern: PathPattern,
    pub priority: i32,
    pub predicate: Predicate,
    /// Completed results are retained this long; `None` keeps nothing.
    pub cache_ttl: Option<Duration>,
    pub handler: Arc<dyn RouteHandler>,
}

impl Route {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        priority: i32,
        handler: impl RouteHandler + 'static,
    ) -> QueryResult<Self> {
        Ok(Self {
            name: name.into(),
            pattern: PathPattern::parse(pattern)?,
            priority,
            predicate: accept_all,
            cache_ttl: None,
            handler: Arc::new(handler),
        })
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl.filter(|ttl| !ttl.is_zero());
        self
    }

    /// Captures of `path` when both the pattern and the predicate accept it.
    pub fn accepts(&self, path: &str) -> Option<Captures> {
        let params = self.pattern.captures(path)?;
        (self.predicate)(&params).then_some(params)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("priority", &self.priority)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

/// Order routes for matching: descending priority, ties in declaration
/// order.
pub fn by_priority(routes: &mut [Route]) {
    routes.sort_by(|a, b| b.priority.cmp(&a.priority));
}

/// A route that accepted a path, with its captures.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: Captures,
}

/// First route in `routes` that accepts `path`. `routes` must already be
/// in matching order.
pub fn find<'a>(routes: &'a [Route], path: &str) -> Option<RouteMatch<'a>> {
    routes.iter().find_map(|route| {
        route
            .accepts(path)
            .map(|params| RouteMatch { route, params })
    })
}
