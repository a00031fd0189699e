//! Oracles: a named, priority-ordered route table bound to a graph scope,
//! with a result cache and an optional concurrency ceiling.

use crate::cache::{CacheKey, ResultCache};
use crate::output::OracleOutput;
use crate::route::{Route, RouteMatch, RouteRequest, by_priority, find};
use crate::state::RequestState;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use nab_kernel::{GraphScope, MAX_LISTING_SIZE, QueryError, QueryResult};
use nab_query::{DEFAULT_TOPIC_DAYS, DEFAULT_TOPIC_SOUL_LIMIT, QueryOptions};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Knobs handed to every execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleSettings {
    pub topic_days: u32,
    pub topic_soul_limit: usize,
    pub max_listing_size: usize,
    /// Fixed clock; `None` reads the system clock per execution.
    pub now: Option<DateTime<Utc>>,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            topic_days: DEFAULT_TOPIC_DAYS,
            topic_soul_limit: DEFAULT_TOPIC_SOUL_LIMIT,
            max_listing_size: MAX_LISTING_SIZE,
            now: None,
        }
    }
}

impl OracleSettings {
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            now: self.now.unwrap_or_else(Utc::now),
            topic_days: self.topic_days,
            topic_soul_limit: self.topic_soul_limit,
        }
    }
}

/// Canonical form of a request path: surrounding whitespace and one
/// trailing `/` removed.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

pub struct Oracle {
    name: String,
    scope: Arc<dyn GraphScope>,
    routes: Vec<Route>,
    cache: ResultCache<OracleOutput>,
    limit: Option<Arc<Semaphore>>,
    settings: OracleSettings,
}

impl Oracle {
    pub fn new(name: impl Into<String>, scope: Arc<dyn GraphScope>) -> Self {
        Self {
            name: name.into(),
            scope,
            routes: Vec::new(),
            cache: ResultCache::default(),
            limit: None,
            settings: OracleSettings::default(),
        }
    }

    /// Add routes; matching order is re-established after every call.
    pub fn with_routes(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.routes.extend(routes);
        by_priority(&mut self.routes);
        self
    }

    /// Bound simultaneous handler runs; `None` or zero is unbounded.
    pub fn with_concurrency(mut self, limit: Option<usize>) -> Self {
        self.limit = limit
            .filter(|limit| *limit > 0)
            .map(|limit| Arc::new(Semaphore::new(limit)));
        self
    }

    pub fn with_cache_capacity(mut self, capacity: Option<usize>) -> Self {
        self.cache = ResultCache::new(capacity);
        self
    }

    pub fn with_settings(mut self, settings: OracleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Routes in matching order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub(crate) fn routes_mut(&mut self) -> &mut [Route] {
        &mut self.routes
    }

    pub fn cache(&self) -> &ResultCache<OracleOutput> {
        &self.cache
    }

    pub fn settings(&self) -> &OracleSettings {
        &self.settings
    }

    /// Permits currently free, `None` when unbounded.
    pub fn available_permits(&self) -> Option<usize> {
        self.limit.as_ref().map(|limit| limit.available_permits())
    }

    /// Highest-priority route whose pattern and predicate accept `path`.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        find(&self.routes, &normalize_path(path))
    }

    /// Answer `path`: match, then serve from cache, join an in-flight run,
    /// or run the handler.
    pub async fn execute(&self, path: &str) -> QueryResult<OracleOutput> {
        let path = normalize_path(path);
        let mut state = RequestState::New.advance(RequestState::Matching)?;

        let Some(found) = find(&self.routes, &path) else {
            state.advance(RequestState::Unmatched)?;
            tracing::debug!(oracle = %self.name, %path, "no route");
            return Err(QueryError::NoRouteMatch(path));
        };
        state = state.advance(RequestState::Matched)?;
        tracing::debug!(
            oracle = %self.name,
            route = %found.route.name,
            priority = found.route.priority,
            %path,
            "matched"
        );

        state = state.advance(RequestState::Executing)?;
        let key = CacheKey::new(found.route.pattern.as_str(), path.clone());
        let ttl = found.route.cache_ttl;
        let request = RouteRequest {
            path,
            params: found.params,
            options: self.settings.query_options(),
            max_listing_size: self.settings.max_listing_size,
        };
        let handler = Arc::clone(&found.route.handler);
        let scope = Arc::clone(&self.scope);
        let limit = self.limit.clone();
        let route = found.route.name.clone();

        let outcome = self
            .cache
            .get_or_run(key, ttl, move || {
                async move {
                    let _permit = match limit {
                        Some(limit) => Some(limit.acquire_owned().await.map_err(|_| {
                            QueryError::invariant("oracle concurrency limit closed")
                        })?),
                        None => None,
                    };
                    tracing::debug!(%route, path = %request.path, "running handler");
                    handler.query(scope.as_ref(), &request).await
                }
                .boxed()
            })
            .await;

        match outcome {
            Ok(output) => {
                state.advance(RequestState::Cached)?;
                Ok(output)
            }
            Err(err) => {
                state.advance(RequestState::Errored)?;
                tracing::warn!(oracle = %self.name, %err, kind = err.kind(), "execution failed");
                Err(err)
            }
        }
    }

    /// Drop cached results for `path`.
    pub fn invalidate(&self, path: &str) -> QueryResult<usize> {
        self.cache.invalidate(&normalize_path(path))
    }
}

/// Several oracles; a path goes to the first registered oracle that has a
/// route for it.
#[derive(Default)]
pub struct OracleRegistry {
    oracles: Vec<Oracle>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, oracle: Oracle) -> QueryResult<()> {
        if self.get(oracle.name()).is_some() {
            return Err(QueryError::invariant(format!(
                "oracle `{}` registered twice",
                oracle.name()
            )));
        }
        self.oracles.push(oracle);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Oracle> {
        self.oracles.iter().find(|oracle| oracle.name() == name)
    }

    pub fn oracles(&self) -> &[Oracle] {
        &self.oracles
    }

    /// The oracle and route that would answer `path`.
    pub fn match_path(&self, path: &str) -> Option<(&Oracle, RouteMatch<'_>)> {
        self.oracles
            .iter()
            .find_map(|oracle| oracle.match_path(path).map(|found| (oracle, found)))
    }

    pub async fn dispatch(&self, path: &str) -> QueryResult<OracleOutput> {
        match self.match_path(path) {
            Some((oracle, _)) => oracle.execute(path).await,
            None => Err(QueryError::NoRouteMatch(normalize_path(path))),
        }
    }
}
