//! Read deadlines for any [`GraphScope`].
//!
//! Timeouts belong to the store adapter, not to the query layer: a read
//! that overruns surfaces as `UpstreamUnavailable` and the engine never
//! caches it.

use async_trait::async_trait;
use nab_kernel::{GraphScope, Node, QueryError, QueryResult, Soul};
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct TimeoutScope<S> {
    inner: S,
    deadline: Duration,
}

impl<S: GraphScope> TimeoutScope<S> {
    pub fn new(inner: S, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        op: &str,
        soul: &Soul,
        read: impl Future<Output = QueryResult<T>>,
    ) -> QueryResult<T> {
        match tokio::time::timeout(self.deadline, read).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%soul, op, deadline_ms = self.deadline.as_millis() as u64, "graph read timed out");
                Err(QueryError::upstream(format!(
                    "{op} {soul} exceeded {}ms",
                    self.deadline.as_millis()
                )))
            }
        }
    }
}

#[async_trait]
impl<S: GraphScope> GraphScope for TimeoutScope<S> {
    async fn get(&self, soul: &Soul) -> QueryResult<Option<Node>> {
        self.bounded("get", soul, self.inner.get(soul)).await
    }

    async fn souls(&self, soul: &Soul) -> QueryResult<Vec<Soul>> {
        self.bounded("souls", soul, self.inner.souls(soul)).await
    }

    async fn count(&self, soul: &Soul) -> QueryResult<u64> {
        self.bounded("count", soul, self.inner.count(soul)).await
    }

    fn subscribe(&self) -> broadcast::Receiver<Soul> {
        self.inner.subscribe()
    }
}
