//! Error taxonomy shared by every layer of the listing engine.

/// Failures a query, route match, or oracle execution can report.
///
/// The enum is `Clone` so a coalesced execution can hand the same failure
/// to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// A filter value, dimension name, or soul could not be resolved.
    #[error("unresolvable query: {0}")]
    UnresolvableQuery(String),

    /// No route accepted the requested path. Terminal, not retried.
    #[error("no route matches path: {0}")]
    NoRouteMatch(String),

    /// The graph store failed or timed out. Never cached; callers may retry.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// An internal guarantee broke (codec round-trip, reference cycle,
    /// illegal state transition).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl QueryError {
    pub fn unresolvable(description: impl Into<String>) -> Self {
        Self::UnresolvableQuery(description.into())
    }

    pub fn upstream(description: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(description.into())
    }

    pub fn invariant(description: impl Into<String>) -> Self {
        Self::InvariantViolation(description.into())
    }

    /// Whether a caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }

    /// Stable snake_case label, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnresolvableQuery(_) => "unresolvable_query",
            Self::NoRouteMatch(_) => "no_route_match",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::InvariantViolation(_) => "invariant_violation",
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_upstream_failures_are_retryable() {
        assert!(QueryError::upstream("timeout").is_retryable());
        assert!(!QueryError::NoRouteMatch("/x".to_string()).is_retryable());
        assert!(!QueryError::invariant("cycle").is_retryable());
        assert!(!QueryError::unresolvable("bad").is_retryable());
    }

    #[test]
    fn display_carries_kind_and_detail() {
        let err = QueryError::unresolvable("unknown dimension `colour`");
        assert_eq!(
            err.to_string(),
            "unresolvable query: unknown dimension `colour`"
        );
        assert_eq!(err.kind(), "unresolvable_query");
    }
}
