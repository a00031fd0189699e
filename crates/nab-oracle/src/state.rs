//! Per-request lifecycle.
//!
//! ```text
//! New → Matching → Matched → Executing → Cached | Errored
//!           └────→ Unmatched
//! ```

use nab_kernel::{QueryError, QueryResult};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    New,
    Matching,
    Matched,
    /// Running the handler, joining an in-flight run, or reading a
    /// retained result.
    Executing,
    /// A result was produced (and retained when the route has a TTL).
    Cached,
    Errored,
    Unmatched,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Cached | RequestState::Errored | RequestState::Unmatched
        )
    }

    /// Move to `next`, refusing transitions the lifecycle does not allow.
    pub fn advance(self, next: RequestState) -> QueryResult<RequestState> {
        use RequestState::*;
        let legal = matches!(
            (self, next),
            (New, Matching)
                | (Matching, Matched)
                | (Matching, Unmatched)
                | (Matched, Executing)
                | (Executing, Cached)
                | (Executing, Errored)
        );
        if legal {
            tracing::trace!(from = %self, to = %next, "request state");
            Ok(next)
        } else {
            Err(QueryError::invariant(format!(
                "illegal request transition {self} -> {next}"
            )))
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestState::New => "NEW",
            RequestState::Matching => "MATCHING",
            RequestState::Matched => "MATCHED",
            RequestState::Executing => "EXECUTING",
            RequestState::Cached => "CACHED",
            RequestState::Errored => "ERRORED",
            RequestState::Unmatched => "UNMATCHED",
        };
        f.write_str(label)
    }
}
