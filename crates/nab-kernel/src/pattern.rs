//! Path patterns shared by the soul codec and the route table.
//!
//! A pattern is a literal string with named captures:
//! - `:name` binds a non-empty run that stops at the next `/`; it may
//!   contain dots, and the shortest run that lets the rest of the pattern
//!   match wins (so `:id1.:id2.` splits on the first dot).
//! - `*name` binds a non-empty run, slashes included. A pattern has at most
//!   one; it takes the longest run that lets the rest match, so a trailing
//!   `*name` is the remainder and `*path/:last` splits on the last `/`.

use crate::error::{QueryError, QueryResult};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// Values bound by a pattern, keyed by capture name.
pub type Captures = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Splat(String),
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
    regex: Regex,
}

impl PathPattern {
    /// Compile a pattern. Malformed patterns are programming errors and are
    /// reported as invariant violations.
    pub fn parse(source: &str) -> QueryResult<Self> {
        let segments = tokenize(source)?;

        let mut expr = String::from("^");
        let mut seen = Vec::new();
        for segment in &segments {
            match segment {
                Segment::Literal(text) => expr.push_str(&regex::escape(text)),
                Segment::Param(name) | Segment::Splat(name) => {
                    if seen.contains(name) {
                        return Err(QueryError::invariant(format!(
                            "pattern `{source}` binds `{name}` twice"
                        )));
                    }
                    seen.push(name.clone());
                    let body = if matches!(segment, Segment::Param(_)) {
                        "[^/]+?"
                    } else {
                        ".+"
                    };
                    expr.push_str(&format!("(?P<{name}>{body})"));
                }
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| {
            QueryError::invariant(format!("pattern `{source}` does not compile: {e}"))
        })?;

        Ok(Self {
            source: source.to_string(),
            segments,
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Capture names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Literal(_) => None,
            Segment::Param(name) | Segment::Splat(name) => Some(name.as_str()),
        })
    }

    /// Bind every capture of `path`, or `None` when the path does not fit.
    pub fn captures(&self, path: &str) -> Option<Captures> {
        let caps = self.regex.captures(path)?;
        let mut out = Captures::new();
        for name in self.names() {
            out.insert(name.to_string(), caps.name(name)?.as_str().to_string());
        }
        Some(out)
    }

    /// Render a concrete path from `params`.
    ///
    /// Every capture must be supplied exactly once with a non-empty value;
    /// `:` captures reject `/`. The rendered path is re-parsed and must bind
    /// the same params, otherwise the pattern cannot address this value.
    pub fn render(&self, params: &Captures) -> QueryResult<String> {
        for key in params.keys() {
            if !self.names().any(|name| name == key) {
                return Err(QueryError::unresolvable(format!(
                    "`{}` has no capture named `{key}`",
                    self.source
                )));
            }
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(name) | Segment::Splat(name) => {
                    let value = params.get(name).ok_or_else(|| {
                        QueryError::unresolvable(format!(
                            "`{}` requires a value for `{name}`",
                            self.source
                        ))
                    })?;
                    if value.is_empty() {
                        return Err(QueryError::unresolvable(format!(
                            "`{}` got an empty `{name}`",
                            self.source
                        )));
                    }
                    if matches!(segment, Segment::Param(_)) && value.contains('/') {
                        return Err(QueryError::unresolvable(format!(
                            "`{name}` may not contain `/`: {value}"
                        )));
                    }
                    out.push_str(value);
                }
            }
        }

        match self.captures(&out) {
            Some(bound) if &bound == params => Ok(out),
            _ => Err(QueryError::invariant(format!(
                "`{}` does not round-trip through `{out}`",
                self.source
            ))),
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn tokenize(source: &str) -> QueryResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != ':' && ch != '*' {
            literal.push(ch);
            continue;
        }

        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(QueryError::invariant(format!(
                "pattern `{source}` has an unnamed or invalid capture"
            )));
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        if ch == ':' {
            segments.push(Segment::Param(name));
        } else {
            if segments.iter().any(|s| matches!(s, Segment::Splat(_))) {
                return Err(QueryError::invariant(format!(
                    "pattern `{source}`: `*{name}` is a second splat"
                )));
            }
            segments.push(Segment::Splat(name));
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
