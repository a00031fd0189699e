//! Lens and space composition.
//!
//! A [`Lens`] intersects its active dimensions and is then narrowed by the
//! stored lens it names, if any. A [`Space`] unions its good lenses, unions
//! its bad lenses and subtracts. Spaces may be stored, and a stored space
//! may list other spaces, so resolution carries the chain of stored spaces
//! being expanded and refuses to re-enter one.

use crate::multi::{multi_author, multi_domain, multi_submission, multi_topic, multi_url, quantify};
use crate::options::QueryOptions;
use crate::resolved::Resolved;
use crate::single::{AuthorKind, replies_to_author};
use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use nab_kernel::soul::{self, NodeType};
use nab_kernel::{GraphScope, QueryError, QueryResult, Soul};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named filter over the content graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Lens {
    /// Stored lens whose `things` set narrows the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens_soul: Option<Soul>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies_to_author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_ids: Option<Vec<String>>,
    /// Applies to `authorIds` and `repliesToAuthorId`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub author_kind: Option<AuthorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spaces: Option<Vec<Space>>,
}

/// Curated selection: `(∪ good) − (∪ bad)`, optionally narrowed by a
/// stored space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Space {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_soul: Option<Soul>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good: Option<Vec<Lens>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bad: Option<Vec<Lens>>,
}

fn from_value<T: DeserializeOwned>(what: &str, value: Value) -> QueryResult<T> {
    serde_json::from_value(value)
        .map_err(|e| QueryError::unresolvable(format!("invalid {what}: {e}")))
}

impl Lens {
    /// Parse a lens description. Unknown dimension names are refused.
    pub fn from_value(value: Value) -> QueryResult<Self> {
        from_value("lens", value)
    }

    pub fn stored(lens_soul: Soul) -> Self {
        Self {
            lens_soul: Some(lens_soul),
            ..Self::default()
        }
    }
}

impl Space {
    pub fn from_value(value: Value) -> QueryResult<Self> {
        from_value("space", value)
    }

    pub fn stored(space_soul: Soul) -> Self {
        Self {
            space_soul: Some(space_soul),
            ..Self::default()
        }
    }

    fn has_inline(&self) -> bool {
        self.good.is_some() || self.bad.is_some()
    }
}

/// Stored spaces currently being expanded, outermost first.
#[derive(Debug, Clone, Default)]
struct Trail(Vec<Soul>);

impl Trail {
    fn enter(&self, soul: &Soul) -> QueryResult<Trail> {
        if self.0.contains(soul) {
            let chain: Vec<&str> = self.0.iter().map(Soul::as_str).collect();
            return Err(QueryError::invariant(format!(
                "space reference cycle: {} -> {soul}",
                chain.join(" -> ")
            )));
        }
        let mut next = self.0.clone();
        next.push(soul.clone());
        Ok(Trail(next))
    }
}

pub async fn resolve_lens(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    lens: &Lens,
) -> QueryResult<Resolved> {
    lens_at(scope, options, lens, Trail::default()).await
}

pub async fn resolve_space(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    space: &Space,
) -> QueryResult<Resolved> {
    space_at(scope, options, space, Trail::default()).await
}

/// Quantifier over lenses: absent or empty list is unconstrained.
pub async fn multi_lens(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    lenses: Option<&[Lens]>,
) -> QueryResult<Resolved> {
    quantify(lenses, |lens| resolve_lens(scope, options, lens)).await
}

/// Quantifier over spaces: absent or empty list is unconstrained.
pub async fn multi_space(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    spaces: Option<&[Space]>,
) -> QueryResult<Resolved> {
    quantify(spaces, |space| resolve_space(scope, options, space)).await
}

fn lens_at<'a>(
    scope: &'a dyn GraphScope,
    options: &'a QueryOptions,
    lens: &'a Lens,
    trail: Trail,
) -> BoxFuture<'a, QueryResult<Resolved>> {
    async move {
        let kind = lens.author_kind;
        let replies = async {
            match &lens.replies_to_author_id {
                Some(author) => replies_to_author(scope, author, kind).await,
                None => Ok(Resolved::Unconstrained),
            }
        };
        let spaces = space_union(scope, options, lens.spaces.as_deref(), &trail);
        let stored = async {
            match &lens.lens_soul {
                Some(lens_soul) => stored_lens(scope, lens_soul).await,
                None => Ok(Resolved::Unconstrained),
            }
        };

        let (replies, authors, domains, urls, topics, submissions, spaces, stored) = futures::try_join!(
            replies,
            multi_author(scope, lens.author_ids.as_deref(), kind),
            multi_domain(scope, lens.domains.as_deref()),
            multi_url(scope, lens.urls.as_deref()),
            multi_topic(scope, options, lens.topics.as_deref()),
            multi_submission(scope, lens.submission_ids.as_deref()),
            spaces,
            stored,
        )?;

        let query = Resolved::intersect_all([
            replies,
            authors,
            domains,
            urls,
            topics,
            submissions,
            spaces,
        ]);
        Ok(query.narrow(stored))
    }
    .boxed()
}

/// Spaces a lens is restricted to; none listed leaves it unconstrained.
async fn space_union(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    spaces: Option<&[Space]>,
    trail: &Trail,
) -> QueryResult<Resolved> {
    let Some(spaces) = spaces.filter(|spaces| !spaces.is_empty()) else {
        return Ok(Resolved::Unconstrained);
    };
    let parts = try_join_all(
        spaces
            .iter()
            .map(|space| space_at(scope, options, space, trail.clone())),
    )
    .await?;
    Ok(Resolved::union_all(parts))
}

async fn stored_lens(scope: &dyn GraphScope, lens_soul: &Soul) -> QueryResult<Resolved> {
    let things = soul::child_of(lens_soul, NodeType::Lens, NodeType::LensThings)?;
    Ok(Resolved::from_souls(scope.souls(&things).await?))
}

fn space_at<'a>(
    scope: &'a dyn GraphScope,
    options: &'a QueryOptions,
    space: &'a Space,
    trail: Trail,
) -> BoxFuture<'a, QueryResult<Resolved>> {
    async move {
        let inline = async {
            if !space.has_inline() {
                return Ok(None);
            }
            let good = lens_union(scope, options, space.good.as_deref(), &trail).await?;
            let bad = lens_union(scope, options, space.bad.as_deref(), &trail).await?;
            good.difference(bad).map(Some)
        };
        let stored = async {
            match &space.space_soul {
                Some(space_soul) => stored_space(scope, options, space_soul, &trail)
                    .await
                    .map(Some),
                None => Ok(None),
            }
        };

        let (inline, stored) = futures::try_join!(inline, stored)?;
        Ok(match (inline, stored) {
            (Some(inline), Some(stored)) => inline.narrow(stored),
            (Some(only), None) | (None, Some(only)) => only,
            (None, None) => Resolved::Unconstrained,
        })
    }
    .boxed()
}

/// Union of a space side. A side with no lenses admits nothing.
async fn lens_union(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    lenses: Option<&[Lens]>,
    trail: &Trail,
) -> QueryResult<Resolved> {
    let lenses = lenses.unwrap_or_default();
    let parts = try_join_all(
        lenses
            .iter()
            .map(|lens| lens_at(scope, options, lens, trail.clone())),
    )
    .await?;
    Ok(Resolved::union_all(parts))
}

enum Member {
    Lens(Lens),
    Space(Space),
}

impl Member {
    fn classify(soul: Soul) -> QueryResult<Member> {
        if NodeType::Lens.is_match(soul.as_str()).is_some() {
            Ok(Member::Lens(Lens::stored(soul)))
        } else if NodeType::Space.is_match(soul.as_str()).is_some() {
            Ok(Member::Space(Space::stored(soul)))
        } else {
            Err(QueryError::unresolvable(format!(
                "space member is neither a lens nor a space: {soul}"
            )))
        }
    }
}

async fn stored_space(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    space_soul: &Soul,
    trail: &Trail,
) -> QueryResult<Resolved> {
    let trail = trail.enter(space_soul)?;
    let good_set = soul::child_of(space_soul, NodeType::Space, NodeType::SpaceGood)?;
    let bad_set = soul::child_of(space_soul, NodeType::Space, NodeType::SpaceBad)?;
    let (good, bad) = futures::try_join!(scope.souls(&good_set), scope.souls(&bad_set))?;

    let good = good
        .into_iter()
        .map(Member::classify)
        .collect::<QueryResult<Vec<_>>>()?;
    let bad = bad
        .into_iter()
        .map(Member::classify)
        .collect::<QueryResult<Vec<_>>>()?;

    let good = member_union(scope, options, &good, &trail).await?;
    let bad = member_union(scope, options, &bad, &trail).await?;
    good.difference(bad)
}

async fn member_union(
    scope: &dyn GraphScope,
    options: &QueryOptions,
    members: &[Member],
    trail: &Trail,
) -> QueryResult<Resolved> {
    let parts = try_join_all(members.iter().map(|member| match member {
        Member::Lens(lens) => lens_at(scope, options, lens, trail.clone()),
        Member::Space(space) => space_at(scope, options, space, trail.clone()),
    }))
    .await?;
    Ok(Resolved::union_all(parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use nab_graph::MemoryScope;
    use serde_json::json;

    fn options() -> QueryOptions {
        QueryOptions::at(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap())
    }

    fn link(scope: &MemoryScope, set: &str, member: &str) {
        scope.link(Soul::new(set), Soul::new(member)).expect("link");
    }

    fn fixture() -> MemoryScope {
        let scope = MemoryScope::new();
        link(&scope, "nab/domains/a.org", "nab/things/1");
        link(&scope, "nab/domains/a.org", "nab/things/2");
        link(&scope, "nab/domains/a.org", "nab/things/3");
        link(&scope, "nab/topics/art/days/2024/3/10", "nab/things/2");
        link(&scope, "nab/topics/art/days/2024/3/10", "nab/things/3");
        link(&scope, "nab/topics/art/days/2024/3/10", "nab/things/4");
        scope
    }

    fn souls(resolved: Resolved) -> Vec<String> {
        let mut out: Vec<String> = resolved
            .into_souls()
            .expect("constrained")
            .into_iter()
            .map(Soul::into_string)
            .collect();
        out.sort();
        out
    }

    fn lens(value: Value) -> Lens {
        Lens::from_value(value).expect("lens")
    }

    #[tokio::test]
    async fn lens_without_criteria_is_unconstrained() {
        let scope = fixture();
        let out = resolve_lens(&scope, &options(), &Lens::default())
            .await
            .expect("lens");
        assert!(out.is_unconstrained());
    }

    #[tokio::test]
    async fn lens_intersects_active_dimensions() {
        let scope = fixture();
        let out = resolve_lens(
            &scope,
            &options(),
            &lens(json!({ "domains": ["a.org"], "topics": ["art"] })),
        )
        .await
        .expect("lens");
        assert_eq!(souls(out), vec!["nab/things/2", "nab/things/3"]);
    }

    #[tokio::test]
    async fn lens_with_an_empty_dimension_is_empty() {
        let scope = fixture();
        let out = resolve_lens(
            &scope,
            &options(),
            &lens(json!({ "domains": ["a.org"], "topics": ["quiet"] })),
        )
        .await
        .expect("lens");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn stored_lens_only_narrows() {
        let scope = fixture();
        link(&scope, "nab/lenses/l1/things", "nab/things/3");
        link(&scope, "nab/lenses/l1/things", "nab/things/99");

        let narrowed = resolve_lens(
            &scope,
            &options(),
            &lens(json!({ "domains": ["a.org"], "lensSoul": "nab/lenses/l1" })),
        )
        .await
        .expect("lens");
        assert_eq!(souls(narrowed), vec!["nab/things/3"]);

        let alone = resolve_lens(&scope, &options(), &Lens::stored(Soul::new("nab/lenses/l1")))
            .await
            .expect("lens");
        assert_eq!(souls(alone), vec!["nab/things/3", "nab/things/99"]);
    }

    #[tokio::test]
    async fn space_of_the_same_lens_good_and_bad_is_empty() {
        let scope = fixture();
        for a in [
            Lens::default(),
            lens(json!({ "domains": ["a.org"] })),
            lens(json!({ "topics": ["quiet"] })),
        ] {
            let space = Space {
                space_soul: None,
                good: Some(vec![a.clone()]),
                bad: Some(vec![a]),
            };
            let out = resolve_space(&scope, &options(), &space).await.expect("space");
            assert!(out.is_empty(), "{out:?}");
        }
    }

    #[tokio::test]
    async fn space_subtracts_bad_from_good() {
        let scope = fixture();
        let space = Space::from_value(json!({
            "good": [{ "domains": ["a.org"] }],
            "bad": [{ "topics": ["art"] }]
        }))
        .expect("space");
        let out = resolve_space(&scope, &options(), &space).await.expect("space");
        assert_eq!(souls(out), vec!["nab/things/1"]);
    }

    #[tokio::test]
    async fn stored_spaces_nest() {
        let scope = fixture();
        link(&scope, "nab/lenses/all/things", "nab/things/1");
        link(&scope, "nab/lenses/all/things", "nab/things/4");
        link(&scope, "nab/spaces/inner/good", "nab/lenses/all");
        link(&scope, "nab/spaces/outer/good", "nab/spaces/inner");
        link(&scope, "nab/lenses/hide/things", "nab/things/4");
        link(&scope, "nab/spaces/outer/bad", "nab/lenses/hide");

        let out = resolve_space(&scope, &options(), &Space::stored(Soul::new("nab/spaces/outer")))
            .await
            .expect("space");
        assert_eq!(souls(out), vec!["nab/things/1"]);
    }

    #[tokio::test]
    async fn space_cycles_are_invariant_violations() {
        let scope = fixture();
        link(&scope, "nab/spaces/a/good", "nab/spaces/b");
        link(&scope, "nab/spaces/b/good", "nab/spaces/a");

        let err = resolve_space(&scope, &options(), &Space::stored(Soul::new("nab/spaces/a")))
            .await
            .expect_err("cycle");
        assert!(matches!(err, QueryError::InvariantViolation(_)), "{err}");
    }

    #[tokio::test]
    async fn shared_references_are_not_cycles() {
        let scope = fixture();
        link(&scope, "nab/lenses/l/things", "nab/things/1");
        link(&scope, "nab/spaces/leaf/good", "nab/lenses/l");
        link(&scope, "nab/spaces/top/good", "nab/spaces/leaf");
        link(&scope, "nab/spaces/top/bad", "nab/spaces/leaf");

        let out = resolve_space(&scope, &options(), &Space::stored(Soul::new("nab/spaces/top")))
            .await
            .expect("diamond is fine");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn unknown_dimensions_and_members_are_unresolvable() {
        let err = Lens::from_value(json!({ "colours": ["red"] })).expect_err("unknown field");
        assert!(matches!(err, QueryError::UnresolvableQuery(_)));

        let scope = fixture();
        link(&scope, "nab/spaces/odd/good", "nab/things/1");
        let err = resolve_space(&scope, &options(), &Space::stored(Soul::new("nab/spaces/odd")))
            .await
            .expect_err("bad member");
        assert!(matches!(err, QueryError::UnresolvableQuery(_)));
    }

    #[tokio::test]
    async fn lens_can_be_restricted_to_a_space() {
        let scope = fixture();
        let out = resolve_lens(
            &scope,
            &options(),
            &lens(json!({
                "topics": ["art"],
                "spaces": [{ "good": [{ "domains": ["a.org"] }] }]
            })),
        )
        .await
        .expect("lens");
        assert_eq!(souls(out), vec!["nab/things/2", "nab/things/3"]);
    }

    #[tokio::test]
    async fn multi_lens_of_nothing_is_unconstrained() {
        let scope = fixture();
        let out = multi_lens(&scope, &options(), Some(&[])).await.expect("lenses");
        assert!(out.is_unconstrained());
        let out = multi_space(&scope, &options(), None).await.expect("spaces");
        assert!(out.is_unconstrained());
    }
}
