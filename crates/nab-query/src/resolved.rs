//! Resolution results.
//!
//! A filter resolves to one of three states. `Unconstrained` means no
//! criterion was active and admits everything; `Empty` means criteria were
//! active and nothing satisfied them. The two never collapse into each other.

use nab_kernel::{QueryError, QueryResult, Soul};
use std::collections::HashSet;

/// Ordered, duplicate-free set of souls. Order is first-seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoulSet {
    order: Vec<Soul>,
    index: HashSet<Soul>,
}

impl SoulSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, soul: Soul) -> bool {
        if self.index.insert(soul.clone()) {
            self.order.push(soul);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, soul: &Soul) -> bool {
        self.index.contains(soul)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Soul> {
        self.order.iter()
    }

    pub fn into_vec(self) -> Vec<Soul> {
        self.order
    }
}

impl FromIterator<Soul> for SoulSet {
    fn from_iter<I: IntoIterator<Item = Soul>>(iter: I) -> Self {
        let mut set = SoulSet::new();
        for soul in iter {
            set.insert(soul);
        }
        set
    }
}

impl Extend<Soul> for SoulSet {
    fn extend<I: IntoIterator<Item = Soul>>(&mut self, iter: I) {
        for soul in iter {
            self.insert(soul);
        }
    }
}

/// Outcome of resolving one filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// No active criterion: matches everything.
    Unconstrained,
    /// Active criteria matched nothing.
    Empty,
    /// Active criteria matched these souls (never empty).
    Set(SoulSet),
}

impl Resolved {
    pub fn from_souls<I: IntoIterator<Item = Soul>>(souls: I) -> Self {
        let set: SoulSet = souls.into_iter().collect();
        if set.is_empty() {
            Resolved::Empty
        } else {
            Resolved::Set(set)
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Resolved::Unconstrained)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Resolved::Empty)
    }

    /// Materialized souls; `None` when unconstrained.
    pub fn souls(&self) -> Option<Vec<Soul>> {
        match self {
            Resolved::Unconstrained => None,
            Resolved::Empty => Some(Vec::new()),
            Resolved::Set(set) => Some(set.iter().cloned().collect()),
        }
    }

    pub fn into_souls(self) -> Option<Vec<Soul>> {
        match self {
            Resolved::Unconstrained => None,
            Resolved::Empty => Some(Vec::new()),
            Resolved::Set(set) => Some(set.into_vec()),
        }
    }

    /// Union. Anything unioned with `Unconstrained` is unconstrained; the
    /// union of nothing is empty.
    pub fn union_all<I: IntoIterator<Item = Resolved>>(parts: I) -> Resolved {
        let mut out = SoulSet::new();
        for part in parts {
            match part {
                Resolved::Unconstrained => return Resolved::Unconstrained,
                Resolved::Empty => {}
                Resolved::Set(set) => out.extend(set.into_vec()),
            }
        }
        Resolved::from_souls(out.into_vec())
    }

    /// Intersection over the constrained parts. `Unconstrained` parts are
    /// neutral, so with no constrained part the result stays unconstrained.
    /// Order follows the first constrained part.
    pub fn intersect_all<I: IntoIterator<Item = Resolved>>(parts: I) -> Resolved {
        let mut acc: Option<SoulSet> = None;
        for part in parts {
            match part {
                Resolved::Unconstrained => {}
                Resolved::Empty => return Resolved::Empty,
                Resolved::Set(set) => {
                    acc = Some(match acc {
                        None => set,
                        Some(current) => current
                            .into_vec()
                            .into_iter()
                            .filter(|soul| set.contains(soul))
                            .collect(),
                    });
                }
            }
        }
        match acc {
            None => Resolved::Unconstrained,
            Some(set) => Resolved::from_souls(set.into_vec()),
        }
    }

    /// Intersect with `bound`. Narrows, never widens.
    pub fn narrow(self, bound: Resolved) -> Resolved {
        Resolved::intersect_all([self, bound])
    }

    /// `self − excluded`.
    ///
    /// Excluding everything leaves nothing. An unconstrained set minus a
    /// concrete exclusion cannot be materialized and is refused.
    pub fn difference(self, excluded: Resolved) -> QueryResult<Resolved> {
        match (self, excluded) {
            (_, Resolved::Unconstrained) => Ok(Resolved::Empty),
            (keep, Resolved::Empty) => Ok(keep),
            (Resolved::Unconstrained, Resolved::Set(_)) => Err(QueryError::unresolvable(
                "cannot exclude from an unconstrained selection; give the space a good lens",
            )),
            (Resolved::Empty, Resolved::Set(_)) => Ok(Resolved::Empty),
            (Resolved::Set(keep), Resolved::Set(drop)) => Ok(Resolved::from_souls(
                keep.into_vec().into_iter().filter(|soul| !drop.contains(soul)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(raw: &[&str]) -> Resolved {
        Resolved::from_souls(raw.iter().map(|s| Soul::new(*s)))
    }

    #[test]
    fn empty_input_is_empty_not_unconstrained() {
        assert_eq!(Resolved::from_souls(Vec::new()), Resolved::Empty);
        assert_eq!(Resolved::union_all(Vec::new()), Resolved::Empty);
        assert_eq!(Resolved::intersect_all(Vec::new()), Resolved::Unconstrained);
    }

    #[test]
    fn union_dedupes_and_keeps_first_seen_order() {
        let out = Resolved::union_all([set(&["a", "b"]), set(&["b", "c"]), Resolved::Empty]);
        assert_eq!(out, set(&["a", "b", "c"]));
        assert!(Resolved::union_all([set(&["a"]), Resolved::Unconstrained]).is_unconstrained());
    }

    #[test]
    fn intersection_ignores_unconstrained_parts() {
        let out = Resolved::intersect_all([
            Resolved::Unconstrained,
            set(&["c", "b", "a"]),
            set(&["a", "c"]),
        ]);
        assert_eq!(out, set(&["c", "a"]));
        assert!(Resolved::intersect_all([set(&["a"]), Resolved::Empty]).is_empty());
        assert!(Resolved::intersect_all([set(&["a"]), set(&["b"])]).is_empty());
    }

    #[test]
    fn intersection_is_commutative_as_a_set() {
        let a = set(&["1", "2", "3"]);
        let b = set(&["2", "3", "4"]);
        let mut left = Resolved::intersect_all([a.clone(), b.clone()])
            .into_souls()
            .expect("constrained");
        let mut right = Resolved::intersect_all([b, a]).into_souls().expect("constrained");
        left.sort();
        right.sort();
        assert_eq!(left, right);
    }

    #[test]
    fn narrowing_never_widens() {
        assert_eq!(Resolved::Unconstrained.narrow(set(&["a"])), set(&["a"]));
        assert_eq!(set(&["a", "b"]).narrow(set(&["b", "z"])), set(&["b"]));
        assert!(set(&["a"]).narrow(Resolved::Empty).is_empty());
    }

    #[test]
    fn difference_cases() {
        assert_eq!(
            set(&["a", "b"]).difference(set(&["b"])).expect("diff"),
            set(&["a"])
        );
        assert!(
            set(&["a"])
                .difference(Resolved::Unconstrained)
                .expect("diff")
                .is_empty()
        );
        assert!(
            Resolved::Unconstrained
                .difference(Resolved::Unconstrained)
                .expect("diff")
                .is_empty()
        );
        assert!(
            Resolved::Unconstrained
                .difference(Resolved::Empty)
                .expect("diff")
                .is_unconstrained()
        );
        assert!(matches!(
            Resolved::Unconstrained.difference(set(&["a"])),
            Err(QueryError::UnresolvableQuery(_))
        ));
    }
}
