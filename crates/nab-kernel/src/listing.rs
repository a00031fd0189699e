//! Listing wire payload.

use serde::{Deserialize, Serialize};

/// Joins ids inside `Listing::ids`.
pub const ID_DELIMITER: &str = "+";

/// Joins tab paths inside `Listing::tabs`.
pub const SOUL_DELIMITER: &str = "\u{1f}";

/// Largest page an assembled listing carries.
pub const MAX_LISTING_SIZE: usize = 1000;

/// An ordered, serialized content-query result. Built fresh per query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub name: String,
    pub ids: String,
    pub tabs: String,
    pub include_ranks: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_chat: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Listing {
    /// Ids in rank order; blank entries dropped.
    pub fn id_list(&self) -> Vec<&str> {
        split_nonempty(&self.ids, ID_DELIMITER)
    }

    /// Tab paths in display order; blank entries dropped.
    pub fn tab_list(&self) -> Vec<&str> {
        split_nonempty(&self.tabs, SOUL_DELIMITER)
    }
}

pub fn join_ids<I, S>(ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    join_nonempty(ids, ID_DELIMITER)
}

pub fn join_tabs<I, S>(tabs: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    join_nonempty(tabs, SOUL_DELIMITER)
}

fn join_nonempty<I, S>(parts: I, delimiter: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .filter(|part| !part.as_ref().is_empty())
        .map(|part| part.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(delimiter)
}

fn split_nonempty<'a>(raw: &'a str, delimiter: &str) -> Vec<&'a str> {
    raw.split(delimiter).filter(|part| !part.is_empty()).collect()
}
