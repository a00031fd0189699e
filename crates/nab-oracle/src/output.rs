use nab_kernel::{Listing, VoteCounts};
use serde::Serialize;

/// What an oracle execution produces. Serializes as the bare payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OracleOutput {
    Listing(Listing),
    VoteCounts(VoteCounts),
}

impl OracleOutput {
    pub fn as_listing(&self) -> Option<&Listing> {
        match self {
            OracleOutput::Listing(listing) => Some(listing),
            OracleOutput::VoteCounts(_) => None,
        }
    }

    pub fn as_vote_counts(&self) -> Option<&VoteCounts> {
        match self {
            OracleOutput::VoteCounts(votes) => Some(votes),
            OracleOutput::Listing(_) => None,
        }
    }
}

impl From<Listing> for OracleOutput {
    fn from(listing: Listing) -> Self {
        OracleOutput::Listing(listing)
    }
}

impl From<VoteCounts> for OracleOutput {
    fn from(votes: VoteCounts) -> Self {
        OracleOutput::VoteCounts(votes)
    }
}
