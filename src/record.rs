use serde::{Deserialize, Serialize};

/// Address recorded when the page has no address region.
pub const UNKNOWN_ADDRESS: &str = "Unknown";

/// One polling-station result page, as extracted.
///
/// A zero vote count means either "no votes" or "no number was found on the
/// page". The two are not distinguished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRecord {
    pub id: String,
    pub address: String,
    #[serde(rename = "Nawrocki")]
    pub nawrocki_votes: u64,
    #[serde(rename = "Trzaskowski")]
    pub trzaskowski_votes: u64,
}
