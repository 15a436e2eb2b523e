use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The six ladder tiers, ordered from lowest to highest.
///
/// Stored and serialized by their lowercase tag (`"untrained"`, ...).
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumString, AsRefStr, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Rank {
    Untrained,
    Conditioned,
    Strong,
    Athletic,
    Elite,
    Forged
}

impl Rank {
    /// Tag used by the persistence layer
    pub fn tag(&self) -> &str {
        self.as_ref()
    }
}
