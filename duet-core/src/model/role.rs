use serde::{Deserialize, Serialize};
use std::fmt;

/// Negotiation role handed out by the relay.
///
/// On an offer collision the polite side rolls back its own offer and accepts
/// the remote one, the impolite side ignores the remote offer.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Polite,
    Impolite,
}

impl Role {
    pub fn is_polite(self) -> bool {
        self == Role::Polite
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Polite => f.write_str("polite"),
            Role::Impolite => f.write_str("impolite"),
        }
    }
}
