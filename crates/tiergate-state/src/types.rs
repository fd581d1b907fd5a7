//! Domain types for the Tiergate state store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two serving backends.
///
/// The wire names match what the routing layer embeds in session ids and
/// writes into its request logs, which is also what the capacity loop's
/// evidence scan searches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    /// Cheap, fast, lower-capacity backend.
    #[serde(rename = "small-model")]
    Small,
    /// Expensive, higher-capacity backend. The conservative default.
    #[serde(rename = "large-model")]
    Large,
}

impl Tier {
    /// Stable wire name for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Small => "small-model",
            Tier::Large => "large-model",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session's tier assignment with an absolute expiry.
///
/// Written by the request-routing layer when a session is initiated;
/// read-only from the control loop's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBinding {
    pub tier: Tier,
    /// Unix timestamp (seconds) after which the binding no longer resolves.
    pub expires_at: u64,
}
