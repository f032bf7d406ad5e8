//! Subscription Tiers
//!
//! Each tier grants a fixed allowance per resource kind per billing
//! period. Tier changes arrive through the store API after the external
//! payment flow completes; this crate never talks to a payment provider.

use serde::{Deserialize, Serialize};

use concierge_core::ResourceKind;

use crate::error::{AccountError, Result};

/// How long one billing period lasts before counters reset
pub const RESET_PERIOD_DAYS: i64 = 30;

/// Subscription tiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Plus,
    Pro,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Plus => "plus",
            Tier::Pro => "pro",
        }
    }

    /// Parse a tier name; unknown names are an error rather than a
    /// silent downgrade.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "plus" => Ok(Tier::Plus),
            "pro" => Ok(Tier::Pro),
            other => Err(AccountError::UnknownTier(other.into())),
        }
    }

    /// Allowance for one resource kind per billing period
    pub fn limit(&self, kind: ResourceKind) -> u32 {
        match (self, kind) {
            (Tier::Free, ResourceKind::ModelQuery) => 50,
            (Tier::Free, ResourceKind::ExternalLookup) => 20,
            (Tier::Free, ResourceKind::FileOperation) => 5,
            (Tier::Plus, ResourceKind::ModelQuery) => 500,
            (Tier::Plus, ResourceKind::ExternalLookup) => 200,
            (Tier::Plus, ResourceKind::FileOperation) => 50,
            (Tier::Pro, ResourceKind::ModelQuery) => 5000,
            (Tier::Pro, ResourceKind::ExternalLookup) => 2000,
            (Tier::Pro, ResourceKind::FileOperation) => 500,
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Free
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for tier in [Tier::Free, Tier::Plus, Tier::Pro] {
            assert_eq!(Tier::parse(tier.as_str()).unwrap(), tier);
        }
        assert!(Tier::parse("platinum").is_err());
    }

    #[test]
    fn test_limits_grow_with_tier() {
        for kind in ResourceKind::ALL {
            assert!(Tier::Free.limit(kind) < Tier::Plus.limit(kind));
            assert!(Tier::Plus.limit(kind) < Tier::Pro.limit(kind));
        }
    }
}
