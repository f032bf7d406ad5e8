//! Usage Quotas
//!
//! The dispatch loop meters consumption per user and per resource kind.
//! The ledger itself lives outside this crate (backed by the account
//! store); the loop only needs atomic decrement-if-positive semantics.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Billable resource categories
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// One model inference round trip
    ModelQuery,
    /// One call out to an external data source
    ExternalLookup,
    /// One file read/write/stat operation
    FileOperation,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::ModelQuery,
        ResourceKind::ExternalLookup,
        ResourceKind::FileOperation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ModelQuery => "model_query",
            ResourceKind::ExternalLookup => "external_lookup",
            ResourceKind::FileOperation => "file_operation",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::ModelQuery => write!(f, "model query"),
            ResourceKind::ExternalLookup => write!(f, "external lookup"),
            ResourceKind::FileOperation => write!(f, "file operation"),
        }
    }
}

/// Per-user usage counters consumed by the dispatch loop.
///
/// Implementations must make `try_consume` atomic with respect to
/// concurrent requests from the same user: two callers racing for the
/// last unit must not both succeed, and a counter never goes negative.
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Atomically check remaining > 0 and decrement. Returns `false`
    /// without mutating state when the counter is already exhausted.
    async fn try_consume(&self, user_id: &str, kind: ResourceKind) -> Result<bool>;

    /// Idempotently restore counters to tier limits if the stored reset
    /// date has passed. Invoked lazily before consumption checks.
    async fn reset_if_due(&self, user_id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde_tags() {
        let json = serde_json::to_string(&ResourceKind::ExternalLookup).unwrap();
        assert_eq!(json, r#""external_lookup""#);
    }

    #[test]
    fn test_kind_str_matches_all() {
        for kind in ResourceKind::ALL {
            assert!(!kind.as_str().is_empty());
        }
    }
}
