//! Quota Storage
//!
//! Per-user usage counters with transactional semantics. The store
//! trait's decrement is a single conditional update: implementations
//! must never expose a read-then-write gap, because the same user's
//! counters are shared across concurrent sessions.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use concierge_core::ResourceKind;

use crate::error::{AccountError, Result};
use crate::tier::{Tier, RESET_PERIOD_DAYS};

/// A user's quota counters for the current billing period
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuotaRecord {
    /// Opaque user identity (already authenticated upstream)
    pub user_id: String,

    /// Subscription tier
    pub tier: Tier,

    /// Remaining model inference calls
    pub model_queries_left: u32,

    /// Remaining external data lookups
    pub external_lookups_left: u32,

    /// Remaining file operations
    pub file_operations_left: u32,

    /// Date the counters next reset to tier limits
    pub reset_date: NaiveDate,
}

impl QuotaRecord {
    /// Fresh record with full tier allowances
    pub fn new(user_id: impl Into<String>, tier: Tier, today: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            tier,
            model_queries_left: tier.limit(ResourceKind::ModelQuery),
            external_lookups_left: tier.limit(ResourceKind::ExternalLookup),
            file_operations_left: tier.limit(ResourceKind::FileOperation),
            reset_date: today + chrono::Duration::days(RESET_PERIOD_DAYS),
        }
    }

    pub fn remaining(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::ModelQuery => self.model_queries_left,
            ResourceKind::ExternalLookup => self.external_lookups_left,
            ResourceKind::FileOperation => self.file_operations_left,
        }
    }

    fn remaining_mut(&mut self, kind: ResourceKind) -> &mut u32 {
        match kind {
            ResourceKind::ModelQuery => &mut self.model_queries_left,
            ResourceKind::ExternalLookup => &mut self.external_lookups_left,
            ResourceKind::FileOperation => &mut self.file_operations_left,
        }
    }

    /// Whether the stored reset date has passed
    pub fn reset_due(&self, today: NaiveDate) -> bool {
        today >= self.reset_date
    }

    /// Restore all counters to tier limits and advance the reset date
    pub fn reset(&mut self, today: NaiveDate) {
        self.model_queries_left = self.tier.limit(ResourceKind::ModelQuery);
        self.external_lookups_left = self.tier.limit(ResourceKind::ExternalLookup);
        self.file_operations_left = self.tier.limit(ResourceKind::FileOperation);
        self.reset_date = today + chrono::Duration::days(RESET_PERIOD_DAYS);
    }
}

/// Transactional quota storage.
///
/// A relational implementation maps `decrement_if_positive` to a single
/// conditional `UPDATE ... SET n = n - 1 WHERE n > 0`; the in-memory
/// store holds one write lock across check and decrement for the same
/// effect.
pub trait QuotaStore: Send + Sync {
    /// Fetch a user's record
    fn get(&self, user_id: &str) -> Result<Option<QuotaRecord>>;

    /// Insert or replace a record
    fn upsert(&self, record: &QuotaRecord) -> Result<()>;

    /// Atomically decrement `kind` if remaining > 0. Returns `false`
    /// without mutating when exhausted; errors for unknown users.
    fn decrement_if_positive(&self, user_id: &str, kind: ResourceKind) -> Result<bool>;

    /// Reset counters to tier limits if the reset date has passed.
    /// Idempotent; returns whether a reset happened.
    fn reset_if_due(&self, user_id: &str, today: NaiveDate) -> Result<bool>;

    /// Change a user's tier, restoring counters to the new limits.
    /// Invoked after the external payment flow confirms an upgrade.
    fn set_tier(&self, user_id: &str, tier: Tier, today: NaiveDate) -> Result<()>;
}

/// In-memory quota store (for development and tests)
pub struct MemoryQuotaStore {
    records: RwLock<HashMap<String, QuotaRecord>>,
}

impl Default for MemoryQuotaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn get(&self, user_id: &str) -> Result<Option<QuotaRecord>> {
        let records = self.records.read().unwrap();
        Ok(records.get(user_id).cloned())
    }

    fn upsert(&self, record: &QuotaRecord) -> Result<()> {
        let mut records = self.records.write().unwrap();
        records.insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    fn decrement_if_positive(&self, user_id: &str, kind: ResourceKind) -> Result<bool> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| AccountError::UnknownUser(user_id.into()))?;

        let remaining = record.remaining_mut(kind);
        if *remaining > 0 {
            *remaining -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn reset_if_due(&self, user_id: &str, today: NaiveDate) -> Result<bool> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| AccountError::UnknownUser(user_id.into()))?;

        if record.reset_due(today) {
            record.reset(today);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn set_tier(&self, user_id: &str, tier: Tier, today: NaiveDate) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| AccountError::UnknownUser(user_id.into()))?;

        record.tier = tier;
        record.reset(today);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_new_record_has_tier_limits() {
        let record = QuotaRecord::new("u1", Tier::Free, today());
        assert_eq!(record.remaining(ResourceKind::ModelQuery), 50);
        assert_eq!(record.remaining(ResourceKind::ExternalLookup), 20);
        assert_eq!(record.remaining(ResourceKind::FileOperation), 5);
    }

    #[test]
    fn test_decrement_stops_at_zero() {
        let store = MemoryQuotaStore::new();
        let mut record = QuotaRecord::new("u1", Tier::Free, today());
        record.file_operations_left = 2;
        store.upsert(&record).unwrap();

        assert!(store
            .decrement_if_positive("u1", ResourceKind::FileOperation)
            .unwrap());
        assert!(store
            .decrement_if_positive("u1", ResourceKind::FileOperation)
            .unwrap());
        assert!(!store
            .decrement_if_positive("u1", ResourceKind::FileOperation)
            .unwrap());

        let record = store.get("u1").unwrap().unwrap();
        assert_eq!(record.remaining(ResourceKind::FileOperation), 0);
    }

    #[test]
    fn test_decrement_unknown_user_errors() {
        let store = MemoryQuotaStore::new();
        assert!(store
            .decrement_if_positive("ghost", ResourceKind::ModelQuery)
            .is_err());
    }

    #[test]
    fn test_reset_if_due_is_idempotent() {
        let store = MemoryQuotaStore::new();
        let mut record = QuotaRecord::new("u1", Tier::Free, today());
        record.model_queries_left = 0;
        record.reset_date = today(); // due now
        store.upsert(&record).unwrap();

        assert!(store.reset_if_due("u1", today()).unwrap());
        let record = store.get("u1").unwrap().unwrap();
        assert_eq!(record.remaining(ResourceKind::ModelQuery), 50);
        assert!(record.reset_date > today());

        // Second invocation is a no-op
        assert!(!store.reset_if_due("u1", today()).unwrap());
    }

    #[test]
    fn test_set_tier_restores_new_limits() {
        let store = MemoryQuotaStore::new();
        let mut record = QuotaRecord::new("u1", Tier::Free, today());
        record.model_queries_left = 1;
        store.upsert(&record).unwrap();

        store.set_tier("u1", Tier::Plus, today()).unwrap();

        let record = store.get("u1").unwrap().unwrap();
        assert_eq!(record.tier, Tier::Plus);
        assert_eq!(record.remaining(ResourceKind::ModelQuery), 500);
    }
}
