//! Account Ledger
//!
//! Bridges the orchestration core's [`QuotaLedger`] contract to the
//! account store. Users unknown to the store are provisioned on first
//! contact with the default tier; counters reset lazily when the stored
//! reset date has passed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use concierge_core::{CoreError, QuotaLedger, ResourceKind};

use crate::error::AccountError;
use crate::store::{QuotaRecord, QuotaStore};
use crate::tier::Tier;

/// Quota ledger backed by a [`QuotaStore`]
pub struct AccountLedger {
    store: Arc<dyn QuotaStore>,
    default_tier: Tier,
}

impl AccountLedger {
    pub fn new(store: Arc<dyn QuotaStore>) -> Self {
        Self {
            store,
            default_tier: Tier::default(),
        }
    }

    pub fn with_default_tier(mut self, tier: Tier) -> Self {
        self.default_tier = tier;
        self
    }

    /// Current record for a user, provisioning one if missing
    pub fn status(&self, user_id: &str) -> crate::error::Result<QuotaRecord> {
        self.provision_if_missing(user_id)?;
        self.store
            .get(user_id)?
            .ok_or_else(|| AccountError::UnknownUser(user_id.into()))
    }

    fn provision_if_missing(&self, user_id: &str) -> crate::error::Result<()> {
        if self.store.get(user_id)?.is_none() {
            let today = Utc::now().date_naive();
            let record = QuotaRecord::new(user_id, self.default_tier, today);
            tracing::info!(user = user_id, tier = %record.tier, "Provisioning quota record");
            self.store.upsert(&record)?;
        }
        Ok(())
    }
}

#[async_trait]
impl QuotaLedger for AccountLedger {
    async fn try_consume(&self, user_id: &str, kind: ResourceKind) -> concierge_core::Result<bool> {
        self.provision_if_missing(user_id)
            .map_err(CoreError::from)?;
        self.store
            .decrement_if_positive(user_id, kind)
            .map_err(CoreError::from)
    }

    async fn reset_if_due(&self, user_id: &str) -> concierge_core::Result<()> {
        self.provision_if_missing(user_id)
            .map_err(CoreError::from)?;
        let today = Utc::now().date_naive();
        let reset = self
            .store
            .reset_if_due(user_id, today)
            .map_err(CoreError::from)?;
        if reset {
            tracing::info!(user = user_id, "Quota counters reset for new period");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryQuotaStore;
    use chrono::NaiveDate;

    fn ledger_with_store() -> (AccountLedger, Arc<MemoryQuotaStore>) {
        let store = Arc::new(MemoryQuotaStore::new());
        (AccountLedger::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_unknown_user_is_provisioned_on_first_consume() {
        let (ledger, store) = ledger_with_store();

        assert!(ledger
            .try_consume("newcomer", ResourceKind::ModelQuery)
            .await
            .unwrap());

        let record = store.get("newcomer").unwrap().unwrap();
        assert_eq!(record.tier, Tier::Free);
        assert_eq!(record.remaining(ResourceKind::ModelQuery), 49);
    }

    #[tokio::test]
    async fn test_exhausted_counter_rejects_without_going_negative() {
        let (ledger, store) = ledger_with_store();
        let today = Utc::now().date_naive();
        let mut record = QuotaRecord::new("u1", Tier::Free, today);
        record.model_queries_left = 0;
        store.upsert(&record).unwrap();

        assert!(!ledger
            .try_consume("u1", ResourceKind::ModelQuery)
            .await
            .unwrap());
        assert_eq!(
            store
                .get("u1")
                .unwrap()
                .unwrap()
                .remaining(ResourceKind::ModelQuery),
            0
        );
    }

    #[tokio::test]
    async fn test_lazy_reset_restores_tier_limits() {
        let (ledger, store) = ledger_with_store();
        let past = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut record = QuotaRecord::new("u1", Tier::Plus, past);
        record.model_queries_left = 0;
        record.reset_date = past;
        store.upsert(&record).unwrap();

        ledger.reset_if_due("u1").await.unwrap();

        let record = store.get("u1").unwrap().unwrap();
        assert_eq!(record.remaining(ResourceKind::ModelQuery), 500);
    }

    #[tokio::test]
    async fn test_concurrent_consumers_never_oversubscribe() {
        let (ledger, store) = ledger_with_store();
        let today = Utc::now().date_naive();
        let mut record = QuotaRecord::new("u1", Tier::Free, today);
        record.external_lookups_left = 5;
        store.upsert(&record).unwrap();

        let ledger = Arc::new(ledger);
        let mut handles = Vec::new();
        for _ in 0..32 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .try_consume("u1", ResourceKind::ExternalLookup)
                    .await
                    .unwrap()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 5);
        assert_eq!(
            store
                .get("u1")
                .unwrap()
                .unwrap()
                .remaining(ResourceKind::ExternalLookup),
            0
        );
    }
}
