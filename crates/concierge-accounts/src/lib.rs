//! # concierge-accounts
//!
//! Subscription tiers and the per-user quota ledger for the concierge
//! backend. The orchestration core consumes this through its
//! `QuotaLedger` trait; everything payment-shaped (checkout, webhooks,
//! signature verification) happens in an external system that lands tier
//! changes here via [`QuotaStore::set_tier`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use concierge_accounts::{AccountLedger, MemoryQuotaStore};
//!
//! let store = Arc::new(MemoryQuotaStore::new());
//! let ledger = Arc::new(AccountLedger::new(store));
//!
//! // Hand to the dispatch loop as Arc<dyn QuotaLedger>
//! ```

mod error;
mod ledger;
mod store;
mod tier;

pub use error::{AccountError, Result};
pub use ledger::AccountLedger;
pub use store::{MemoryQuotaStore, QuotaRecord, QuotaStore};
pub use tier::{Tier, RESET_PERIOD_DAYS};
