//! Application State

use std::sync::Arc;

use concierge_accounts::AccountLedger;
use concierge_core::{CapabilityRegistry, DispatchConfig, ModelProvider};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Model provider (Ollama, etc.)
    pub provider: Arc<dyn ModelProvider>,

    /// Capability registry, immutable after startup
    pub registry: Arc<CapabilityRegistry>,

    /// Per-user quota ledger
    pub ledger: Arc<AccountLedger>,

    /// Dispatch loop configuration shared by all requests
    pub dispatch_config: DispatchConfig,

    /// Bounded event channel capacity per request
    pub event_buffer: usize,
}
