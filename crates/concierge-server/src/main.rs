//! concierge HTTP Server
//!
//! Axum-based server exposing the tool-orchestration engine: a prompt
//! endpoint that streams dispatch events as server-sent frames, plus
//! tool listing, user quota status, and health endpoints.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use concierge_accounts::{AccountLedger, MemoryQuotaStore};
use concierge_core::{CapabilityRegistry, DispatchConfig, ModelProvider};
use concierge_runtime::OllamaProvider;
use concierge_toolkit::capability_sources;

use crate::handlers::{health_check, list_tools, prompt, user_status};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Initialize model provider
    let provider = Arc::new(OllamaProvider::from_env());

    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to Ollama");
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Ollama not available - dispatch runs will fail");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    // Build the capability registry once, before accepting requests
    let (registry, report) = CapabilityRegistry::load_all(capability_sources());

    tracing::info!("Registered {} tools:", registry.len());
    for name in registry.names() {
        tracing::info!("  • {}", name);
    }
    for (source, reason) in &report.skipped {
        tracing::warn!("  ✗ {} skipped: {}", source, reason);
    }

    // Quota ledger over the in-memory store. A relational store plugs in
    // through the same QuotaStore trait.
    let store = Arc::new(MemoryQuotaStore::new());
    let ledger = Arc::new(AccountLedger::new(store));

    let event_buffer = std::env::var("CONCIERGE_EVENT_BUFFER")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(32);

    // Build application state
    let state = AppState {
        provider,
        registry: Arc::new(registry),
        ledger,
        dispatch_config: DispatchConfig::from_env(),
        event_buffer,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        // Agent API
        .route("/api/prompt", post(prompt))
        .route("/api/user/status", get(user_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("concierge server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health          - Health check");
    tracing::info!("  GET  /api/tools       - List registered tools");
    tracing::info!("  POST /api/prompt      - Send message, stream events");
    tracing::info!("  GET  /api/user/status - Tier and remaining quota");

    axum::serve(listener, app).await?;

    Ok(())
}
