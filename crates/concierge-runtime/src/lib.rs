//! # concierge-runtime
//!
//! Model provider implementations for the concierge backend.
//!
//! ## Providers
//!
//! - **Ollama** (default): local inference via the Ollama HTTP API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use concierge_runtime::OllamaProvider;
//!
//! let provider = Arc::new(OllamaProvider::from_env());
//! // Hand to the dispatch loop as Arc<dyn ModelProvider>
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use concierge_core::{
    CoreError, GenerationOptions, Message, ModelProvider, Result, Role,
};
