//! # concierge-core
//!
//! The tool-orchestration engine behind the concierge conversational
//! backend: a capability registry built once at startup, and a
//! per-request dispatch loop that alternates between model inference and
//! tool execution while streaming ordered events to the client.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Dispatch Loop                           │
//! │  ┌───────────┐  ┌────────────┐  ┌──────────┐  ┌──────────┐  │
//! │  │  Quota    │  │ Capability │  │   Shim   │  │  Model   │  │
//! │  │  Ledger   │  │  Registry  │  │ (timeout)│  │ Provider │  │
//! │  └───────────┘  └────────────┘  └──────────┘  └──────────┘  │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ bounded channel
//!                      ┌──────▼───────┐
//!                      │ SSE formatter │──▶ data: {...}\n\n
//!                      └──────────────┘
//! ```
//!
//! The registry is immutable after [`registry::CapabilityRegistry::load_all`]
//! and shared read-only across requests. Each request owns exactly one
//! [`dispatch::DispatchLoop`] run; tool calls are never parallelized
//! within a request, so the history fed back to the model stays causally
//! consistent.

pub mod capability;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod provider;
pub mod quota;
pub mod registry;
pub mod shim;
pub mod stream;

pub use capability::{Capability, CapabilitySchema, FailureKind, Observation, ParameterSchema, ToolCall};
pub use dispatch::{DispatchConfig, DispatchLoop, DispatchOutcome, StreamEvent};
pub use error::{CoreError, Result};
pub use message::{Conversation, Message, Role, Turn};
pub use provider::{GenerationOptions, ModelProvider};
pub use quota::{QuotaLedger, ResourceKind};
pub use registry::{CapabilityRegistry, CapabilitySource, RegistryBuildReport};
