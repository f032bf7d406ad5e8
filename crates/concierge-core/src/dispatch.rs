//! Dispatch Loop
//!
//! The per-request state machine. Each request owns one loop instance
//! that alternates between model inference and tool execution: consult
//! the quota ledger, ask the model for the next step, run at most one
//! tool call, append the observation, repeat until a final answer, the
//! iteration ceiling, quota exhaustion, or an unrecoverable error.
//!
//! Events are pushed into a bounded channel in transition order; the
//! channel's capacity provides backpressure when the client reads
//! slowly, and a closed channel (client disconnect) stops the loop
//! without consuming further quota.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::capability::{Capability, FailureKind, Observation, ToolCall};
use crate::error::CoreError;
use crate::message::{Conversation, Message};
use crate::provider::{GenerationOptions, ModelProvider};
use crate::quota::{QuotaLedger, ResourceKind};
use crate::registry::CapabilityRegistry;
use crate::shim;

/// Events emitted during a dispatch run, in strict transition order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Model prose preceding a tool call
    Thinking { content: String },
    /// The model requested a tool invocation
    ToolCall {
        content: String,
        tool: String,
        arguments: Value,
    },
    /// A tool invocation finished (successfully or not)
    ToolResult {
        content: String,
        tool: String,
        ok: bool,
    },
    /// The final answer; always the last frame of a successful run
    Final { content: String },
    /// Terminal failure; always the last frame of a failed run
    Error { content: String },
}

impl StreamEvent {
    /// The wire discriminator for this event
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Thinking { .. } => "thinking",
            StreamEvent::ToolCall { .. } => "tool_call",
            StreamEvent::ToolResult { .. } => "tool_result",
            StreamEvent::Final { .. } => "final",
            StreamEvent::Error { .. } => "error",
        }
    }
}

/// Terminal state of a dispatch run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Final answer delivered
    Completed,
    /// Unrecoverable error or iteration ceiling
    Failed,
    /// A per-user counter ran out
    QuotaExceeded,
    /// Client went away; no terminal frame could be delivered
    Cancelled,
}

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful AI assistant.

When you need to use a tool, respond with a JSON block in this exact format:
```tool
{"tool": "tool_name", "arguments": {"arg1": "value1"}}
```

After receiving tool results, synthesize them into a helpful response.
If you can answer directly without tools, do so.
Be concise and accurate."#;

/// Dispatch loop configuration
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// System prompt template
    pub system_prompt: String,

    /// Hard ceiling on model↔tool round trips per request
    pub max_iterations: usize,

    /// Wall-clock budget for a single tool invocation
    pub tool_timeout: Duration,

    /// Generation options passed to the provider
    pub generation: GenerationOptions,

    /// Whether to append tool descriptions to the system prompt
    pub inject_tool_descriptions: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 8,
            tool_timeout: Duration::from_secs(30),
            generation: GenerationOptions::default(),
            inject_tool_descriptions: true,
        }
    }
}

impl DispatchConfig {
    /// Build from environment variables, falling back to defaults.
    ///
    /// Recognized: `CONCIERGE_MODEL`, `CONCIERGE_MAX_ITERATIONS`,
    /// `CONCIERGE_TOOL_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(model) = std::env::var("CONCIERGE_MODEL") {
            config.generation.model = model;
        }
        if let Some(max) = std::env::var("CONCIERGE_MAX_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.max_iterations = max;
        }
        if let Some(secs) = std::env::var("CONCIERGE_TOOL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.tool_timeout = Duration::from_secs(secs);
        }

        config
    }
}

/// A tool call parsed out of a completion, with any prose that preceded it
struct ParsedCall {
    call: ToolCall,
    prose: String,
}

enum State {
    AwaitingModel,
    AwaitingTool {
        call: ToolCall,
        capability: Arc<dyn Capability>,
    },
}

/// The per-request dispatch loop
pub struct DispatchLoop {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<CapabilityRegistry>,
    ledger: Arc<dyn QuotaLedger>,
    config: DispatchConfig,
}

impl DispatchLoop {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        registry: Arc<CapabilityRegistry>,
        ledger: Arc<dyn QuotaLedger>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            ledger,
            config,
        }
    }

    fn build_system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.clone();
        if self.config.inject_tool_descriptions && !self.registry.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.registry.prompt_section());
        }
        prompt
    }

    /// Run one request to a terminal state, emitting events into `events`.
    ///
    /// Exactly one terminal frame (`final` or `error`) is emitted on
    /// every exit path, except when the client has already disconnected.
    pub async fn run(
        &self,
        user_id: &str,
        mut conversation: Conversation,
        events: mpsc::Sender<StreamEvent>,
    ) -> DispatchOutcome {
        conversation.ensure_system_prompt(self.build_system_prompt());

        let mut state = State::AwaitingModel;
        let mut iterations = 0usize;

        loop {
            match state {
                State::AwaitingModel => {
                    // Client gone: stop before consuming any more quota.
                    if events.is_closed() {
                        tracing::debug!(user = user_id, "Client disconnected, aborting run");
                        return DispatchOutcome::Cancelled;
                    }

                    iterations += 1;
                    if iterations > self.config.max_iterations {
                        tracing::warn!(
                            user = user_id,
                            ceiling = self.config.max_iterations,
                            "Iteration ceiling reached"
                        );
                        let msg = CoreError::MaxIterations(self.config.max_iterations).user_message();
                        return self.finish_error(&events, msg).await;
                    }

                    match self.consume(user_id, ResourceKind::ModelQuery, &events).await {
                        Ok(true) => {}
                        Ok(false) => {
                            let msg = CoreError::QuotaExceeded {
                                kind: ResourceKind::ModelQuery,
                            }
                            .user_message();
                            return self.finish_quota(&events, msg).await;
                        }
                        Err(outcome) => return outcome,
                    }

                    let completion = match self
                        .provider
                        .complete(conversation.messages(), &self.config.generation)
                        .await
                    {
                        Ok(c) => c,
                        Err(e) => {
                            tracing::error!(user = user_id, error = %e, "Model inference failed");
                            let msg = CoreError::ProviderUnavailable(String::new()).user_message();
                            return self.finish_error(&events, msg).await;
                        }
                    };

                    let content = completion.content;
                    conversation.push(Message::assistant(&content));

                    let Some(parsed) = parse_tool_call(&content) else {
                        if send(&events, StreamEvent::Final { content }).await.is_err() {
                            return DispatchOutcome::Cancelled;
                        }
                        return DispatchOutcome::Completed;
                    };

                    if !parsed.prose.is_empty() {
                        if send(
                            &events,
                            StreamEvent::Thinking {
                                content: parsed.prose,
                            },
                        )
                        .await
                        .is_err()
                        {
                            return DispatchOutcome::Cancelled;
                        }
                    }

                    let call = parsed.call;
                    let Some(capability) = self.registry.get(&call.name) else {
                        // Unknown tool: fold a failure observation back in
                        // and let the model retry, bounded by the ceiling.
                        tracing::debug!(user = user_id, tool = %call.name, "Unknown tool requested");
                        let obs = Observation::err(
                            &call.name,
                            FailureKind::InvalidArguments,
                            format!("no tool named '{}' is available", call.name),
                        );
                        conversation.push(Message::tool(obs.as_turn_text(), call.id.clone()));
                        if emit_observation(&events, &obs).await.is_err() {
                            return DispatchOutcome::Cancelled;
                        }
                        state = State::AwaitingModel;
                        continue;
                    };

                    if let Err(reason) = capability.schema().validate(&call) {
                        tracing::debug!(user = user_id, tool = %call.name, %reason, "Invalid tool arguments");
                        let obs =
                            Observation::err(&call.name, FailureKind::InvalidArguments, reason);
                        conversation.push(Message::tool(obs.as_turn_text(), call.id.clone()));
                        if emit_observation(&events, &obs).await.is_err() {
                            return DispatchOutcome::Cancelled;
                        }
                        state = State::AwaitingModel;
                        continue;
                    }

                    let announce = StreamEvent::ToolCall {
                        content: format!("Calling tool '{}'", call.name),
                        tool: call.name.clone(),
                        arguments: serde_json::to_value(&call.arguments)
                            .unwrap_or(Value::Null),
                    };
                    if send(&events, announce).await.is_err() {
                        return DispatchOutcome::Cancelled;
                    }

                    state = State::AwaitingTool { call, capability };
                }

                State::AwaitingTool { call, capability } => {
                    if let Some(kind) = capability.schema().resource_kind {
                        match self.consume(user_id, kind, &events).await {
                            Ok(true) => {}
                            Ok(false) => {
                                let msg = CoreError::QuotaExceeded { kind }.user_message();
                                return self.finish_quota(&events, msg).await;
                            }
                            Err(outcome) => return outcome,
                        }
                    }

                    tracing::debug!(user = user_id, tool = %call.name, "Executing tool");
                    let obs =
                        shim::invoke(capability, &call, self.config.tool_timeout).await;

                    conversation.push(Message::tool(obs.as_turn_text(), call.id.clone()));
                    if emit_observation(&events, &obs).await.is_err() {
                        return DispatchOutcome::Cancelled;
                    }

                    state = State::AwaitingModel;
                }
            }
        }
    }

    /// Lazily reset, then atomically consume one unit of `kind`.
    /// A ledger storage failure is unrecoverable for this request.
    async fn consume(
        &self,
        user_id: &str,
        kind: ResourceKind,
        events: &mpsc::Sender<StreamEvent>,
    ) -> std::result::Result<bool, DispatchOutcome> {
        if let Err(e) = self.ledger.reset_if_due(user_id).await {
            tracing::error!(user = user_id, error = %e, "Quota reset failed");
        }
        match self.ledger.try_consume(user_id, kind).await {
            Ok(allowed) => Ok(allowed),
            Err(e) => {
                tracing::error!(user = user_id, error = %e, "Quota ledger unavailable");
                let msg = "An unexpected error occurred.".to_string();
                Err(self.finish_error(events, msg).await)
            }
        }
    }

    async fn finish_error(
        &self,
        events: &mpsc::Sender<StreamEvent>,
        content: String,
    ) -> DispatchOutcome {
        if send(events, StreamEvent::Error { content }).await.is_err() {
            return DispatchOutcome::Cancelled;
        }
        DispatchOutcome::Failed
    }

    async fn finish_quota(
        &self,
        events: &mpsc::Sender<StreamEvent>,
        content: String,
    ) -> DispatchOutcome {
        // Quota exhaustion is a normal end of conversation for the
        // client, so it arrives as the terminal `final` frame.
        if send(events, StreamEvent::Final { content }).await.is_err() {
            return DispatchOutcome::Cancelled;
        }
        DispatchOutcome::QuotaExceeded
    }
}

async fn send(
    events: &mpsc::Sender<StreamEvent>,
    event: StreamEvent,
) -> std::result::Result<(), ()> {
    events.send(event).await.map_err(|_| ())
}

async fn emit_observation(
    events: &mpsc::Sender<StreamEvent>,
    obs: &Observation,
) -> std::result::Result<(), ()> {
    let event = match obs {
        Observation::Ok { tool, output, .. } => StreamEvent::ToolResult {
            content: output.clone(),
            tool: tool.clone(),
            ok: true,
        },
        Observation::Err { tool, kind, detail } => StreamEvent::ToolResult {
            content: format!("{}: {}", kind, detail),
            tool: tool.clone(),
            ok: false,
        },
    };
    send(events, event).await
}

/// Parse a tool call from model output. Looks for a fenced ```tool block
/// first, then falls back to a bare JSON object with a "tool" key.
fn parse_tool_call(content: &str) -> Option<ParsedCall> {
    let tool_start = "```tool";
    let tool_end = "```";

    if let Some(start_idx) = content.find(tool_start) {
        let after_marker = &content[start_idx + tool_start.len()..];
        if let Some(end_idx) = after_marker.find(tool_end) {
            let json_str = after_marker[..end_idx].trim();
            if let Ok(mut call) = serde_json::from_str::<WireCall>(json_str) {
                if call.id.is_none() {
                    call.id = Some(uuid::Uuid::new_v4().to_string());
                }
                return Some(ParsedCall {
                    call: call.into(),
                    prose: content[..start_idx].trim().to_string(),
                });
            }
        }
    }

    parse_inline_tool_call(content)
}

fn parse_inline_tool_call(content: &str) -> Option<ParsedCall> {
    if !content.contains(r#""tool""#) {
        return None;
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }

    let mut call = serde_json::from_str::<WireCall>(&content[start..=end]).ok()?;
    if call.id.is_none() {
        call.id = Some(uuid::Uuid::new_v4().to_string());
    }
    Some(ParsedCall {
        call: call.into(),
        prose: content[..start].trim().to_string(),
    })
}

/// Wire shape the model is prompted to produce
#[derive(Deserialize)]
struct WireCall {
    tool: String,
    #[serde(default)]
    arguments: std::collections::HashMap<String, Value>,
    #[serde(default)]
    id: Option<String>,
}

impl From<WireCall> for ToolCall {
    fn from(wire: WireCall) -> Self {
        ToolCall {
            name: wire.tool,
            arguments: wire.arguments,
            id: wire.id,
        }
    }
}
