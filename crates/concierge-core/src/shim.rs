//! Tool Invocation Shim
//!
//! Sits between the dispatch loop and a capability: validates arguments
//! against the descriptor schema, runs the body under a wall-clock
//! budget, and normalizes every outcome into an [`Observation`]. Nothing
//! a tool does can propagate as an error past this boundary.

use std::sync::Arc;
use std::time::Duration;

use crate::capability::{Capability, FailureKind, Observation, ToolCall};

/// Execute a capability call with validation and a bounded timeout.
///
/// On timeout the call is abandoned: side effects already in flight are
/// not rolled back, so tools are expected to be idempotent or safely
/// retryable. Raw failure detail from the tool body is logged server-side
/// only; the observation carries a generic description.
pub async fn invoke(
    capability: Arc<dyn Capability>,
    call: &ToolCall,
    timeout: Duration,
) -> Observation {
    let schema = capability.schema();

    if let Err(reason) = schema.validate(call) {
        tracing::debug!(tool = %call.name, %reason, "Rejected tool call arguments");
        return Observation::err(&call.name, FailureKind::InvalidArguments, reason);
    }

    let mut call = call.clone();
    schema.apply_defaults(&mut call);

    match tokio::time::timeout(timeout, capability.execute(&call)).await {
        Ok(Ok(observation)) => observation,
        Ok(Err(e)) => {
            tracing::error!(tool = %call.name, error = %e, "Tool execution failed");
            Observation::err(
                &call.name,
                FailureKind::ExecutionError,
                "the tool failed to complete",
            )
        }
        Err(_) => {
            tracing::warn!(tool = %call.name, timeout_secs = timeout.as_secs(), "Tool timed out");
            Observation::err(
                &call.name,
                FailureKind::Timeout,
                format!("no result within {}s", timeout.as_secs()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilitySchema, ParameterSchema};
    use crate::error::{CoreError, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct EchoTool {
        executed: AtomicBool,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                executed: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Capability for EchoTool {
        fn schema(&self) -> CapabilitySchema {
            CapabilitySchema {
                name: "echo".into(),
                description: "Echo input".into(),
                parameters: vec![
                    ParameterSchema::required("text", "string", "Text to echo"),
                    ParameterSchema::optional("prefix", "string", "Prefix", Some(json!(">"))),
                ],
                category: None,
                has_side_effects: false,
                resource_kind: None,
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<Observation> {
            self.executed.store(true, Ordering::SeqCst);
            let text = call.arguments.get("text").and_then(|v| v.as_str()).unwrap_or("");
            let prefix = call.arguments.get("prefix").and_then(|v| v.as_str()).unwrap_or("");
            Ok(Observation::ok("echo", format!("{}{}", prefix, text)))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Capability for FailingTool {
        fn schema(&self) -> CapabilitySchema {
            CapabilitySchema {
                name: "flaky".into(),
                description: "Always fails".into(),
                parameters: vec![],
                category: None,
                has_side_effects: false,
                resource_kind: None,
            }
        }

        async fn execute(&self, _call: &ToolCall) -> Result<Observation> {
            Err(CoreError::Other(
                "panic at /internal/secret/path.rs:42".into(),
            ))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Capability for SlowTool {
        fn schema(&self) -> CapabilitySchema {
            CapabilitySchema {
                name: "slow".into(),
                description: "Sleeps".into(),
                parameters: vec![],
                category: None,
                has_side_effects: false,
                resource_kind: None,
            }
        }

        async fn execute(&self, _call: &ToolCall) -> Result<Observation> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Observation::ok("slow", "done"))
        }
    }

    #[tokio::test]
    async fn test_invalid_arguments_skip_execution() {
        let tool = Arc::new(EchoTool::new());
        let call = ToolCall::new("echo"); // missing required "text"

        let obs = invoke(tool.clone(), &call, Duration::from_secs(5)).await;

        match obs {
            Observation::Err { kind, .. } => assert_eq!(kind, FailureKind::InvalidArguments),
            Observation::Ok { .. } => panic!("expected validation failure"),
        }
        assert!(!tool.executed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_defaults_injected_before_execution() {
        let tool = Arc::new(EchoTool::new());
        let call = ToolCall::new("echo").with_arg("text", json!("hi"));

        let obs = invoke(tool, &call, Duration::from_secs(5)).await;

        match obs {
            Observation::Ok { output, .. } => assert_eq!(output, ">hi"),
            Observation::Err { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_execution_error_detail_is_contained() {
        let tool = Arc::new(FailingTool);
        let call = ToolCall::new("flaky");

        let obs = invoke(tool, &call, Duration::from_secs(5)).await;

        match obs {
            Observation::Err { kind, detail, .. } => {
                assert_eq!(kind, FailureKind::ExecutionError);
                assert!(!detail.contains("secret"));
                assert!(!detail.contains("path.rs"));
            }
            Observation::Ok { .. } => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_timeout_abandons_call() {
        let tool = Arc::new(SlowTool);
        let call = ToolCall::new("slow");

        let obs = invoke(tool, &call, Duration::from_millis(20)).await;

        match obs {
            Observation::Err { kind, .. } => assert_eq!(kind, FailureKind::Timeout),
            Observation::Ok { .. } => panic!("expected timeout"),
        }
    }
}
