//! Clock Tool
//!
//! Returns the current date and time.

use async_trait::async_trait;
use serde_json::json;

use concierge_core::{
    Capability, CapabilitySchema, Observation, ParameterSchema, Result, ToolCall,
};

/// Current date/time in a choice of formats
pub struct ClockTool;

#[async_trait]
impl Capability for ClockTool {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema {
            name: "clock".into(),
            description: "Get the current date and time".into(),
            parameters: vec![ParameterSchema::optional(
                "format",
                "string",
                "Output format: 'iso', 'human', or 'unix'",
                Some(json!("human")),
            )
            .with_enum(vec![json!("iso"), json!("human"), json!("unix")])],
            category: Some("time".into()),
            has_side_effects: false,
            resource_kind: None,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<Observation> {
        let format = call
            .arguments
            .get("format")
            .and_then(|v| v.as_str())
            .unwrap_or("human");

        let now = chrono::Utc::now();

        let output = match format {
            "iso" => now.to_rfc3339(),
            "unix" => now.timestamp().to_string(),
            _ => now.format("%A, %B %d, %Y at %H:%M:%S UTC").to_string(),
        };

        Ok(Observation::ok("clock", output))
    }
}
