//! Text Statistics Tool

use async_trait::async_trait;
use serde_json::json;

use concierge_core::{
    Capability, CapabilitySchema, Observation, ParameterSchema, Result, ToolCall,
};

/// Word, character, and sentence counts for a block of text
pub struct TextStatsTool;

#[async_trait]
impl Capability for TextStatsTool {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema {
            name: "text_stats".into(),
            description: "Count words, characters, and sentences in a piece of text".into(),
            parameters: vec![ParameterSchema::required(
                "text",
                "string",
                "The text to analyze",
            )],
            category: Some("text".into()),
            has_side_effects: false,
            resource_kind: None,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<Observation> {
        let text = call
            .arguments
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let words = text.split_whitespace().count();
        let chars = text.chars().count();
        let sentences = text
            .split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .count();

        Ok(Observation::ok_with_data(
            "text_stats",
            format!(
                "{} words, {} characters, {} sentences",
                words, chars, sentences
            ),
            json!({"words": words, "characters": chars, "sentences": sentences}),
        ))
    }
}
