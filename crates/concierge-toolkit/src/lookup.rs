//! Web Lookup Tool
//!
//! Queries the DuckDuckGo instant-answer API. Each invocation bills one
//! external lookup against the caller's quota.

use async_trait::async_trait;
use serde::Deserialize;

use concierge_core::{
    Capability, CapabilitySchema, FailureKind, Observation, ParameterSchema, ResourceKind, Result,
    ToolCall,
};

const ENDPOINT: &str = "https://api.duckduckgo.com/";

/// Instant-answer web lookup
pub struct WebLookupTool {
    client: reqwest::Client,
}

impl WebLookupTool {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("concierge/0.1")
            .build()?;
        Ok(Self { client })
    }
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,

    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,

    #[serde(rename = "Answer", default)]
    answer: String,

    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: String,
}

#[async_trait]
impl Capability for WebLookupTool {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema {
            name: "web_lookup".into(),
            description: "Look up a topic on the web and return a short factual summary".into(),
            parameters: vec![ParameterSchema::required(
                "query",
                "string",
                "The topic or question to look up",
            )],
            category: Some("research".into()),
            has_side_effects: false,
            resource_kind: Some(ResourceKind::ExternalLookup),
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<Observation> {
        let query = call
            .arguments
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let response = self
            .client
            .get(ENDPOINT)
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .send()
            .await;

        let answer: InstantAnswer = match response {
            Ok(resp) => match resp.json().await {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(error = %e, "Lookup response was not valid JSON");
                    return Ok(Observation::err(
                        "web_lookup",
                        FailureKind::ExecutionError,
                        "the lookup service returned an unusable response",
                    ));
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Lookup request failed");
                return Ok(Observation::err(
                    "web_lookup",
                    FailureKind::ExecutionError,
                    "the lookup service could not be reached",
                ));
            }
        };

        let summary = render_summary(&answer);
        if summary.is_empty() {
            return Ok(Observation::ok(
                "web_lookup",
                format!("No instant answer found for '{}'.", query),
            ));
        }

        Ok(Observation::ok("web_lookup", summary))
    }
}

fn render_summary(answer: &InstantAnswer) -> String {
    if !answer.answer.is_empty() {
        return answer.answer.clone();
    }
    if !answer.abstract_text.is_empty() {
        let mut summary = answer.abstract_text.clone();
        if !answer.abstract_url.is_empty() {
            summary.push_str(&format!("\nSource: {}", answer.abstract_url));
        }
        return summary;
    }

    // Fall back to the first few related topics
    let topics: Vec<&str> = answer
        .related_topics
        .iter()
        .map(|t| t.text.as_str())
        .filter(|t| !t.is_empty())
        .take(3)
        .collect();
    topics.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prefers_direct_answer() {
        let answer = InstantAnswer {
            abstract_text: "Long abstract".into(),
            abstract_url: String::new(),
            answer: "42".into(),
            related_topics: vec![],
        };
        assert_eq!(render_summary(&answer), "42");
    }

    #[test]
    fn test_render_falls_back_to_topics() {
        let answer = InstantAnswer {
            abstract_text: String::new(),
            abstract_url: String::new(),
            answer: String::new(),
            related_topics: vec![
                RelatedTopic { text: "One".into() },
                RelatedTopic { text: String::new() },
                RelatedTopic { text: "Two".into() },
            ],
        };
        assert_eq!(render_summary(&answer), "One\nTwo");
    }

    #[test]
    fn test_schema_bills_external_lookup() {
        let tool = WebLookupTool::new().unwrap();
        assert_eq!(
            tool.schema().resource_kind,
            Some(ResourceKind::ExternalLookup)
        );
    }
}
