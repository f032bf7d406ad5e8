//! Event Stream Formatter
//!
//! Turns dispatch events into the server-sent wire protocol: one
//! `data: <json>\n\n` frame per event. A frame that fails to serialize
//! is replaced by an `error`-typed frame so the stream stays well formed.

use crate::dispatch::StreamEvent;

/// Format one event as a server-sent frame.
pub fn sse_frame(event: &StreamEvent) -> String {
    match serde_json::to_string(event) {
        Ok(json) => format!("data: {}\n\n", json),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize stream event");
            let fallback = StreamEvent::Error {
                content: "Failed to serialize event".into(),
            };
            // A plain error event always serializes.
            let json = serde_json::to_string(&fallback)
                .unwrap_or_else(|_| r#"{"type":"error","content":"serialization failure"}"#.into());
            format!("data: {}\n\n", json)
        }
    }
}

/// MIME type of the event stream response
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_shape() {
        let frame = sse_frame(&StreamEvent::Final {
            content: "done".into(),
        });
        assert!(frame.starts_with("data: "));
        assert!(frame.ends_with("\n\n"));

        let json: serde_json::Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(json["type"], "final");
        assert_eq!(json["content"], "done");
    }

    #[test]
    fn test_tool_call_frame_carries_discriminator() {
        let frame = sse_frame(&StreamEvent::ToolCall {
            content: "Calling tool 'echo'".into(),
            tool: "echo".into(),
            arguments: serde_json::json!({"text": "hi"}),
        });
        let json: serde_json::Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["tool"], "echo");
    }

    #[test]
    fn test_every_event_kind_produces_one_frame() {
        let events = [
            StreamEvent::Thinking {
                content: "hm".into(),
            },
            StreamEvent::ToolCall {
                content: "call".into(),
                tool: "t".into(),
                arguments: serde_json::Value::Null,
            },
            StreamEvent::ToolResult {
                content: "r".into(),
                tool: "t".into(),
                ok: true,
            },
            StreamEvent::Final {
                content: "f".into(),
            },
            StreamEvent::Error {
                content: "e".into(),
            },
        ];
        for event in &events {
            let frame = sse_frame(event);
            assert_eq!(frame.matches("data: ").count(), 1);
            assert_eq!(frame.matches("\n\n").count(), 1);
        }
    }
}
