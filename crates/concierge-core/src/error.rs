//! Error Types

use thiserror::Error;

use crate::quota::ResourceKind;

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Orchestration error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Model provider returned an error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unreachable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Capability not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Arguments rejected before execution
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool body failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Tool exceeded its execution budget
    #[error("Tool timed out after {0}s")]
    ToolTimeout(u64),

    /// A per-user counter is exhausted
    #[error("Quota exhausted for {kind}")]
    QuotaExceeded { kind: ResourceKind },

    /// Iteration ceiling reached without a final answer
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Parse error (e.g. tool call parsing)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Recoverable errors fold back into the conversation as observations;
    /// everything else terminates the dispatch loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::ToolNotFound(_)
                | CoreError::ToolValidation(_)
                | CoreError::ToolExecution(_)
                | CoreError::ToolTimeout(_)
        )
    }

    /// Convert to a message safe to show to the client. Internal detail
    /// (paths, stack traces, upstream error text) stays in the server logs.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Provider(_) | CoreError::ProviderUnavailable(_) => {
                "The language model is currently unavailable. Please try again.".into()
            }
            CoreError::ToolNotFound(name) => format!("The tool '{}' is not available.", name),
            CoreError::ToolValidation(msg) => format!("Invalid tool input: {}", msg),
            CoreError::ToolExecution(_) => "The tool failed to complete.".into(),
            CoreError::ToolTimeout(_) => "The tool took too long to respond.".into(),
            CoreError::QuotaExceeded { kind } => {
                format!("You have used up your {} allowance for this period.", kind)
            }
            CoreError::MaxIterations(_) => {
                "The request could not be completed. Please try a simpler query.".into()
            }
            CoreError::Config(_) => "Service configuration error.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(CoreError::ToolExecution("boom".into()).is_recoverable());
        assert!(CoreError::ToolTimeout(30).is_recoverable());
        assert!(!CoreError::ProviderUnavailable("down".into()).is_recoverable());
        assert!(
            !CoreError::QuotaExceeded {
                kind: ResourceKind::ModelQuery
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_user_message_hides_detail() {
        let err = CoreError::ToolExecution("/etc/secrets/api_key not readable".into());
        assert!(!err.user_message().contains("secrets"));
    }
}
