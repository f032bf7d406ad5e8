//! Capability Contract
//!
//! Every tool exposes a schema (name, description, parameters) and an
//! execute entry point. Descriptors are built once at startup and shared
//! read-only across concurrent requests; a capability that keeps internal
//! mutable state must synchronize it itself.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::quota::ResourceKind;

/// Tool call request parsed from the model output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    pub arguments: HashMap<String, Value>,

    /// Optional call ID for tracking
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: HashMap::new(),
            id: None,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }
}

/// Failure categories a tool invocation can produce.
///
/// All of these are recoverable: the loop folds them back into the
/// conversation and the model gets another turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Arguments rejected against the schema; the tool body never ran
    InvalidArguments,
    /// The tool body returned an error
    ExecutionError,
    /// The tool exceeded its wall-clock budget
    Timeout,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::InvalidArguments => write!(f, "invalid arguments"),
            FailureKind::ExecutionError => write!(f, "execution error"),
            FailureKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// The structured result fed back into the conversation after a tool
/// invocation. Failures are data, never exceptions across the shim
/// boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Observation {
    Ok {
        /// Tool that was called
        tool: String,
        /// Output text
        output: String,
        /// Structured payload (if the tool produced one)
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    Err {
        /// Tool that was called
        tool: String,
        /// Failure category
        kind: FailureKind,
        /// Client-safe detail. Raw tool errors are logged server-side
        /// and never placed here.
        detail: String,
    },
}

impl Observation {
    pub fn ok(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Observation::Ok {
            tool: tool.into(),
            output: output.into(),
            data: None,
        }
    }

    pub fn ok_with_data(tool: impl Into<String>, output: impl Into<String>, data: Value) -> Self {
        Observation::Ok {
            tool: tool.into(),
            output: output.into(),
            data: Some(data),
        }
    }

    pub fn err(tool: impl Into<String>, kind: FailureKind, detail: impl Into<String>) -> Self {
        Observation::Err {
            tool: tool.into(),
            kind,
            detail: detail.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Observation::Ok { .. })
    }

    pub fn tool(&self) -> &str {
        match self {
            Observation::Ok { tool, .. } | Observation::Err { tool, .. } => tool,
        }
    }

    /// Render as a conversation turn for the model
    pub fn as_turn_text(&self) -> String {
        match self {
            Observation::Ok { tool, output, .. } => {
                format!("[Tool '{}' returned]\n{}", tool, output)
            }
            Observation::Err { tool, kind, detail } => {
                format!("[Tool '{}' failed: {}]\n{}", tool, kind, detail)
            }
        }
    }
}

/// Parameter definition for a capability schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON type (string, number, integer, boolean, array, object)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default injected when an optional parameter is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    /// Shorthand for a required parameter with no default or enum
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    /// Shorthand for an optional parameter with a default
    pub fn optional(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
        default: Option<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: false,
            default,
            enum_values: None,
        }
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    fn type_matches(&self, value: &Value) -> bool {
        match self.param_type.as_str() {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.is_i64() || value.is_u64(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            // Unknown declared type: accept anything rather than reject
            _ => true,
        }
    }
}

/// Capability descriptor schema (model-facing)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapabilitySchema {
    /// Unique identifier, stable across restarts
    pub name: String,

    /// Natural-language description shown to the model
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,

    /// Whether the tool has side effects
    #[serde(default)]
    pub has_side_effects: bool,

    /// Quota category one invocation bills against (None = unmetered)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_kind: Option<ResourceKind>,
}

impl CapabilitySchema {
    /// Validate a proposed call against this schema. Checks required
    /// parameters, declared JSON types, and enum membership. Returns the
    /// first violation found.
    pub fn validate(&self, call: &ToolCall) -> std::result::Result<(), String> {
        for param in &self.parameters {
            match call.arguments.get(&param.name) {
                None => {
                    if param.required {
                        return Err(format!("missing required parameter '{}'", param.name));
                    }
                }
                Some(value) => {
                    if !param.type_matches(value) {
                        return Err(format!(
                            "parameter '{}' must be of type {}",
                            param.name, param.param_type
                        ));
                    }
                    if let Some(allowed) = &param.enum_values {
                        if !allowed.contains(value) {
                            return Err(format!(
                                "parameter '{}' must be one of {}",
                                param.name,
                                serde_json::to_string(allowed).unwrap_or_default()
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Fill in declared defaults for absent optional parameters.
    pub fn apply_defaults(&self, call: &mut ToolCall) {
        for param in &self.parameters {
            if let Some(default) = &param.default {
                call.arguments
                    .entry(param.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
    }
}

/// Capability trait - implement to add a new tool
#[async_trait]
pub trait Capability: Send + Sync {
    /// Get the capability's schema
    fn schema(&self) -> CapabilitySchema;

    /// Execute with validated arguments. Well-behaved implementations
    /// return `Observation::Err` for expected failures; an `Err` at the
    /// Result level is caught by the shim and never propagates further.
    async fn execute(&self, call: &ToolCall) -> Result<Observation>;
}
