//! Tool trait: the abstraction over the agent's lookups.
//!
//! Tools are what let the agent gather evidence: semantic literature search
//! and structured potency lookups. Each tool declares a JSON Schema for its
//! arguments; the registry validates arguments against it before dispatch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::error::ToolError;
use crate::evidence::{EvidenceChunk, StructuredFact};
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The typed result of a successful tool execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolOutput {
    /// One-line, human-readable summary for the trace.
    pub summary: String,

    /// Literature evidence produced by the call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<EvidenceChunk>,

    /// Structured evidence produced by the call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facts: Vec<StructuredFact>,
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "retrieve_context").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with already-validated arguments.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolOutput, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the model
/// 2. Validate and execute tools when the model requests them
///
/// Backed by a `BTreeMap` so definitions are listed in a stable order.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Validate arguments against the tool's schema, then execute.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolOutput, ToolError> {
        let tool = self.tools.get(&call.name).ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        validate_arguments(&call.name, &tool.parameters_schema(), &call.arguments)?;
        tool.execute(call.arguments.clone()).await
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check `arguments` against the subset of JSON Schema the tools declare:
/// an object whose `required` keys are present and whose `string`
/// properties hold non-blank strings.
pub fn validate_arguments(
    tool_name: &str,
    schema: &serde_json::Value,
    arguments: &serde_json::Value,
) -> std::result::Result<(), ToolError> {
    let invalid = |reason: String| ToolError::InvalidArguments {
        tool_name: tool_name.to_string(),
        reason,
    };

    let args = arguments
        .as_object()
        .ok_or_else(|| invalid("arguments must be a JSON object".into()))?;

    if let Some(required) = schema["required"].as_array() {
        for key in required.iter().filter_map(|k| k.as_str()) {
            if !args.contains_key(key) {
                return Err(invalid(format!("missing required argument '{key}'")));
            }
        }
    }

    if let Some(properties) = schema["properties"].as_object() {
        for (key, spec) in properties {
            let Some(value) = args.get(key) else { continue };
            match spec["type"].as_str() {
                Some("string") => match value.as_str() {
                    Some(s) if !s.trim().is_empty() => {}
                    Some(_) => return Err(invalid(format!("'{key}' must not be empty"))),
                    None => return Err(invalid(format!("'{key}' must be a string"))),
                },
                Some("integer") if value.as_i64().is_none() => {
                    return Err(invalid(format!("'{key}' must be an integer")));
                }
                _ => {}
            }
        }
    }

    Ok(())
}
