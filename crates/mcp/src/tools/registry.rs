// Tool trait, registry, schema helpers and the result envelope

use crate::protocol::{CallToolResult, ToolContent, ToolSchema};
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool schema for MCP
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, arguments: Value) -> Result<CallToolResult>;

    fn tier(&self) -> ToolTier {
        ToolTier::ReadOnly
    }
}

/// How much a tool can change outside the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ToolTier {
    ReadOnly,
    /// Creates or modifies files or remote records
    Write,
    /// Deletes data or runs arbitrary commands
    Dangerous,
}

impl ToolTier {
    fn description_suffix(&self) -> Option<&'static str> {
        match self {
            Self::ReadOnly => None,
            Self::Write => Some("[modifies data]"),
            Self::Dangerous => Some("[destructive: confirm with the user first]"),
        }
    }
}

/// Tool registry for managing available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool; a later tool with the same name replaces the earlier one
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        if self.tools.insert(schema.name.clone(), tool).is_some() {
            tracing::warn!(tool = %schema.name, "Tool registered twice, keeping the latest");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All tool schemas sorted by name, tier noted in the description
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|tool| {
                let mut schema = tool.schema();
                if let Some(suffix) = tool.tier().description_suffix() {
                    schema.description = format!("{} {}", schema.description, suffix);
                }
                schema
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
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

/// The JSON envelope every tool returns as its single text content
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Map<String, Value>),
    Failure { error: String, error_type: String },
}

impl ToolOutcome {
    /// Payload fields are merged next to `"success": true`; non-objects go under `result`
    pub fn success(payload: Value) -> Self {
        match payload {
            Value::Object(map) => Self::Success(map),
            Value::Null => Self::Success(Map::new()),
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                Self::Success(map)
            }
        }
    }

    pub fn failure(error: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            error_type: error_type.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Success(map) => {
                let mut body = Map::new();
                body.insert("success".to_string(), Value::Bool(true));
                for (key, value) in map {
                    if key != "success" {
                        body.insert(key.clone(), value.clone());
                    }
                }
                Value::Object(body)
            }
            Self::Failure { error, error_type } => json!({
                "success": false,
                "error": error,
                "error_type": error_type,
            }),
        }
    }
}

impl From<ToolOutcome> for CallToolResult {
    fn from(outcome: ToolOutcome) -> Self {
        let is_error = matches!(outcome, ToolOutcome::Failure { .. });
        let text = serde_json::to_string_pretty(&outcome.to_value())
            .unwrap_or_else(|e| format!("{{\"success\": false, \"error\": \"{}\"}}", e));
        CallToolResult {
            content: vec![ToolContent::text(text)],
            is_error: Some(is_error),
        }
    }
}

pub fn tool_success(payload: Value) -> CallToolResult {
    ToolOutcome::success(payload).into()
}

pub fn tool_failure(error: impl Into<String>, error_type: &str) -> CallToolResult {
    ToolOutcome::failure(error, error_type).into()
}

/// Deserialize tool arguments, turning schema mismatches into a validation failure
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> std::result::Result<T, CallToolResult> {
    let arguments = if arguments.is_null() {
        Value::Object(Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| tool_failure(format!("Invalid arguments: {}", e), "validation"))
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_enum(values: &[&str], description: &str) -> Value {
    json!({
        "type": "string",
        "enum": values,
        "description": description
    })
}

pub fn json_schema_number(description: &str) -> Value {
    json!({
        "type": "number",
        "description": description
    })
}

pub fn json_schema_integer(description: &str) -> Value {
    json!({
        "type": "integer",
        "description": description
    })
}

pub fn json_schema_boolean(description: &str) -> Value {
    json!({
        "type": "boolean",
        "description": description
    })
}

pub fn json_schema_array(items: Value, description: &str) -> Value {
    json!({
        "type": "array",
        "items": items,
        "description": description
    })
}
