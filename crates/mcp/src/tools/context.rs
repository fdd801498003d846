// World context tools: time, system, environment and weather

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{
    json_schema_array, json_schema_object, json_schema_string, parse_args, tool_failure,
    tool_success, Tool,
};
use anyhow::Result;
use mcphub_core::context::{ContextProvider, TimeProvider, WorldContext};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct GetWorldContextTool {
    context: Arc<WorldContext>,
}

impl GetWorldContextTool {
    pub fn new(context: Arc<WorldContext>) -> Self {
        Self { context }
    }
}

#[derive(Debug, Deserialize)]
struct WorldContextArgs {
    #[serde(default)]
    sections: Vec<String>,
}

#[async_trait::async_trait]
impl Tool for GetWorldContextTool {
    fn schema(&self) -> ToolSchema {
        let available = self.context.sections().join(", ");
        ToolSchema {
            name: "get_world_context".to_string(),
            description: format!(
                "Snapshot of the current environment. Sections: {}. Omit `sections` for all.",
                available
            ),
            input_schema: json_schema_object(
                json!({
                    "sections": json_schema_array(
                        json_schema_string("Section name"),
                        "Sections to include"
                    )
                }),
                vec![],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: WorldContextArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(failure) => return Ok(failure),
        };
        let context = self.context.collect(&args.sections).await;
        Ok(tool_success(json!({ "context": context })))
    }
}

pub struct GetCurrentTimeTool;

#[async_trait::async_trait]
impl Tool for GetCurrentTimeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_current_time".to_string(),
            description: "Current date and time in UTC and the server's local timezone"
                .to_string(),
            input_schema: json_schema_object(json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        match TimeProvider.collect().await {
            Ok(time) => Ok(tool_success(time)),
            Err(e) => Ok(tool_failure(format!("{:#}", e), "internal")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcphub_core::context::EnvironmentProvider;

    fn body(result: &CallToolResult) -> Value {
        serde_json::from_str(result.text().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_world_context_sections() {
        let context = Arc::new(
            WorldContext::new()
                .with_provider(TimeProvider)
                .with_provider(EnvironmentProvider),
        );
        let tool = GetWorldContextTool::new(context);
        assert!(tool.schema().description.contains("time, environment"));

        let result = tool.execute(json!({"sections": ["time"]})).await.unwrap();
        let body = body(&result);
        assert_eq!(body["success"], true);
        assert!(body["context"]["time"]["unix"].is_i64());
        assert!(body["context"].get("environment").is_none());
    }

    #[tokio::test]
    async fn test_world_context_rejects_bad_arguments() {
        let tool = GetWorldContextTool::new(Arc::new(WorldContext::new()));
        let result = tool.execute(json!({"sections": "time"})).await.unwrap();
        assert!(result.is_error());
        assert_eq!(body(&result)["error_type"], "validation");
    }

    #[tokio::test]
    async fn test_current_time() {
        let result = GetCurrentTimeTool.execute(json!({})).await.unwrap();
        let body = body(&result);
        assert_eq!(body["success"], true);
        assert!(body["utc"].as_str().is_some());
        assert!(body["weekday"].as_str().is_some());
    }
}
