// Command-backed tools declared in a server manifest

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{tool_failure, tool_success, Tool, ToolTier};
use anyhow::{Context, Result};
use mcphub_core::manifest::{CommandToolSpec, ServerManifest};
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Output beyond this many bytes per stream is cut off
pub const MAX_OUTPUT_BYTES: usize = 100_000;

pub struct CommandTool {
    spec: CommandToolSpec,
}

impl CommandTool {
    pub fn new(spec: CommandToolSpec) -> Self {
        Self { spec }
    }
}

/// One tool per manifest entry
pub fn manifest_tools(manifest: &ServerManifest) -> Vec<Arc<dyn Tool>> {
    manifest
        .tools
        .iter()
        .cloned()
        .map(|spec| Arc::new(CommandTool::new(spec)) as Arc<dyn Tool>)
        .collect()
}

fn truncate(bytes: &[u8]) -> (String, bool) {
    if bytes.len() <= MAX_OUTPUT_BYTES {
        return (String::from_utf8_lossy(bytes).into_owned(), false);
    }
    (
        String::from_utf8_lossy(&bytes[..MAX_OUTPUT_BYTES]).into_owned(),
        true,
    )
}

#[async_trait::async_trait]
impl Tool for CommandTool {
    fn schema(&self) -> ToolSchema {
        let description = if self.spec.description.is_empty() {
            format!("Run `{}`", self.spec.command)
        } else {
            self.spec.description.clone()
        };
        ToolSchema {
            name: self.spec.name.clone(),
            description,
            input_schema: self.spec.input_schema(),
        }
    }

    fn tier(&self) -> ToolTier {
        ToolTier::Dangerous
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let resolved = match self.spec.instantiate(&arguments) {
            Ok(resolved) => resolved,
            Err(e) => return Ok(tool_failure(format!("{:#}", e), "validation")),
        };

        let mut command = Command::new(&resolved.program);
        command
            .args(&resolved.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &resolved.working_dir {
            command.current_dir(dir);
        }

        tracing::debug!(tool = %self.spec.name, program = %resolved.program, "Spawning command");
        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(tool_failure(
                    format!("Command not found: {}", resolved.program),
                    "tool_not_found",
                ))
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to spawn {}", resolved.program))
            }
        };

        let timeout = Duration::from_secs(resolved.timeout_secs);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output.context("Failed to wait for command")?,
            Err(_) => {
                return Ok(tool_failure(
                    format!(
                        "{} timed out after {} seconds",
                        self.spec.name, resolved.timeout_secs
                    ),
                    "timeout",
                ))
            }
        };

        let (stdout, stdout_truncated) = truncate(&output.stdout);
        let (stderr, stderr_truncated) = truncate(&output.stderr);
        let exit_code = output.status.code();

        if !output.status.success() {
            return Ok(tool_failure(
                format!(
                    "{} exited with status {}: {}",
                    self.spec.name,
                    exit_code.map_or_else(|| "unknown".to_string(), |c| c.to_string()),
                    stderr.trim()
                ),
                "command_failed",
            ));
        }

        Ok(tool_success(json!({
            "exit_code": exit_code,
            "stdout": stdout,
            "stderr": stderr,
            "truncated": stdout_truncated || stderr_truncated,
        })))
    }
}
