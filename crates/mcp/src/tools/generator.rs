// Tools for scaffolding and checking dynamic servers

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{
    json_schema_array, json_schema_boolean, json_schema_object, json_schema_string, parse_args,
    tool_failure, tool_success, Tool, ToolTier,
};
use anyhow::Result;
use mcphub_core::generator::{GeneratorSpec, ServerGenerator};
use mcphub_core::manifest::{CommandToolSpec, ServerManifest};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// A tool given either as a full definition or as `name=command args` shorthand
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ToolInput {
    Shorthand(String),
    Full(CommandToolSpec),
}

pub struct GenerateServerTool {
    base_dir: PathBuf,
}

impl GenerateServerTool {
    /// Relative output directories resolve against `base_dir`
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateArgs {
    name: String,
    output_dir: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tools: Vec<ToolInput>,
    #[serde(default)]
    force: bool,
}

#[async_trait::async_trait]
impl Tool for GenerateServerTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "generate_server".to_string(),
            description: "Generate a new MCP server whose tools run local commands".to_string(),
            input_schema: json_schema_object(
                json!({
                    "name": json_schema_string("Server name: lowercase letters, digits, '-' and '_'"),
                    "output_dir": json_schema_string("Directory to write mcphub.toml and README.md into"),
                    "description": json_schema_string("What the server is for"),
                    "tools": json_schema_array(
                        json!({
                            "description": "Either \"name=command args\" or an object with name, description, command, args, parameters, timeout_secs",
                            "anyOf": [
                                {"type": "string"},
                                {"type": "object"}
                            ]
                        }),
                        "Tools of the server; arguments may use {{parameter}} placeholders"
                    ),
                    "force": json_schema_boolean("Overwrite existing files"),
                }),
                vec!["name", "output_dir"],
            ),
        }
    }

    fn tier(&self) -> ToolTier {
        ToolTier::Write
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: GenerateArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(failure) => return Ok(failure),
        };

        let mut spec = GeneratorSpec::new(args.name);
        spec.description = args.description;
        for tool in args.tools {
            let tool = match tool {
                ToolInput::Full(tool) => tool,
                ToolInput::Shorthand(text) => match GeneratorSpec::parse_tool_shorthand(&text) {
                    Ok(tool) => tool,
                    Err(e) => return Ok(tool_failure(format!("{:#}", e), "validation")),
                },
            };
            spec.tools.push(tool);
        }

        let out_dir = Path::new(&args.output_dir);
        let out_dir = if out_dir.is_relative() {
            self.base_dir.join(out_dir)
        } else {
            out_dir.to_path_buf()
        };

        match ServerGenerator::generate(&spec, &out_dir, args.force) {
            Ok(generated) => Ok(tool_success(json!({
                "name": generated.name,
                "directory": generated.directory.display().to_string(),
                "manifest_path": generated.manifest_path.display().to_string(),
                "files": generated.files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>(),
                "tools": spec.tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                "next_step": format!(
                    "mcphub install-manifest {}",
                    generated.manifest_path.display()
                ),
            }))),
            Err(e) => Ok(tool_failure(format!("{:#}", e), "validation")),
        }
    }
}

pub struct ValidateManifestTool;

#[derive(Debug, Deserialize)]
struct ValidateArgs {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[async_trait::async_trait]
impl Tool for ValidateManifestTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "validate_manifest".to_string(),
            description: "Check a server manifest and list the tools it defines".to_string(),
            input_schema: json_schema_object(
                json!({
                    "path": json_schema_string("Path to an mcphub.toml file"),
                    "content": json_schema_string("Manifest TOML, instead of a path"),
                }),
                vec![],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: ValidateArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(failure) => return Ok(failure),
        };

        let manifest = match (args.path, args.content) {
            (Some(path), None) => ServerManifest::load(Path::new(&path)),
            (None, Some(content)) => ServerManifest::from_toml(&content),
            _ => {
                return Ok(tool_failure(
                    "Provide exactly one of `path` or `content`",
                    "validation",
                ))
            }
        };

        match manifest {
            Ok(manifest) => {
                let tools: Vec<Value> = manifest
                    .tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "name": tool.name,
                            "description": tool.description,
                            "command": tool.command,
                            "parameters": tool.placeholders(),
                        })
                    })
                    .collect();
                Ok(tool_success(json!({
                    "valid": true,
                    "name": manifest.server.name,
                    "version": manifest.server.version,
                    "tools": tools,
                })))
            }
            Err(e) => Ok(tool_failure(format!("{:#}", e), "validation")),
        }
    }
}
