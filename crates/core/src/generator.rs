// Scaffolds a new dynamic MCP server (manifest + README) on disk

use crate::manifest::{
    is_valid_name, CommandToolSpec, ManifestServer, ServerManifest, MANIFEST_FILE,
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What to generate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tools: Vec<CommandToolSpec>,
}

impl GeneratorSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tools: Vec::new(),
        }
    }

    /// Parse a `name=command arg1 arg2` shorthand into a tool without parameters
    pub fn parse_tool_shorthand(spec: &str) -> Result<CommandToolSpec> {
        let (name, command_line) = spec
            .split_once('=')
            .context("Tool spec must look like name=command [args...]")?;
        let mut parts = command_line.split_whitespace();
        let command = parts
            .next()
            .context("Tool spec is missing a command")?
            .to_string();

        Ok(CommandToolSpec {
            name: name.trim().to_string(),
            description: format!("Run `{}`", command_line.trim()),
            command,
            args: parts.map(str::to_string).collect(),
            parameters: Vec::new(),
            timeout_secs: 30,
            working_dir: None,
        })
    }

    pub fn to_manifest(&self) -> ServerManifest {
        ServerManifest {
            server: ManifestServer {
                name: self.name.clone(),
                version: "0.1.0".to_string(),
                description: self.description.clone(),
            },
            tools: self.tools.clone(),
        }
    }
}

/// Files written by a generation run
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedServer {
    pub name: String,
    pub directory: PathBuf,
    pub manifest_path: PathBuf,
    pub files: Vec<PathBuf>,
}

pub struct ServerGenerator;

impl ServerGenerator {
    /// Write the manifest and README into `out_dir`
    pub fn generate(spec: &GeneratorSpec, out_dir: &Path, force: bool) -> Result<GeneratedServer> {
        if !is_valid_name(&spec.name) {
            bail!(
                "Invalid server name '{}': use lowercase letters, digits, '-' and '_'",
                spec.name
            );
        }

        let manifest = spec.to_manifest();
        manifest.validate()?;

        let manifest_path = out_dir.join(MANIFEST_FILE);
        let readme_path = out_dir.join("README.md");
        if !force {
            for path in [&manifest_path, &readme_path] {
                if path.exists() {
                    bail!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
            }
        }

        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
        manifest.save(&manifest_path)?;
        std::fs::write(&readme_path, Self::readme(&manifest))
            .context("Failed to write README.md")?;

        tracing::info!(
            server = %spec.name,
            tools = spec.tools.len(),
            dir = %out_dir.display(),
            "Generated server"
        );

        Ok(GeneratedServer {
            name: spec.name.clone(),
            directory: out_dir.to_path_buf(),
            manifest_path: manifest_path.clone(),
            files: vec![manifest_path, readme_path],
        })
    }

    /// README describing the server and how to run it
    pub fn readme(manifest: &ServerManifest) -> String {
        let tools = if manifest.tools.is_empty() {
            "_No tools yet. Add `[[tools]]` entries to `mcphub.toml`._".to_string()
        } else {
            manifest
                .tools
                .iter()
                .map(|tool| {
                    let params = if tool.parameters.is_empty() {
                        String::new()
                    } else {
                        let list = tool
                            .parameters
                            .iter()
                            .map(|p| {
                                format!(
                                    "  - `{}` ({}{}): {}",
                                    p.name,
                                    p.param_type.json_type(),
                                    if p.required { ", required" } else { "" },
                                    p.description
                                )
                            })
                            .collect::<Vec<_>>()
                            .join("\n");
                        format!("\n{}", list)
                    };
                    format!(
                        "- **{}**: {} (`{} {}`){}",
                        tool.name,
                        tool.description,
                        tool.command,
                        tool.args.join(" "),
                        params
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            r#"# {name}

{description}

## Tools

{tools}

## Running

```sh
mcphub-mcp dynamic --manifest {manifest}
```

## Installing

```sh
mcphub install-manifest {manifest}
mcphub sync
```
"#,
            name = manifest.server.name,
            description = if manifest.server.description.is_empty() {
                "A command-backed MCP server."
            } else {
                manifest.server.description.as_str()
            },
            tools = tools,
            manifest = MANIFEST_FILE,
        )
    }
}
