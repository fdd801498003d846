// Mermaid diagram extraction and rendering through mermaid-cli

use super::markdown::{is_mermaid, parser};
use super::{DocumentError, DocumentResult};
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Sources of all fenced mermaid blocks, in document order
pub fn extract_mermaid_blocks(markdown: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;

    for event in parser(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) if is_mermaid(&info) => {
                current = Some(String::new());
            }
            Event::Text(text) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(buf) = current.take() {
                    blocks.push(buf);
                }
            }
            _ => {}
        }
    }

    blocks
}

/// Output of rendering one diagram; either image may be absent on failure
#[derive(Debug, Clone)]
pub struct RenderedDiagram {
    pub source: String,
    pub svg: Option<String>,
    pub png: Option<Vec<u8>>,
}

impl RenderedDiagram {
    pub fn failed(source: String) -> Self {
        Self {
            source,
            svg: None,
            png: None,
        }
    }
}

/// Runs `mmdc` on temporary files
pub struct MermaidRenderer {
    command: String,
    timeout: Duration,
}

impl MermaidRenderer {
    pub fn new(command: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub async fn render(&self, source: &str, png: bool) -> DocumentResult<RenderedDiagram> {
        // Removed on drop, including every early return below
        let dir = tempfile::Builder::new().prefix("mcphub-mermaid-").tempdir()?;
        let input = dir.path().join("diagram.mmd");
        let output = dir
            .path()
            .join(if png { "diagram.png" } else { "diagram.svg" });

        tokio::fs::write(&input, source).await?;
        self.run(&input, &output).await?;

        let mut diagram = RenderedDiagram::failed(source.to_string());
        if png {
            diagram.png = Some(tokio::fs::read(&output).await?);
        } else {
            diagram.svg = Some(tokio::fs::read_to_string(&output).await?);
        }
        Ok(diagram)
    }

    async fn run(&self, input: &Path, output: &Path) -> DocumentResult<()> {
        let child = Command::new(&self.command)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("-b")
            .arg("transparent")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.command, e))?;

        let out = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| DocumentError::ToolTimeout {
                tool: self.command.clone(),
                secs: self.timeout.as_secs(),
            })??;

        if !out.status.success() {
            return Err(DocumentError::ExternalTool {
                tool: self.command.clone(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Map a spawn failure to ToolNotFound when the binary is missing
pub(crate) fn spawn_error(tool: &str, error: std::io::Error) -> DocumentError {
    if error.kind() == std::io::ErrorKind::NotFound {
        DocumentError::ToolNotFound {
            tool: tool.to_string(),
        }
    } else {
        DocumentError::Io(error)
    }
}
