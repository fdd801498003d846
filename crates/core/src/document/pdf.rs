// HTML to PDF through an external rendering engine

use super::mermaid::spawn_error;
use super::{ConversionOptions, DocumentError, DocumentResult};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Supported HTML-to-PDF engines; each reads HTML on stdin and writes PDF to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfEngine {
    #[default]
    Weasyprint,
    Wkhtmltopdf,
    Pandoc,
}

impl PdfEngine {
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Weasyprint => "weasyprint",
            Self::Wkhtmltopdf => "wkhtmltopdf",
            Self::Pandoc => "pandoc",
        }
    }

    pub(crate) fn args(&self, page_size: &str) -> Vec<String> {
        match self {
            Self::Weasyprint => vec!["-".into(), "-".into()],
            Self::Wkhtmltopdf => vec![
                "--quiet".into(),
                "--page-size".into(),
                page_size.into(),
                "-".into(),
                "-".into(),
            ],
            Self::Pandoc => vec![
                "--from".into(),
                "html".into(),
                "--to".into(),
                "pdf".into(),
                "-V".into(),
                format!("papersize:{}", page_size.to_ascii_lowercase()),
                "--output".into(),
                "-".into(),
            ],
        }
    }
}

impl FromStr for PdfEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weasyprint" => Ok(Self::Weasyprint),
            "wkhtmltopdf" => Ok(Self::Wkhtmltopdf),
            "pandoc" => Ok(Self::Pandoc),
            other => Err(format!("unknown PDF engine: {}", other)),
        }
    }
}

pub(crate) async fn render(html: &str, options: &ConversionOptions) -> DocumentResult<Vec<u8>> {
    let engine = options.pdf_engine;
    let tool = options.pdf_command.as_deref().unwrap_or(engine.binary());
    tracing::debug!(engine = tool, "Rendering PDF");

    let mut child = Command::new(tool)
        .args(engine.args(&options.page_size))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(tool, e))?;

    // Feed stdin while collecting output so an engine that stops reading cannot outlive the timeout
    let stdin = child.stdin.take();
    let write_input = async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(html.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        Ok::<_, std::io::Error>(())
    };
    let run = async move { tokio::join!(write_input, child.wait_with_output()) };

    let timeout = Duration::from_secs(options.tool_timeout_secs);
    let (written, output) = tokio::time::timeout(timeout, run).await.map_err(|_| {
        DocumentError::ToolTimeout {
            tool: tool.to_string(),
            secs: options.tool_timeout_secs,
        }
    })?;
    let output = output?;
    if let Err(e) = written {
        tracing::debug!(engine = tool, error = %e, "Engine closed stdin early");
    }

    if !output.status.success() {
        return Err(DocumentError::ExternalTool {
            tool: tool.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    if !output.stdout.starts_with(b"%PDF") {
        return Err(DocumentError::ExternalTool {
            tool: tool.to_string(),
            stderr: "output is not a PDF document".to_string(),
        });
    }

    Ok(output.stdout)
}
