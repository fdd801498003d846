// Markdown document conversion (PDF, HTML, DOCX, plain text)

mod docx;
mod html;
mod markdown;
mod mermaid;
mod pdf;
mod text;

pub use markdown::{extract_front_matter, first_heading};
pub use mermaid::{extract_mermaid_blocks, MermaidRenderer, RenderedDiagram};
pub use pdf::PdfEngine;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Errors raised by the conversion pipeline
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Document is empty")]
    EmptyDocument,

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("External tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} failed: {stderr}")]
    ExternalTool { tool: String, stderr: String },

    #[error("{tool} timed out after {secs}s")]
    ToolTimeout { tool: String, secs: u64 },

    #[error("DOCX generation failed: {0}")]
    Docx(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    /// Short machine-readable kind used in tool error envelopes
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyDocument => "validation",
            Self::UnsupportedFormat(_) => "validation",
            Self::ToolNotFound { .. } => "tool_not_found",
            Self::ExternalTool { .. } => "external_tool",
            Self::ToolTimeout { .. } => "timeout",
            Self::Docx(_) => "docx",
            Self::Io(_) => "io",
        }
    }
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Target format of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Html,
    Docx,
    Txt,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [Self::Pdf, Self::Html, Self::Docx, Self::Txt];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }

    pub fn mime_type(&self) -> String {
        mime_guess::from_ext(self.extension())
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    /// Text formats can be returned inline, binary ones need encoding
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Pdf | Self::Docx)
    }

    /// Guess the format from a file path extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl FromStr for OutputFormat {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "html" | "htm" => Ok(Self::Html),
            "docx" | "word" => Ok(Self::Docx),
            "txt" | "text" | "plain" => Ok(Self::Txt),
            other => Err(DocumentError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Descriptive metadata carried into the generated document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub created: Option<String>,
}

impl DocumentMetadata {
    /// Fill unset fields from another metadata value
    pub fn merge_missing(&mut self, other: DocumentMetadata) {
        if self.title.is_none() {
            self.title = other.title;
        }
        if self.author.is_none() {
            self.author = other.author;
        }
        if self.subject.is_none() {
            self.subject = other.subject;
        }
        if self.keywords.is_empty() {
            self.keywords = other.keywords;
        }
        if self.created.is_none() {
            self.created = other.created;
        }
    }
}

/// A markdown source with metadata
#[derive(Debug, Clone)]
pub struct Document {
    pub markdown: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a document, picking up any YAML-style front matter as metadata
    pub fn new(markdown: impl Into<String>) -> Self {
        let markdown = markdown.into();
        let metadata = extract_front_matter(&markdown);
        Self { markdown, metadata }
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        let front_matter = std::mem::take(&mut self.metadata);
        self.metadata = metadata;
        self.metadata.merge_missing(front_matter);
        self
    }

    pub fn validate(&self) -> DocumentResult<()> {
        if self.markdown.trim().is_empty() {
            return Err(DocumentError::EmptyDocument);
        }
        Ok(())
    }

    /// Metadata title, else the first level-1 heading, else "Untitled"
    pub fn title(&self) -> String {
        self.metadata
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| first_heading(&self.markdown))
            .unwrap_or_else(|| "Untitled".to_string())
    }
}

/// How fenced `mermaid` blocks are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MermaidMode {
    /// Leave the diagram source as a code block
    Keep,
    /// Emit the source for client-side rendering with mermaid.js (HTML only)
    #[default]
    Script,
    /// Render with mermaid-cli ahead of time
    Render,
}

impl FromStr for MermaidMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "script" => Ok(Self::Script),
            "render" => Ok(Self::Render),
            other => Err(format!("unknown mermaid mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversionOptions {
    pub mermaid: MermaidMode,
    /// Replaces the built-in stylesheet for HTML and PDF output
    pub stylesheet: Option<String>,
    pub pdf_engine: PdfEngine,
    /// Overrides the engine's binary name or path
    pub pdf_command: Option<String>,
    pub mermaid_command: String,
    pub page_size: String,
    pub tool_timeout_secs: u64,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            mermaid: MermaidMode::default(),
            stylesheet: None,
            pdf_engine: PdfEngine::default(),
            pdf_command: None,
            mermaid_command: "mmdc".to_string(),
            page_size: "A4".to_string(),
            tool_timeout_secs: 120,
        }
    }
}

/// Result of a conversion
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub warnings: Vec<String>,
}

impl ConversionOutput {
    fn new(format: OutputFormat, bytes: Vec<u8>, warnings: Vec<String>) -> Self {
        Self {
            format,
            mime_type: format.mime_type(),
            bytes,
            warnings,
        }
    }
}

/// Convert a document into the requested format
pub async fn convert(
    document: &Document,
    format: OutputFormat,
    options: &ConversionOptions,
) -> DocumentResult<ConversionOutput> {
    document.validate()?;

    let mut warnings = Vec::new();

    // Script mode only makes sense where a browser renders the page
    let mode = match (options.mermaid, format) {
        (MermaidMode::Script, OutputFormat::Html) => MermaidMode::Script,
        (MermaidMode::Render, OutputFormat::Txt) => MermaidMode::Keep,
        (MermaidMode::Render, _) => MermaidMode::Render,
        _ => MermaidMode::Keep,
    };

    let diagrams = if mode == MermaidMode::Render {
        let renderer = MermaidRenderer::new(&options.mermaid_command, options.tool_timeout_secs);
        let sources = extract_mermaid_blocks(&document.markdown);
        let want_png = format == OutputFormat::Docx;
        let mut diagrams = Vec::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            match renderer.render(source, want_png).await {
                Ok(diagram) => diagrams.push(diagram),
                Err(e) => {
                    tracing::warn!(diagram = index, error = %e, "Mermaid rendering failed");
                    warnings.push(format!("diagram {}: {}", index + 1, e));
                    diagrams.push(RenderedDiagram::failed(source.clone()));
                }
            }
        }
        diagrams
    } else {
        Vec::new()
    };

    let bytes = match format {
        OutputFormat::Html => html::render(document, options, mode, &diagrams).into_bytes(),
        OutputFormat::Txt => text::render(document).into_bytes(),
        OutputFormat::Docx => docx::render(document, &diagrams)?,
        OutputFormat::Pdf => {
            let page = html::render(document, options, mode, &diagrams);
            pdf::render(&page, options).await?
        }
    };

    tracing::debug!(format = %format, bytes = bytes.len(), "Converted document");
    Ok(ConversionOutput::new(format, bytes, warnings))
}

/// Convert a markdown file on disk, writing the result next to it or at `output`
pub async fn convert_file(
    input: &Path,
    output: Option<&Path>,
    format: Option<OutputFormat>,
    metadata: DocumentMetadata,
    options: &ConversionOptions,
) -> DocumentResult<(PathBuf, ConversionOutput)> {
    let format = format
        .or_else(|| output.and_then(OutputFormat::from_path))
        .ok_or_else(|| DocumentError::UnsupportedFormat("no format given".to_string()))?;

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => input.with_extension(format.extension()),
    };

    let markdown = tokio::fs::read_to_string(input).await?;
    let document = Document::new(markdown).with_metadata(metadata);
    let result = convert(&document, format, options).await?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(&output, &result.bytes).await?;

    tracing::info!(input = %input.display(), output = %output.display(), "Wrote converted document");
    Ok((output, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_parsing() {
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!("htm".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!("word".parse::<OutputFormat>().unwrap(), OutputFormat::Docx);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Txt);
        assert!("rtf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_mime_types() {
        assert_eq!(OutputFormat::Pdf.mime_type(), "application/pdf");
        assert_eq!(OutputFormat::Html.mime_type(), "text/html");
        assert_eq!(OutputFormat::Txt.mime_type(), "text/plain");
        assert!(OutputFormat::Docx.is_binary());
        assert!(!OutputFormat::Html.is_binary());
    }

    #[test]
    fn test_title_fallbacks() {
        let doc = Document::new("Some intro\n\n# Release Notes\n\ntext");
        assert_eq!(doc.title(), "Release Notes");

        let doc = Document::new("no headings here");
        assert_eq!(doc.title(), "Untitled");

        let doc = Document::new("# Heading").with_metadata(DocumentMetadata {
            title: Some("Explicit".to_string()),
            ..Default::default()
        });
        assert_eq!(doc.title(), "Explicit");
    }

    #[test]
    fn test_explicit_metadata_wins_over_front_matter() {
        let doc = Document::new("---\ntitle: From File\nauthor: Ada\n---\n\n# Body").with_metadata(
            DocumentMetadata {
                title: Some("From Args".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(doc.metadata.title.as_deref(), Some("From Args"));
        assert_eq!(doc.metadata.author.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_empty_document_rejected() {
        let doc = Document::new("   \n\n");
        let result = convert(&doc, OutputFormat::Html, &ConversionOptions::default()).await;
        assert!(matches!(result, Err(DocumentError::EmptyDocument)));
    }

    #[tokio::test]
    async fn test_convert_file_infers_format_from_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("notes.md");
        std::fs::write(&input, "# Notes\n\n- one\n- two\n").unwrap();
        let output = temp_dir.path().join("out/notes.txt");

        let (written, result) = convert_file(
            &input,
            Some(&output),
            None,
            DocumentMetadata::default(),
            &ConversionOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(written, output);
        assert_eq!(result.format, OutputFormat::Txt);
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("- one"));
    }

    #[tokio::test]
    async fn test_convert_file_defaults_to_input_stem() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("readme.md");
        std::fs::write(&input, "# Readme").unwrap();

        let (written, _) = convert_file(
            &input,
            None,
            Some(OutputFormat::Html),
            DocumentMetadata::default(),
            &ConversionOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(written, temp_dir.path().join("readme.html"));
        assert!(written.exists());
    }

    #[tokio::test]
    async fn test_render_mode_failure_falls_back_with_warning() {
        let doc = Document::new("# D\n\n```mermaid\ngraph TD; A-->B\n```\n");
        let options = ConversionOptions {
            mermaid: MermaidMode::Render,
            mermaid_command: "mcphub-no-such-mmdc".to_string(),
            ..Default::default()
        };

        let result = convert(&doc, OutputFormat::Html, &options).await.unwrap();
        assert_eq!(result.warnings.len(), 1);
        let html = String::from_utf8(result.bytes).unwrap();
        assert!(html.contains("graph TD"));
    }
}
