// Markdown conversion tools

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{
    json_schema_array, json_schema_enum, json_schema_object, json_schema_string, parse_args,
    tool_failure, tool_success, Tool, ToolTier,
};
use anyhow::Result;
use base64::Engine;
use mcphub_core::document::{
    convert, ConversionOptions, Document, DocumentError, DocumentMetadata, MermaidMode,
    OutputFormat,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

fn document_failure(error: DocumentError) -> CallToolResult {
    tool_failure(error.to_string(), error.kind())
}

#[derive(Debug, Default, Deserialize)]
struct MetadataArgs {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

impl MetadataArgs {
    fn into_metadata(self) -> DocumentMetadata {
        DocumentMetadata {
            title: self.title,
            author: self.author,
            subject: self.subject,
            keywords: self.keywords,
            created: None,
        }
    }
}

fn metadata_properties() -> Value {
    json!({
        "title": json_schema_string("Document title (defaults to front matter or first heading)"),
        "author": json_schema_string("Document author"),
        "subject": json_schema_string("Document subject or description"),
        "keywords": json_schema_array(json_schema_string("Keyword"), "Document keywords"),
    })
}

fn parse_mermaid(
    mode: Option<&str>,
    default: MermaidMode,
) -> std::result::Result<MermaidMode, CallToolResult> {
    match mode {
        None => Ok(default),
        Some(mode) => mode
            .parse::<MermaidMode>()
            .map_err(|e| tool_failure(e, "validation")),
    }
}

/// Converts markdown text or a markdown file into PDF, HTML, DOCX or plain text
pub struct ConvertMarkdownTool {
    options: ConversionOptions,
    output_dir: Option<PathBuf>,
}

impl ConvertMarkdownTool {
    pub fn new(options: ConversionOptions, output_dir: Option<PathBuf>) -> Self {
        Self {
            options,
            output_dir,
        }
    }

    fn resolve_output(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.output_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConvertArgs {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    input_path: Option<String>,
    format: String,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default)]
    mermaid: Option<String>,
    #[serde(flatten)]
    metadata: MetadataArgs,
}

#[async_trait::async_trait]
impl Tool for ConvertMarkdownTool {
    fn schema(&self) -> ToolSchema {
        let mut properties = metadata_properties();
        let extra = json!({
            "markdown": json_schema_string("Markdown source (or use input_path)"),
            "input_path": json_schema_string("Path to a markdown file (or use markdown)"),
            "format": json_schema_enum(&["pdf", "html", "docx", "txt"], "Output format"),
            "output_path": json_schema_string(
                "Where to write the result. Without it, text formats are returned inline and binary formats as base64"
            ),
            "mermaid": json_schema_enum(&["keep", "script", "render"], "How to handle mermaid diagrams"),
        });
        if let (Some(target), Some(source)) = (properties.as_object_mut(), extra.as_object()) {
            target.extend(source.clone());
        }

        ToolSchema {
            name: "convert_markdown".to_string(),
            description: "Convert Markdown to PDF, HTML, DOCX or plain text".to_string(),
            input_schema: json_schema_object(properties, vec!["format"]),
        }
    }

    fn tier(&self) -> ToolTier {
        ToolTier::Write
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: ConvertArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(failure) => return Ok(failure),
        };

        let format: OutputFormat = match args.format.parse() {
            Ok(format) => format,
            Err(e) => return Ok(document_failure(e)),
        };

        let markdown = match (args.markdown, args.input_path) {
            (Some(markdown), None) => markdown,
            (None, Some(path)) => match tokio::fs::read_to_string(&path).await {
                Ok(markdown) => markdown,
                Err(e) => {
                    return Ok(tool_failure(
                        format!("Cannot read {}: {}", path, e),
                        "io",
                    ))
                }
            },
            _ => {
                return Ok(tool_failure(
                    "Provide exactly one of `markdown` or `input_path`",
                    "validation",
                ))
            }
        };

        let mut options = self.options.clone();
        options.mermaid = match parse_mermaid(args.mermaid.as_deref(), options.mermaid) {
            Ok(mode) => mode,
            Err(failure) => return Ok(failure),
        };

        let document = Document::new(markdown).with_metadata(args.metadata.into_metadata());
        let output = match convert(&document, format, &options).await {
            Ok(output) => output,
            Err(e) => return Ok(document_failure(e)),
        };

        let mut payload = json!({
            "format": output.format.to_string(),
            "mime_type": output.mime_type,
            "bytes": output.bytes.len(),
            "title": document.title(),
            "warnings": output.warnings,
        });

        match args.output_path {
            Some(path) => {
                let path = self.resolve_output(&path);
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, &output.bytes).await?;
                payload["output_path"] = json!(path.display().to_string());
            }
            None if format.is_binary() => {
                payload["content_base64"] =
                    json!(base64::engine::general_purpose::STANDARD.encode(&output.bytes));
            }
            None => {
                payload["content"] = json!(String::from_utf8_lossy(&output.bytes));
            }
        }

        Ok(tool_success(payload))
    }
}

/// Renders markdown to a standalone HTML page and returns it inline
pub struct MarkdownToHtmlTool {
    options: ConversionOptions,
}

impl MarkdownToHtmlTool {
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }
}

#[derive(Debug, Deserialize)]
struct HtmlArgs {
    markdown: String,
    #[serde(default)]
    mermaid: Option<String>,
    #[serde(flatten)]
    metadata: MetadataArgs,
}

#[async_trait::async_trait]
impl Tool for MarkdownToHtmlTool {
    fn schema(&self) -> ToolSchema {
        let mut properties = metadata_properties();
        if let Some(map) = properties.as_object_mut() {
            map.insert("markdown".into(), json_schema_string("Markdown source"));
            map.insert(
                "mermaid".into(),
                json_schema_enum(&["keep", "script", "render"], "How to handle mermaid diagrams"),
            );
        }
        ToolSchema {
            name: "markdown_to_html".to_string(),
            description: "Render Markdown to a standalone HTML page".to_string(),
            input_schema: json_schema_object(properties, vec!["markdown"]),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: HtmlArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(failure) => return Ok(failure),
        };
        let mut options = self.options.clone();
        options.mermaid = match parse_mermaid(args.mermaid.as_deref(), options.mermaid) {
            Ok(mode) => mode,
            Err(failure) => return Ok(failure),
        };

        let document = Document::new(args.markdown).with_metadata(args.metadata.into_metadata());
        match convert(&document, OutputFormat::Html, &options).await {
            Ok(output) => Ok(tool_success(json!({
                "title": document.title(),
                "html": String::from_utf8_lossy(&output.bytes),
                "warnings": output.warnings,
            }))),
            Err(e) => Ok(document_failure(e)),
        }
    }
}

/// Lists output formats and what each needs on the host
pub struct ListFormatsTool {
    options: ConversionOptions,
}

impl ListFormatsTool {
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }
}

#[async_trait::async_trait]
impl Tool for ListFormatsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_formats".to_string(),
            description: "List supported output formats".to_string(),
            input_schema: json_schema_object(json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        let pdf_tool = self
            .options
            .pdf_command
            .clone()
            .unwrap_or_else(|| self.options.pdf_engine.binary().to_string());

        let formats: Vec<Value> = OutputFormat::ALL
            .iter()
            .map(|format| {
                let requires = match format {
                    OutputFormat::Pdf => Some(pdf_tool.clone()),
                    _ => None,
                };
                json!({
                    "format": format.to_string(),
                    "extension": format.extension(),
                    "mime_type": format.mime_type(),
                    "binary": format.is_binary(),
                    "requires": requires,
                })
            })
            .collect();

        Ok(tool_success(json!({
            "formats": formats,
            "mermaid_modes": ["keep", "script", "render"],
            "mermaid_renderer": self.options.mermaid_command,
        })))
    }
}
