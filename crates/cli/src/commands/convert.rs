// One-off markdown conversion without an MCP client

use anyhow::{Context, Result};
use mcphub_core::document::{
    convert_file, ConversionOptions, DocumentMetadata, MermaidMode, OutputFormat, PdfEngine,
};
use std::path::{Path, PathBuf};

pub struct ConvertOptions {
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub mermaid: Option<MermaidMode>,
    pub pdf_engine: Option<PdfEngine>,
}

pub async fn convert(input: &Path, options: ConvertOptions) -> Result<PathBuf> {
    let metadata = DocumentMetadata {
        title: options.title,
        author: options.author,
        ..Default::default()
    };

    let mut conversion = ConversionOptions::default();
    if let Some(mode) = options.mermaid {
        conversion.mermaid = mode;
    }
    if let Some(engine) = options.pdf_engine {
        conversion.pdf_engine = engine;
    }

    // Without --format or an output extension, default to HTML
    let format = options.format.or_else(|| {
        if options.output.as_deref().and_then(OutputFormat::from_path).is_some() {
            None
        } else {
            Some(OutputFormat::Html)
        }
    });

    let (path, output) = convert_file(
        input,
        options.output.as_deref(),
        format,
        metadata,
        &conversion,
    )
    .await
    .with_context(|| format!("Failed to convert {}", input.display()))?;

    for warning in &output.warnings {
        tracing::warn!("{}", warning);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options() -> ConvertOptions {
        ConvertOptions {
            format: None,
            output: None,
            title: None,
            author: None,
            mermaid: None,
            pdf_engine: None,
        }
    }

    #[tokio::test]
    async fn test_defaults_to_html_next_to_input() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("notes.md");
        std::fs::write(&input, "# Notes\n\nBody").unwrap();

        let path = convert(&input, options()).await.unwrap();
        assert_eq!(path, temp_dir.path().join("notes.html"));
        assert!(std::fs::read_to_string(path).unwrap().contains("<h1>Notes</h1>"));
    }

    #[tokio::test]
    async fn test_format_from_output_extension() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("notes.md");
        std::fs::write(&input, "# Notes\n\n- one\n- two").unwrap();

        let path = convert(
            &input,
            ConvertOptions {
                output: Some(temp_dir.path().join("out").join("notes.txt")),
                title: Some("Ignored for text".to_string()),
                ..options()
            },
        )
        .await
        .unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("- one"));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let err = convert(&temp_dir.path().join("missing.md"), options())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing.md"));
    }
}
