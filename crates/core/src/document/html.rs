// Markdown to standalone HTML

use super::markdown::{is_mermaid, parser};
use super::mermaid::RenderedDiagram;
use super::{ConversionOptions, Document, MermaidMode};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Tag, TagEnd};

const DEFAULT_STYLESHEET: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; line-height: 1.6; color: #24292f; max-width: 50em; margin: 2em auto; padding: 0 1em; }
h1, h2, h3, h4, h5, h6 { line-height: 1.25; margin-top: 1.5em; margin-bottom: 0.5em; }
h1 { border-bottom: 1px solid #d0d7de; padding-bottom: 0.3em; }
code { font-family: "SFMono-Regular", Consolas, "Liberation Mono", monospace; background: #f6f8fa; padding: 0.1em 0.3em; border-radius: 4px; }
pre { background: #f6f8fa; padding: 1em; overflow-x: auto; border-radius: 6px; }
pre code { background: none; padding: 0; }
blockquote { color: #57606a; border-left: 0.25em solid #d0d7de; margin: 0; padding: 0 1em; }
table { border-collapse: collapse; margin: 1em 0; }
th, td { border: 1px solid #d0d7de; padding: 0.4em 0.8em; }
th { background: #f6f8fa; }
img, svg { max-width: 100%; }
.mermaid-diagram { text-align: center; margin: 1em 0; }
"#;

const MERMAID_LOADER: &str = r#"<script type="module">
import mermaid from "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.esm.min.mjs";
mermaid.initialize({ startOnLoad: true });
</script>"#;

/// Render a full HTML5 page
pub(crate) fn render(
    document: &Document,
    options: &ConversionOptions,
    mode: MermaidMode,
    diagrams: &[RenderedDiagram],
) -> String {
    let body = render_body(&document.markdown, mode, diagrams);
    let meta = &document.metadata;

    let mut head = String::new();
    head.push_str("<meta charset=\"utf-8\">\n");
    head.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    head.push_str(&format!("<title>{}</title>\n", escape(&document.title())));
    if let Some(author) = &meta.author {
        head.push_str(&format!("<meta name=\"author\" content=\"{}\">\n", escape(author)));
    }
    if let Some(subject) = &meta.subject {
        head.push_str(&format!(
            "<meta name=\"description\" content=\"{}\">\n",
            escape(subject)
        ));
    }
    if !meta.keywords.is_empty() {
        head.push_str(&format!(
            "<meta name=\"keywords\" content=\"{}\">\n",
            escape(&meta.keywords.join(", "))
        ));
    }

    let stylesheet = options.stylesheet.as_deref().unwrap_or(DEFAULT_STYLESHEET);
    head.push_str(&format!(
        "<style>\n@page {{ size: {}; margin: 2cm; }}\n{}\n</style>\n",
        options.page_size, stylesheet
    ));

    let loader = if mode == MermaidMode::Script && body.contains("class=\"mermaid\"") {
        MERMAID_LOADER
    } else {
        ""
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n{}</head>\n<body>\n{}{}</body>\n</html>\n",
        head, body, loader
    )
}

/// Render the markdown body, substituting mermaid blocks according to `mode`
pub(crate) fn render_body(markdown: &str, mode: MermaidMode, diagrams: &[RenderedDiagram]) -> String {
    let mut events: Vec<Event<'_>> = Vec::new();
    let mut mermaid_source: Option<String> = None;
    let mut diagram_index = 0;
    let mut in_metadata = false;

    for event in parser(markdown) {
        match event {
            Event::Start(Tag::MetadataBlock(_)) => in_metadata = true,
            Event::End(TagEnd::MetadataBlock(_)) => in_metadata = false,
            _ if in_metadata => {}
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info)))
                if mode != MermaidMode::Keep && is_mermaid(info) =>
            {
                mermaid_source = Some(String::new());
            }
            Event::Text(ref text) if mermaid_source.is_some() => {
                if let Some(buf) = mermaid_source.as_mut() {
                    buf.push_str(text);
                }
            }
            Event::End(TagEnd::CodeBlock) if mermaid_source.is_some() => {
                let source = mermaid_source.take().unwrap_or_default();
                let fragment = match mode {
                    MermaidMode::Script => {
                        format!("<pre class=\"mermaid\">\n{}</pre>\n", escape(&source))
                    }
                    _ => {
                        let rendered = diagrams.get(diagram_index).and_then(|d| d.svg.clone());
                        diagram_index += 1;
                        match rendered {
                            Some(svg) => format!("<div class=\"mermaid-diagram\">\n{}\n</div>\n", svg),
                            None => format!(
                                "<pre><code class=\"language-mermaid\">{}</code></pre>\n",
                                escape(&source)
                            ),
                        }
                    }
                };
                events.push(Event::Html(CowStr::from(fragment)));
            }
            other => events.push(other),
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentMetadata;

    fn page(markdown: &str, mode: MermaidMode) -> String {
        render(
            &Document::new(markdown),
            &ConversionOptions::default(),
            mode,
            &[],
        )
    }

    #[test]
    fn test_full_page_structure() {
        let html = page("# Hello\n\nSome *text*.", MermaidMode::Keep);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Hello</title>"));
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<em>text</em>"));
        assert!(html.contains("@page { size: A4;"));
    }

    #[test]
    fn test_tables_and_tasklists() {
        let html = page(
            "| a | b |\n|---|---|\n| 1 | 2 |\n\n- [x] done\n- [ ] todo\n",
            MermaidMode::Keep,
        );
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains("type=\"checkbox\""));
    }

    #[test]
    fn test_metadata_is_escaped() {
        let doc = Document::new("body").with_metadata(DocumentMetadata {
            title: Some("<script>".to_string()),
            author: Some("Tom & Jerry".to_string()),
            keywords: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        });
        let html = render(&doc, &ConversionOptions::default(), MermaidMode::Keep, &[]);
        assert!(html.contains("<title>&lt;script&gt;</title>"));
        assert!(html.contains("content=\"Tom &amp; Jerry\""));
        assert!(html.contains("content=\"a, b\""));
    }

    #[test]
    fn test_front_matter_not_rendered() {
        let html = page("---\ntitle: Meta\n---\n\nBody text", MermaidMode::Keep);
        assert!(html.contains("<title>Meta</title>"));
        assert!(!html.contains("title: Meta"));
    }

    #[test]
    fn test_mermaid_script_mode() {
        let html = page("```mermaid\ngraph TD; A-->B\n```\n", MermaidMode::Script);
        assert!(html.contains("<pre class=\"mermaid\">"));
        assert!(html.contains("A--&gt;B"));
        assert!(html.contains("mermaid.initialize"));
    }

    #[test]
    fn test_mermaid_keep_mode() {
        let html = page("```mermaid\ngraph TD\n```\n", MermaidMode::Keep);
        assert!(html.contains("language-mermaid"));
        assert!(!html.contains("mermaid.initialize"));
    }

    #[test]
    fn test_mermaid_render_mode_uses_svg() {
        let diagrams = vec![RenderedDiagram {
            source: "graph TD".to_string(),
            svg: Some("<svg id=\"d1\"></svg>".to_string()),
            png: None,
        }];
        let body = render_body("```mermaid\ngraph TD\n```\n", MermaidMode::Render, &diagrams);
        assert!(body.contains("<svg id=\"d1\"></svg>"));
        assert!(body.contains("mermaid-diagram"));
    }

    #[test]
    fn test_custom_stylesheet() {
        let options = ConversionOptions {
            stylesheet: Some("body { color: red; }".to_string()),
            ..Default::default()
        };
        let html = render(&Document::new("x"), &options, MermaidMode::Keep, &[]);
        assert!(html.contains("body { color: red; }"));
        assert!(!html.contains("max-width: 50em"));
    }
}
