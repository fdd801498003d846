// Markdown to plain text

use super::markdown::parser;
use super::Document;
use pulldown_cmark::{Event, Tag, TagEnd};

struct ListState {
    next: Option<u64>,
}

pub(crate) fn render(document: &Document) -> String {
    let mut out = String::new();
    let mut lists: Vec<ListState> = Vec::new();
    let mut link_stack: Vec<String> = Vec::new();
    let mut image_alt: Option<String> = None;
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<String> = None;
    let mut quote_depth = 0usize;
    let mut in_metadata = false;

    for event in parser(&document.markdown) {
        if in_metadata {
            if let Event::End(TagEnd::MetadataBlock(_)) = event {
                in_metadata = false;
            }
            continue;
        }

        match event {
            Event::Start(Tag::MetadataBlock(_)) => in_metadata = true,
            Event::Start(Tag::Heading { .. }) => {
                block_break(&mut out);
            }
            Event::End(TagEnd::Heading(_)) => out.push('\n'),
            Event::Start(Tag::Paragraph) => {
                if lists.is_empty() {
                    block_break(&mut out);
                }
                push_quote_prefix(&mut out, quote_depth);
            }
            Event::End(TagEnd::Paragraph) => {
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::BlockQuote { .. }) => quote_depth += 1,
            Event::End(TagEnd::BlockQuote { .. }) => quote_depth = quote_depth.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) => block_break(&mut out),
            Event::End(TagEnd::CodeBlock) => {}
            Event::Start(Tag::List(start)) => {
                if lists.is_empty() {
                    block_break(&mut out);
                }
                lists.push(ListState { next: start });
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
            }
            Event::Start(Tag::Item) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                let depth = lists.len().saturating_sub(1);
                out.push_str(&"  ".repeat(depth));
                match lists.last_mut() {
                    Some(ListState { next: Some(n) }) => {
                        out.push_str(&format!("{}. ", n));
                        *n += 1;
                    }
                    _ => out.push_str("- "),
                }
            }
            Event::End(TagEnd::Item) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
            Event::Start(Tag::Table(_)) => block_break(&mut out),
            Event::End(TagEnd::Table) => {}
            Event::Start(Tag::TableHead) | Event::Start(Tag::TableRow) => row.clear(),
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                out.push_str(&row.join(" | "));
                out.push('\n');
                row.clear();
            }
            Event::Start(Tag::TableCell) => cell = Some(String::new()),
            Event::End(TagEnd::TableCell) => {
                if let Some(text) = cell.take() {
                    row.push(text.trim().to_string());
                }
            }
            Event::Start(Tag::Link { dest_url, .. }) => link_stack.push(dest_url.to_string()),
            Event::End(TagEnd::Link) => {
                if let Some(url) = link_stack.pop() {
                    write(&mut out, &mut cell, &format!(" ({})", url));
                }
            }
            Event::Start(Tag::Image { .. }) => image_alt = Some(String::new()),
            Event::End(TagEnd::Image) => {
                if let Some(alt) = image_alt.take() {
                    write(&mut out, &mut cell, &format!("[image: {}]", alt));
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(alt) = image_alt.as_mut() {
                    alt.push_str(&text);
                } else {
                    write(&mut out, &mut cell, &text);
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => write(&mut out, &mut cell, &html),
            Event::SoftBreak => write(&mut out, &mut cell, " "),
            Event::HardBreak => write(&mut out, &mut cell, "\n"),
            Event::Rule => {
                block_break(&mut out);
                out.push_str("----------\n");
            }
            Event::FootnoteReference(name) => write(&mut out, &mut cell, &format!("[{}]", name)),
            Event::Start(Tag::FootnoteDefinition(name)) => {
                block_break(&mut out);
                out.push_str(&format!("[{}]: ", name));
            }
            _ => {}
        }
    }

    let trimmed: Vec<&str> = out.lines().map(str::trim_end).collect();
    let mut text = trimmed.join("\n").trim().to_string();
    text.push('\n');
    text
}

fn write(out: &mut String, cell: &mut Option<String>, text: &str) {
    match cell {
        Some(buf) => buf.push_str(text),
        None => out.push_str(text),
    }
}

/// Separate blocks with exactly one blank line
fn block_break(out: &mut String) {
    if out.is_empty() {
        return;
    }
    while !out.ends_with("\n\n") {
        out.push('\n');
    }
}

fn push_quote_prefix(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("> ");
    }
}
