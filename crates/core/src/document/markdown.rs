// Markdown parsing helpers shared by the renderers

use super::DocumentMetadata;
use pulldown_cmark::{Event, HeadingLevel, MetadataBlockKind, Options, Parser, Tag, TagEnd};

pub(crate) fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
}

pub(crate) fn parser(markdown: &str) -> Parser<'_> {
    Parser::new_ext(markdown, parser_options())
}

/// Read `key: value` pairs from a leading `---` metadata block
pub fn extract_front_matter(markdown: &str) -> DocumentMetadata {
    let mut metadata = DocumentMetadata::default();
    let mut in_block = false;
    let mut raw = String::new();

    for event in parser(markdown) {
        match event {
            Event::Start(Tag::MetadataBlock(MetadataBlockKind::YamlStyle)) => in_block = true,
            Event::End(TagEnd::MetadataBlock(_)) => break,
            Event::Text(text) if in_block => raw.push_str(&text),
            _ if !in_block => break,
            _ => {}
        }
    }

    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
        if value.is_empty() {
            continue;
        }
        match key.trim().to_ascii_lowercase().as_str() {
            "title" => metadata.title = Some(value),
            "author" => metadata.author = Some(value),
            "subject" | "description" => metadata.subject = Some(value),
            "date" | "created" => metadata.created = Some(value),
            "keywords" | "tags" => {
                metadata.keywords = value
                    .trim_matches(|c| c == '[' || c == ']')
                    .split(',')
                    .map(|k| k.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
            }
            _ => {}
        }
    }

    metadata
}

/// Text of the first level-1 heading, if any
pub fn first_heading(markdown: &str) -> Option<String> {
    let mut in_heading = false;
    let mut heading = String::new();

    for event in parser(markdown) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_heading = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_heading => {
                let trimmed = heading.trim();
                return (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
            Event::Text(text) | Event::Code(text) if in_heading => heading.push_str(&text),
            _ => {}
        }
    }

    None
}

/// Whether a fenced code block info string declares a mermaid diagram
pub(crate) fn is_mermaid(info: &str) -> bool {
    info.split_whitespace()
        .next()
        .map(|lang| lang.eq_ignore_ascii_case("mermaid"))
        .unwrap_or(false)
}

pub(crate) fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_matter() {
        let md = "---\ntitle: \"Quarterly Report\"\nauthor: Grace\nkeywords: [finance, q3]\n---\n\n# Body\n";
        let meta = extract_front_matter(md);
        assert_eq!(meta.title.as_deref(), Some("Quarterly Report"));
        assert_eq!(meta.author.as_deref(), Some("Grace"));
        assert_eq!(meta.keywords, vec!["finance", "q3"]);
    }

    #[test]
    fn test_no_front_matter() {
        let meta = extract_front_matter("# Title\n\nkey: value\n");
        assert_eq!(meta, DocumentMetadata::default());
    }

    #[test]
    fn test_first_heading_skips_lower_levels() {
        let md = "## Sub\n\n# Main `api`\n";
        assert_eq!(first_heading(md).as_deref(), Some("Main api"));
        assert_eq!(first_heading("plain"), None);
    }

    #[test]
    fn test_is_mermaid() {
        assert!(is_mermaid("mermaid"));
        assert!(is_mermaid("Mermaid {theme=dark}"));
        assert!(!is_mermaid("rust"));
        assert!(!is_mermaid(""));
    }
}
