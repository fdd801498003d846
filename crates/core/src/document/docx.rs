// Markdown to Word (.docx)

use super::markdown::{heading_depth, is_mermaid, parser};
use super::mermaid::RenderedDiagram;
use super::{Document, DocumentError, DocumentResult};
use docx_rs::{
    BreakType, Docx, Paragraph, Pic, Run, RunFonts, Style, StyleType, Table, TableCell, TableRow,
};
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use std::io::Cursor;

const MONOSPACE: &str = "Consolas";
const INDENT_STEP: i32 = 720;
const HEADING_SIZES: [usize; 6] = [36, 30, 26, 24, 22, 22];

pub(crate) fn render(document: &Document, diagrams: &[RenderedDiagram]) -> DocumentResult<Vec<u8>> {
    let mut writer = DocxWriter::new(diagrams);
    for event in parser(&document.markdown) {
        writer.handle(event);
    }
    writer.finish()
}

#[derive(Default)]
struct RunStyle {
    bold: u32,
    italic: u32,
    strike: u32,
}

#[derive(Default)]
struct TableState {
    rows: Vec<TableRow>,
    cells: Vec<TableCell>,
    in_head: bool,
}

enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

struct DocxWriter<'d> {
    styles: Vec<Style>,
    blocks: Vec<Block>,
    paragraph: Option<Paragraph>,
    style: RunStyle,
    heading: Option<usize>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    code: Option<(bool, String)>,
    table: Option<TableState>,
    links: Vec<String>,
    image_alt: Option<String>,
    in_metadata: bool,
    diagrams: &'d [RenderedDiagram],
    diagram_index: usize,
}

impl<'d> DocxWriter<'d> {
    fn new(diagrams: &'d [RenderedDiagram]) -> Self {
        let styles = HEADING_SIZES
            .iter()
            .enumerate()
            .map(|(i, size)| {
                Style::new(&format!("Heading{}", i + 1), StyleType::Paragraph)
                    .name(&format!("Heading {}", i + 1))
                    .size(*size)
                    .bold()
            })
            .collect();

        Self {
            styles,
            blocks: Vec::new(),
            paragraph: None,
            style: RunStyle::default(),
            heading: None,
            lists: Vec::new(),
            quote_depth: 0,
            code: None,
            table: None,
            links: Vec::new(),
            image_alt: None,
            in_metadata: false,
            diagrams,
            diagram_index: 0,
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        if self.in_metadata {
            if let Event::End(TagEnd::MetadataBlock(_)) = event {
                self.in_metadata = false;
            }
            return;
        }

        if let Some((_, buf)) = self.code.as_mut() {
            match event {
                Event::Text(text) => buf.push_str(&text),
                Event::End(TagEnd::CodeBlock) => self.end_code_block(),
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(Tag::MetadataBlock(_)) => self.in_metadata = true,
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush();
                let depth = heading_depth(level);
                self.heading = Some(depth);
                self.paragraph = Some(Paragraph::new().style(&format!("Heading{}", depth)));
            }
            Event::End(TagEnd::Heading(_)) => {
                self.flush();
                self.heading = None;
            }
            Event::Start(Tag::Paragraph) => {
                // List items and table cells already own an open paragraph
                if self.paragraph.is_none() {
                    self.paragraph = Some(self.indented(Paragraph::new(), 0));
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if self.lists.is_empty() && self.table.is_none() {
                    self.flush();
                }
            }
            Event::Start(Tag::BlockQuote { .. }) => {
                self.flush();
                self.quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote { .. }) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                self.flush();
                let mermaid = matches!(&kind, CodeBlockKind::Fenced(info) if is_mermaid(info));
                self.code = Some((mermaid, String::new()));
            }
            Event::Start(Tag::List(start)) => {
                self.flush();
                self.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.flush();
                self.lists.pop();
            }
            Event::Start(Tag::Item) => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1) as i32;
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "\u{2022} ".to_string(),
                };
                let paragraph = self.indented(Paragraph::new(), depth + 1);
                self.paragraph = Some(paragraph.add_run(Run::new().add_text(marker)));
            }
            Event::End(TagEnd::Item) => self.flush(),
            Event::TaskListMarker(done) => self.text(if done { "[x] " } else { "[ ] " }),
            Event::Start(Tag::Table(_)) => {
                self.flush();
                self.table = Some(TableState::default());
            }
            Event::Start(Tag::TableHead) => {
                if let Some(table) = self.table.as_mut() {
                    table.in_head = true;
                }
            }
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                if let Some(table) = self.table.as_mut() {
                    let cells = std::mem::take(&mut table.cells);
                    table.rows.push(TableRow::new(cells));
                    table.in_head = false;
                }
            }
            Event::Start(Tag::TableCell) => self.paragraph = Some(Paragraph::new()),
            Event::End(TagEnd::TableCell) => {
                let paragraph = self.paragraph.take().unwrap_or_else(Paragraph::new);
                if let Some(table) = self.table.as_mut() {
                    table.cells.push(TableCell::new().add_paragraph(paragraph));
                }
            }
            Event::End(TagEnd::Table) => {
                if let Some(table) = self.table.take() {
                    self.blocks.push(Block::Table(Table::new(table.rows)));
                }
            }
            Event::Start(Tag::Emphasis) => self.style.italic += 1,
            Event::End(TagEnd::Emphasis) => self.style.italic = self.style.italic.saturating_sub(1),
            Event::Start(Tag::Strong) => self.style.bold += 1,
            Event::End(TagEnd::Strong) => self.style.bold = self.style.bold.saturating_sub(1),
            Event::Start(Tag::Strikethrough) => self.style.strike += 1,
            Event::End(TagEnd::Strikethrough) => {
                self.style.strike = self.style.strike.saturating_sub(1)
            }
            Event::Start(Tag::Link { dest_url, .. }) => self.links.push(dest_url.to_string()),
            Event::End(TagEnd::Link) => {
                if let Some(url) = self.links.pop() {
                    self.text(&format!(" ({})", url));
                }
            }
            Event::Start(Tag::Image { .. }) => self.image_alt = Some(String::new()),
            Event::End(TagEnd::Image) => {
                if let Some(alt) = self.image_alt.take() {
                    self.text(&format!("[image: {}]", alt));
                }
            }
            Event::Text(text) => {
                if let Some(alt) = self.image_alt.as_mut() {
                    alt.push_str(&text);
                } else {
                    self.text(&text);
                }
            }
            Event::Code(code) => {
                let run = Run::new().add_text(code.to_string()).fonts(monospace());
                self.push_run(run);
            }
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.push_run(Run::new().add_break(BreakType::TextWrapping)),
            Event::Rule => {
                self.flush();
                self.paragraph = Some(Paragraph::new().add_run(Run::new().add_text("\u{2500}".repeat(30))));
                self.flush();
            }
            Event::FootnoteReference(name) => self.text(&format!("[{}]", name)),
            Event::Start(Tag::FootnoteDefinition(name)) => {
                self.flush();
                self.paragraph = Some(Paragraph::new().add_run(Run::new().add_text(format!("[{}]: ", name))));
            }
            Event::End(TagEnd::FootnoteDefinition) => self.flush(),
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            _ => {}
        }
    }

    fn end_code_block(&mut self) {
        let Some((mermaid, source)) = self.code.take() else {
            return;
        };

        if mermaid {
            let diagram = self.diagrams.get(self.diagram_index);
            self.diagram_index += 1;
            if let Some(png) = diagram.and_then(|d| d.png.as_ref()) {
                let run = Run::new().add_image(Pic::new(png));
                self.blocks.push(Block::Paragraph(Paragraph::new().add_run(run)));
                return;
            }
        }

        let indent = self.quote_depth as i32 + 1;
        for line in source.trim_end_matches('\n').lines() {
            let run = Run::new().add_text(line.to_string()).fonts(monospace()).size(20);
            let paragraph = self.indented(Paragraph::new(), indent).add_run(run);
            self.blocks.push(Block::Paragraph(paragraph));
        }
    }

    fn indented(&self, paragraph: Paragraph, extra: i32) -> Paragraph {
        let level = self.quote_depth as i32 + extra;
        if level > 0 {
            paragraph.indent(Some(level * INDENT_STEP), None, None, None)
        } else {
            paragraph
        }
    }

    fn text(&mut self, text: &str) {
        let mut run = Run::new().add_text(text.to_string());
        let in_head = self.table.as_ref().map(|t| t.in_head).unwrap_or(false);
        if self.style.bold > 0 || in_head {
            run = run.bold();
        }
        if self.style.italic > 0 || self.quote_depth > 0 {
            run = run.italic();
        }
        if self.style.strike > 0 {
            run = run.strike();
        }
        if let Some(depth) = self.heading {
            run = run.bold().size(HEADING_SIZES[depth.clamp(1, 6) - 1]);
        }
        self.push_run(run);
    }

    fn push_run(&mut self, run: Run) {
        let paragraph = match self.paragraph.take() {
            Some(p) => p,
            None => self.indented(Paragraph::new(), 0),
        };
        self.paragraph = Some(paragraph.add_run(run));
    }

    fn flush(&mut self) {
        if self.table.is_some() {
            return;
        }
        if let Some(paragraph) = self.paragraph.take() {
            self.blocks.push(Block::Paragraph(paragraph));
        }
    }

    fn finish(mut self) -> DocumentResult<Vec<u8>> {
        self.flush();
        let mut docx = Docx::new();
        for style in self.styles {
            docx = docx.add_style(style);
        }
        for block in self.blocks {
            docx = match block {
                Block::Paragraph(p) => docx.add_paragraph(p),
                Block::Table(t) => docx.add_table(t),
            };
        }

        let mut cursor = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut cursor)
            .map_err(|e| DocumentError::Docx(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

fn monospace() -> RunFonts {
    RunFonts::new().ascii(MONOSPACE).hi_ansi(MONOSPACE)
}
