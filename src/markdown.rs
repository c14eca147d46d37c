//! Markdown presenter.
//!
//! Server text is parsed with pulldown-cmark into a small block model and
//! then laid out as ratatui lines. Raw HTML is kept as literal text and is
//! never interpreted.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InlineStyle {
    pub strong: bool,
    pub emphasis: bool,
    pub strike: bool,
    pub code: bool,
    pub link: bool,
    /// Raw HTML shown as-is
    pub raw: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inline {
    pub text: String,
    pub style: InlineStyle,
}

pub type Cell = Vec<Inline>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    Table { header: Vec<Cell>, rows: Vec<Vec<Cell>> },
    CodeBlock { lang: Option<String>, code: String },
    Quote(Vec<Block>),
    Rule,
}

impl Block {
    /// Text content without any styling.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Heading { content, .. } | Block::Paragraph(content) => inline_text(content),
            Block::List { items, .. } => items
                .iter()
                .map(|item| join_blocks(item))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Table { header, rows } => std::iter::once(header)
                .chain(rows.iter())
                .map(|row| row.iter().map(|cell| inline_text(cell)).collect::<Vec<_>>().join(" | "))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::CodeBlock { code, .. } => code.clone(),
            Block::Quote(blocks) => join_blocks(blocks),
            Block::Rule => String::new(),
        }
    }
}

fn join_blocks(blocks: &[Block]) -> String {
    blocks.iter().map(Block::plain_text).collect::<Vec<_>>().join("\n")
}

fn inline_text(content: &[Inline]) -> String {
    content.iter().map(|inline| inline.text.as_str()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

pub fn parse(text: &str) -> Document {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut builder = Builder::new();
    for event in Parser::new_ext(text, options) {
        builder.event(event);
    }
    builder.finish()
}

/// Parse and lay out in one step.
pub fn render(text: &str, width: u16) -> Vec<Line<'static>> {
    parse(text).to_lines(width)
}

// ---------------- Parsing ----------------

enum Container {
    Root(Vec<Block>),
    Quote(Vec<Block>),
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    Item(Vec<Block>),
}

#[derive(Default)]
struct TableBuilder {
    header: Vec<Cell>,
    rows: Vec<Vec<Cell>>,
    row: Vec<Cell>,
}

struct Builder {
    stack: Vec<Container>,
    inlines: Vec<Inline>,
    strong: usize,
    emphasis: usize,
    strike: usize,
    link: usize,
    code_block: Option<(Option<String>, String)>,
    table: Option<TableBuilder>,
}

impl Builder {
    fn new() -> Self {
        Self {
            stack: vec![Container::Root(Vec::new())],
            inlines: Vec::new(),
            strong: 0,
            emphasis: 0,
            strike: 0,
            link: 0,
            code_block: None,
            table: None,
        }
    }

    fn style(&self) -> InlineStyle {
        InlineStyle {
            strong: self.strong > 0,
            emphasis: self.emphasis > 0,
            strike: self.strike > 0,
            link: self.link > 0,
            ..InlineStyle::default()
        }
    }

    fn push_inline(&mut self, text: String, style: InlineStyle) {
        if !text.is_empty() {
            self.inlines.push(Inline { text, style });
        }
    }

    fn push_raw(&mut self, html: &str) {
        if self.inlines.last().is_some_and(|last| last.style.raw) && html.ends_with('\n') {
            // consecutive lines of one HTML block
            self.push_inline("\n".to_string(), InlineStyle { raw: true, ..InlineStyle::default() });
        }
        let style = InlineStyle { raw: true, ..self.style() };
        self.push_inline(html.trim_end_matches('\n').to_string(), style);
    }

    fn push_block(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(Container::Root(blocks) | Container::Quote(blocks) | Container::Item(blocks)) => {
                blocks.push(block);
            }
            Some(Container::List { items, .. }) => items.push(vec![block]),
            None => {}
        }
    }

    fn flush_paragraph(&mut self) {
        if self.table.is_some() || self.inlines.is_empty() {
            return;
        }
        let content = std::mem::take(&mut self.inlines);
        self.push_block(Block::Paragraph(content));
    }

    fn close_container(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        match self.stack.pop() {
            Some(Container::Quote(blocks)) => self.push_block(Block::Quote(blocks)),
            Some(Container::List { start, items }) => self.push_block(Block::List { start, items }),
            Some(Container::Item(blocks)) => match self.stack.last_mut() {
                Some(Container::List { items, .. }) => items.push(blocks),
                _ => {
                    for block in blocks {
                        self.push_block(block);
                    }
                }
            },
            Some(root @ Container::Root(_)) => self.stack.push(root),
            None => {}
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some((_, code)) = self.code_block.as_mut() {
                    code.push_str(&text);
                } else {
                    let style = self.style();
                    self.push_inline(text.to_string(), style);
                }
            }
            Event::Code(code) => {
                let style = InlineStyle { code: true, ..self.style() };
                self.push_inline(code.to_string(), style);
            }
            Event::Html(html) | Event::InlineHtml(html) => self.push_raw(&html),
            Event::SoftBreak => {
                let style = self.style();
                self.push_inline(" ".to_string(), style);
            }
            Event::HardBreak => self.push_inline("\n".to_string(), InlineStyle::default()),
            Event::Rule => {
                self.flush_paragraph();
                self.push_block(Block::Rule);
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_inline(marker.to_string(), InlineStyle::default());
            }
            Event::FootnoteReference(label) => {
                self.push_inline(format!("[^{}]", label), InlineStyle::default());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::Heading { .. } | Tag::HtmlBlock => self.flush_paragraph(),
            Tag::BlockQuote(_) => {
                self.flush_paragraph();
                self.stack.push(Container::Quote(Vec::new()));
            }
            Tag::List(start) => {
                self.flush_paragraph();
                self.stack.push(Container::List { start, items: Vec::new() });
            }
            Tag::Item => {
                self.flush_paragraph();
                self.stack.push(Container::Item(Vec::new()));
            }
            Tag::CodeBlock(kind) => {
                self.flush_paragraph();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code_block = Some((lang, String::new()));
            }
            Tag::Table(_) => {
                self.flush_paragraph();
                self.table = Some(TableBuilder::default());
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.row.clear();
                }
            }
            Tag::TableCell => self.inlines.clear(),
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Link { .. } => self.link += 1,
            Tag::Image { .. } => self.push_inline("[image: ".to_string(), InlineStyle::default()),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::HtmlBlock => self.flush_paragraph(),
            TagEnd::Heading(level) => {
                let content = std::mem::take(&mut self.inlines);
                self.push_block(Block::Heading { level: heading_level(level), content });
            }
            TagEnd::BlockQuote(_) | TagEnd::List(_) | TagEnd::Item => {
                self.flush_paragraph();
                self.close_container();
            }
            TagEnd::CodeBlock => {
                if let Some((lang, code)) = self.code_block.take() {
                    let code = code.trim_end_matches('\n').to_string();
                    self.push_block(Block::CodeBlock { lang, code });
                }
            }
            TagEnd::TableCell => {
                let cell = trim_cell(std::mem::take(&mut self.inlines));
                if let Some(table) = self.table.as_mut() {
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.push_block(Block::Table { header: table.header, rows: table.rows });
                }
            }
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            TagEnd::Link => self.link = self.link.saturating_sub(1),
            TagEnd::Image => self.push_inline("]".to_string(), InlineStyle::default()),
            _ => {}
        }
    }

    fn finish(mut self) -> Document {
        self.flush_paragraph();
        if let Some(table) = self.table.take() {
            self.push_block(Block::Table { header: table.header, rows: table.rows });
        }
        while self.stack.len() > 1 {
            self.close_container();
        }
        match self.stack.pop() {
            Some(Container::Root(blocks)) => Document { blocks },
            _ => Document::default(),
        }
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn trim_cell(mut cell: Cell) -> Cell {
    if let Some(first) = cell.first_mut() {
        first.text = first.text.trim_start().to_string();
    }
    if let Some(last) = cell.last_mut() {
        last.text = last.text.trim_end().to_string();
    }
    cell.retain(|inline| !inline.text.is_empty());
    cell
}

// ---------------- Layout ----------------

impl Document {
    /// Lay out for a viewport `width` columns wide. Long paragraph lines are
    /// left for the `Paragraph` widget to wrap.
    pub fn to_lines(&self, width: u16) -> Vec<Line<'static>> {
        let width = usize::from(width.max(10));
        let mut out = Vec::new();
        render_blocks(&self.blocks, width, true, &mut out);
        out
    }
}

fn render_blocks(blocks: &[Block], width: usize, spaced: bool, out: &mut Vec<Line<'static>>) {
    for (i, block) in blocks.iter().enumerate() {
        if spaced && i > 0 {
            out.push(Line::default());
        }
        render_block(block, width, out);
    }
}

fn render_block(block: &Block, width: usize, out: &mut Vec<Line<'static>>) {
    match block {
        Block::Heading { level, content } => {
            out.extend(inline_lines(content, heading_style(*level)));
        }
        Block::Paragraph(content) => out.extend(inline_lines(content, Style::default())),
        Block::List { start, items } => {
            for (i, item) in items.iter().enumerate() {
                let marker = match start {
                    Some(first) => format!("{}. ", first + i as u64),
                    None => "• ".to_string(),
                };
                let indent = marker.width();
                let mut inner = Vec::new();
                render_blocks(item, width.saturating_sub(indent), false, &mut inner);
                if inner.is_empty() {
                    inner.push(Line::default());
                }
                for (j, line) in inner.into_iter().enumerate() {
                    let lead = if j == 0 {
                        Span::styled(marker.clone(), Style::default().fg(Color::Cyan))
                    } else {
                        Span::raw(" ".repeat(indent))
                    };
                    out.push(prepend(lead, line));
                }
            }
        }
        Block::Table { header, rows } => render_table(header, rows, out),
        Block::CodeBlock { lang, code } => {
            let fence = Style::default().fg(Color::DarkGray);
            out.push(Line::from(Span::styled(
                format!("```{}", lang.as_deref().unwrap_or_default()),
                fence,
            )));
            for line in code.lines() {
                out.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(Color::Green),
                )));
            }
            out.push(Line::from(Span::styled("```".to_string(), fence)));
        }
        Block::Quote(blocks) => {
            let mut inner = Vec::new();
            render_blocks(blocks, width.saturating_sub(2), true, &mut inner);
            for line in inner {
                let gutter = Span::styled("│ ".to_string(), Style::default().fg(Color::DarkGray));
                out.push(prepend(gutter, line));
            }
        }
        Block::Rule => out.push(Line::from(Span::styled(
            "─".repeat(width),
            Style::default().fg(Color::DarkGray),
        ))),
    }
}

fn heading_style(level: u8) -> Style {
    let style = Style::default().add_modifier(Modifier::BOLD);
    match level {
        1 => style.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        2 => style.fg(Color::Cyan),
        _ => style.fg(Color::Yellow),
    }
}

fn inline_style(base: Style, style: InlineStyle) -> Style {
    let mut out = base;
    if style.strong {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.emphasis {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.strike {
        out = out.add_modifier(Modifier::CROSSED_OUT);
    }
    if style.code {
        out = out.fg(Color::Yellow);
    }
    if style.link {
        out = out.fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
    }
    if style.raw {
        out = out.fg(Color::DarkGray);
    }
    out
}

/// Styled lines for a run of inlines, breaking at embedded newlines.
fn inline_lines(content: &[Inline], base: Style) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    for inline in content {
        let style = inline_style(base, inline.style);
        let mut parts = inline.text.split('\n');
        if let Some(first) = parts.next() {
            if !first.is_empty() {
                spans.push(Span::styled(first.to_string(), style));
            }
        }
        for part in parts {
            lines.push(Line::from(std::mem::take(&mut spans)));
            if !part.is_empty() {
                spans.push(Span::styled(part.to_string(), style));
            }
        }
    }
    lines.push(Line::from(spans));
    lines
}

fn prepend(lead: Span<'static>, line: Line<'static>) -> Line<'static> {
    let mut spans = Vec::with_capacity(line.spans.len() + 1);
    spans.push(lead);
    spans.extend(line.spans);
    Line::from(spans)
}

fn render_table(header: &[Cell], rows: &[Vec<Cell>], out: &mut Vec<Line<'static>>) {
    let columns = rows.iter().map(Vec::len).fold(header.len(), usize::max);
    if columns == 0 {
        return;
    }

    let cell_text = |cell: &Cell| inline_text(cell).replace('\n', " ");
    let mut widths = vec![1usize; columns];
    for row in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell_text(cell).width());
            }
        }
    }

    let border = Style::default().fg(Color::DarkGray);
    let rule = |left: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        Line::from(Span::styled(format!("{}{}{}", left, segments.join(mid), right), border))
    };
    let row_line = |row: &[Cell], base: Style| {
        let mut spans = vec![Span::styled("│".to_string(), border)];
        for (i, width) in widths.iter().enumerate() {
            spans.push(Span::raw(" "));
            let mut used = 0;
            if let Some(cell) = row.get(i) {
                for inline in cell {
                    let text = inline.text.replace('\n', " ");
                    used += text.width();
                    spans.push(Span::styled(text, inline_style(base, inline.style)));
                }
            }
            spans.push(Span::raw(" ".repeat(width.saturating_sub(used) + 1)));
            spans.push(Span::styled("│".to_string(), border));
        }
        Line::from(spans)
    };

    out.push(rule("┌", "┬", "┐"));
    if !header.is_empty() {
        out.push(row_line(header, Style::default().add_modifier(Modifier::BOLD)));
        out.push(rule("├", "┼", "┤"));
    }
    for row in rows {
        out.push(row_line(row, Style::default()));
    }
    out.push(rule("└", "┴", "┘"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn all_text(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(line_text).collect()
    }

    #[test]
    fn heading_is_recognized() {
        let doc = parse("# Chats\nLes chats sont *drôles*.");
        assert_eq!(doc.blocks.len(), 2);
        assert!(matches!(doc.blocks[0], Block::Heading { level: 1, .. }));
        assert_eq!(doc.blocks[0].plain_text(), "Chats");

        let lines = all_text(&doc.to_lines(40));
        assert_eq!(lines[0], "Chats");
        assert_eq!(lines[2], "Les chats sont drôles.");
    }

    #[test]
    fn pipe_table_becomes_table() {
        let doc = parse("| Nom | Age |\n|-----|-----|\n| Alice | 30 |\n| Bob | 4 |");
        let Block::Table { header, rows } = &doc.blocks[0] else {
            panic!("expected a table, got {:?}", doc.blocks);
        };
        assert_eq!(header.iter().map(|c| inline_text(c)).collect::<Vec<_>>(), ["Nom", "Age"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(inline_text(&rows[0][0]), "Alice");

        let lines = all_text(&doc.to_lines(60));
        assert_eq!(lines[0], "┌───────┬─────┐");
        assert_eq!(lines[1], "│ Nom   │ Age │");
        assert_eq!(lines[3], "│ Alice │ 30  │");
        assert_eq!(lines.last().unwrap(), "└───────┴─────┘");
    }

    #[test]
    fn html_is_shown_as_text() {
        let doc = parse("<script>alert('x')</script>\n\nHello <b>there</b>");
        let Block::Paragraph(first) = &doc.blocks[0] else {
            panic!("expected literal paragraph, got {:?}", doc.blocks);
        };
        assert!(first.iter().all(|inline| inline.style.raw));
        assert_eq!(inline_text(first), "<script>alert('x')</script>");

        let lines = all_text(&doc.to_lines(60));
        assert!(lines.contains(&"Hello <b>there</b>".to_string()));
    }

    #[test]
    fn lists_nest_and_number() {
        let doc = parse("1. un\n2. deux\n   - a\n   - b\n");
        let Block::List { start, items } = &doc.blocks[0] else {
            panic!("expected a list, got {:?}", doc.blocks);
        };
        assert_eq!(*start, Some(1));
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1].last(), Some(Block::List { start: None, .. })));

        let lines = all_text(&doc.to_lines(40));
        assert_eq!(lines, ["1. un", "2. deux", "   • a", "   • b"]);
    }

    #[test]
    fn inline_styles_are_tracked() {
        let doc = parse("**gras** et *italique* et `code`");
        let Block::Paragraph(content) = &doc.blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(content[0].style.strong);
        assert!(content[2].style.emphasis);
        assert!(content.last().unwrap().style.code);
    }

    #[test]
    fn code_blocks_keep_their_lines() {
        let doc = parse("```python\nprint('a')\nprint('b')\n```");
        assert_eq!(
            doc.blocks[0],
            Block::CodeBlock {
                lang: Some("python".to_string()),
                code: "print('a')\nprint('b')".to_string()
            }
        );
        let lines = all_text(&doc.to_lines(40));
        assert_eq!(lines, ["```python", "print('a')", "print('b')", "```"]);
    }

    #[test]
    fn quotes_get_a_gutter() {
        let lines = all_text(&render("> citation", 40));
        assert_eq!(lines, ["│ citation"]);
    }

    #[test]
    fn rendering_is_idempotent() {
        let text = "# Titre\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n- x\n- y\n\n---";
        assert_eq!(parse(text), parse(text));
        assert_eq!(render(text, 50), render(text, 50));
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert!(parse("").blocks.is_empty());
        assert!(render("", 20).is_empty());
    }
}
