//! Untrusted markdown → sanitized document tree.
//!
//! Only a fixed set of structures survive: headings, paragraphs, emphasis,
//! strikethrough, lists, tables, block quotes, code, links and rules. Raw
//! HTML, images, footnotes and task markers are kept as literal text, so
//! rendering can never fail and never yields executable markup. Terminal
//! output additionally has control characters stripped, since escape
//! sequences are markup to a terminal.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use url::Url;

const SAFE_LINK_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    Quote(Vec<Block>),
    CodeBlock { lang: Option<String>, code: String },
    Table { header: Vec<Vec<Inline>>, rows: Vec<Vec<Vec<Inline>>> },
    Rule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Code(String),
    Link { href: String, content: Vec<Inline> },
    LineBreak,
}

#[derive(Debug)]
enum InlineKind {
    Paragraph { implicit: bool },
    Heading(u8),
    Emphasis,
    Strong,
    Strikethrough,
    Link(Option<String>),
    Cell,
    /// Unsupported container; children are spliced into the parent as-is.
    Flatten,
}

#[derive(Debug)]
enum BlockKind {
    Quote,
    List(Option<u64>),
    Item,
    Footnote(String),
    Flatten,
}

#[derive(Debug)]
struct InlineFrame {
    kind: InlineKind,
    children: Vec<Inline>,
}

#[derive(Debug)]
struct BlockFrame {
    kind: BlockKind,
    children: Vec<Block>,
    items: Vec<Vec<Block>>,
}

/// Accumulates pulldown-cmark events into a [`Document`].
#[derive(Debug, Default)]
struct TreeBuilder {
    root: Vec<Block>,
    blocks: Vec<BlockFrame>,
    inlines: Vec<InlineFrame>,
    code: Option<(Option<String>, String)>,
    table: Option<TableState>,
}

#[derive(Debug, Default)]
struct TableState {
    header: Vec<Vec<Inline>>,
    rows: Vec<Vec<Vec<Inline>>>,
    row: Vec<Vec<Inline>>,
}

impl TreeBuilder {
    fn push_block(&mut self, block: Block) {
        match self.blocks.last_mut() {
            Some(frame) => frame.children.push(block),
            None => self.root.push(block),
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        if self.inlines.is_empty() {
            // loose text directly inside a list item or quote
            self.inlines.push(InlineFrame {
                kind: InlineKind::Paragraph { implicit: true },
                children: Vec::new(),
            });
        }
        if let Some(frame) = self.inlines.last_mut() {
            frame.children.push(inline);
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some((_, code)) = self.code.as_mut() {
            code.push_str(text);
            return;
        }
        // merge adjacent text runs so the tree stays readable
        if let Some(Inline::Text(prev)) = self.inlines.last_mut().and_then(|f| f.children.last_mut()) {
            prev.push_str(text);
            return;
        }
        self.push_inline(Inline::Text(text.to_string()));
    }

    fn open_inline(&mut self, kind: InlineKind) {
        self.inlines.push(InlineFrame {
            kind,
            children: Vec::new(),
        });
    }

    fn close_inline(&mut self) {
        let Some(frame) = self.inlines.pop() else {
            return;
        };
        let children = frame.children;
        match frame.kind {
            InlineKind::Paragraph { .. } => {
                if !children.is_empty() {
                    self.push_block(Block::Paragraph(children));
                }
            }
            InlineKind::Heading(level) => self.push_block(Block::Heading {
                level,
                content: children,
            }),
            InlineKind::Emphasis => self.push_inline(Inline::Emphasis(children)),
            InlineKind::Strong => self.push_inline(Inline::Strong(children)),
            InlineKind::Strikethrough => self.push_inline(Inline::Strikethrough(children)),
            InlineKind::Cell => {
                if let Some(table) = self.table.as_mut() {
                    table.row.push(children);
                }
            }
            InlineKind::Link(Some(href)) => self.push_inline(Inline::Link {
                href,
                content: children,
            }),
            InlineKind::Link(None) | InlineKind::Flatten => {
                for child in children {
                    match child {
                        Inline::Text(t) => self.push_text(&t),
                        other => self.push_inline(other),
                    }
                }
            }
        }
    }

    /// Ends a paragraph opened implicitly by loose text, before a block starts
    /// or ends around it.
    fn flush_implicit(&mut self) {
        while matches!(
            self.inlines.last(),
            Some(InlineFrame {
                kind: InlineKind::Paragraph { implicit: true },
                ..
            })
        ) {
            self.close_inline();
        }
    }

    /// Drains any inline frames left open; only reachable on unbalanced input.
    fn flush_all_inlines(&mut self) {
        while !self.inlines.is_empty() {
            self.close_inline();
        }
    }

    fn open_block(&mut self, kind: BlockKind) {
        self.flush_implicit();
        self.blocks.push(BlockFrame {
            kind,
            children: Vec::new(),
            items: Vec::new(),
        });
    }

    fn close_block(&mut self) {
        self.flush_all_inlines();
        let Some(frame) = self.blocks.pop() else {
            return;
        };
        match frame.kind {
            BlockKind::Quote => self.push_block(Block::Quote(frame.children)),
            BlockKind::List(start) => {
                let mut items = frame.items;
                if !frame.children.is_empty() {
                    items.push(frame.children);
                }
                self.push_block(Block::List { start, items });
            }
            BlockKind::Item => {
                let in_list = matches!(
                    self.blocks.last(),
                    Some(BlockFrame {
                        kind: BlockKind::List(_),
                        ..
                    })
                );
                match self.blocks.last_mut() {
                    Some(list) if in_list => list.items.push(frame.children),
                    _ => {
                        for block in frame.children {
                            self.push_block(block);
                        }
                    }
                }
            }
            BlockKind::Footnote(label) => {
                // the label leads the definition's first paragraph
                let mut children = frame.children;
                if !matches!(children.first(), Some(Block::Paragraph(_))) {
                    children.insert(0, Block::Paragraph(Vec::new()));
                }
                if let Some(Block::Paragraph(content)) = children.first_mut() {
                    content.insert(0, Inline::Text(format!("[^{}]: ", label)));
                    if let [Inline::Text(_), Inline::Text(_), ..] = content.as_slice() {
                        let rest = content.remove(1);
                        if let (Inline::Text(head), Inline::Text(tail)) = (&mut content[0], rest) {
                            head.push_str(&tail);
                        }
                    }
                }
                for block in children {
                    self.push_block(block);
                }
            }
            BlockKind::Flatten => {
                for block in frame.children {
                    self.push_block(block);
                }
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.flush_implicit();
                self.open_inline(InlineKind::Paragraph { implicit: false });
            }
            Tag::Heading { level, .. } => {
                self.flush_implicit();
                self.open_inline(InlineKind::Heading(level as u8));
            }
            Tag::Emphasis => self.open_inline(InlineKind::Emphasis),
            Tag::Strong => self.open_inline(InlineKind::Strong),
            Tag::Strikethrough => self.open_inline(InlineKind::Strikethrough),
            Tag::Link { dest_url, .. } => self.open_inline(InlineKind::Link(safe_href(&dest_url))),
            Tag::BlockQuote => self.open_block(BlockKind::Quote),
            Tag::List(start) => self.open_block(BlockKind::List(start)),
            Tag::Item => self.open_block(BlockKind::Item),
            Tag::CodeBlock(kind) => {
                self.flush_implicit();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((lang, String::new()));
            }
            Tag::Table(_) => {
                self.flush_implicit();
                self.table = Some(TableState::default());
            }
            Tag::TableHead | Tag::TableRow => {}
            Tag::TableCell => self.open_inline(InlineKind::Cell),
            Tag::FootnoteDefinition(label) => self.open_block(BlockKind::Footnote(label.to_string())),
            Tag::HtmlBlock => self.open_block(BlockKind::Flatten),
            // images keep their alt text; anything else inline keeps its text
            _ => self.open_inline(InlineKind::Flatten),
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => {
                self.flush_implicit();
                self.close_inline();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.close_inline()
            }
            TagEnd::BlockQuote
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::HtmlBlock
            | TagEnd::FootnoteDefinition => self.close_block(),
            TagEnd::TableCell => self.close_inline(),
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
            TagEnd::Table => self.finish_table(),
            TagEnd::CodeBlock => {
                if let Some((lang, code)) = self.code.take() {
                    self.push_block(Block::CodeBlock { lang, code });
                }
            }
            _ => self.close_inline(),
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.push_inline(Inline::Code(code.to_string())),
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.push_inline(Inline::LineBreak),
            Event::Rule => {
                self.flush_implicit();
                self.push_block(Block::Rule);
            }
            // raw markup is shown, never interpreted
            Event::Html(html) | Event::InlineHtml(html) => self.push_text(&html),
            Event::FootnoteReference(label) => self.push_text(&format!("[^{}]", label)),
            Event::TaskListMarker(done) => self.push_text(if done { "[x] " } else { "[ ] " }),
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }

    fn finish_table(&mut self) {
        if let Some(table) = self.table.take() {
            self.push_block(Block::Table {
                header: table.header,
                rows: table.rows,
            });
        }
    }

    fn finish(mut self) -> Document {
        if let Some((lang, code)) = self.code.take() {
            self.push_block(Block::CodeBlock { lang, code });
        }
        self.flush_all_inlines();
        self.finish_table();
        while !self.blocks.is_empty() {
            self.close_block();
        }
        Document { blocks: self.root }
    }
}

fn safe_href(dest: &str) -> Option<String> {
    let url = Url::parse(dest.trim()).ok()?;
    if SAFE_LINK_SCHEMES.contains(&url.scheme()) {
        Some(url.to_string())
    } else {
        None
    }
}

/// Parses `text` into a sanitized tree. Total: every input produces a document.
pub fn render(text: &str) -> Document {
    let mut builder = TreeBuilder::default();
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;
    for event in Parser::new_ext(text, options) {
        builder.event(event);
    }
    builder.finish()
}

/// Strips C0 and C1 control characters (ESC, BEL, CSI, ...) except newline
/// and tab, so backend text cannot move the cursor, recolour or clear the
/// screen, or reach the clipboard through OSC 52.
pub fn escape_terminal(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

impl Inline {
    pub fn plain_text(&self) -> String {
        match self {
            Inline::Text(t) | Inline::Code(t) => t.clone(),
            Inline::Emphasis(c)
            | Inline::Strong(c)
            | Inline::Strikethrough(c)
            | Inline::Link { content: c, .. } => inlines_plain(c),
            Inline::LineBreak => "\n".to_string(),
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Inline::Text(t) => out.push_str(&escape_html(t)),
            Inline::Code(t) => {
                out.push_str("<code>");
                out.push_str(&escape_html(t));
                out.push_str("</code>");
            }
            Inline::Emphasis(c) => wrap_html(out, "em", c),
            Inline::Strong(c) => wrap_html(out, "strong", c),
            Inline::Strikethrough(c) => wrap_html(out, "del", c),
            Inline::Link { href, content } => {
                out.push_str(&format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">",
                    escape_html(href)
                ));
                for i in content {
                    i.write_html(out);
                }
                out.push_str("</a>");
            }
            Inline::LineBreak => out.push_str("<br />"),
        }
    }

    fn write_terminal(&self, out: &mut String) {
        match self {
            Inline::Text(t) => out.push_str(&escape_terminal(t)),
            Inline::Code(t) => {
                out.push('`');
                out.push_str(&escape_terminal(t));
                out.push('`');
            }
            Inline::Emphasis(c) => {
                out.push('_');
                c.iter().for_each(|i| i.write_terminal(out));
                out.push('_');
            }
            Inline::Strong(c) => {
                out.push('*');
                c.iter().for_each(|i| i.write_terminal(out));
                out.push('*');
            }
            Inline::Strikethrough(c) => {
                out.push_str("~~");
                c.iter().for_each(|i| i.write_terminal(out));
                out.push_str("~~");
            }
            Inline::Link { href, content } => {
                content.iter().for_each(|i| i.write_terminal(out));
                out.push_str(&format!(" <{}>", escape_terminal(href)));
            }
            Inline::LineBreak => out.push('\n'),
        }
    }
}

fn inlines_plain(inlines: &[Inline]) -> String {
    inlines.iter().map(Inline::plain_text).collect()
}

fn wrap_html(out: &mut String, tag: &str, children: &[Inline]) {
    out.push_str(&format!("<{}>", tag));
    for i in children {
        i.write_html(out);
    }
    out.push_str(&format!("</{}>", tag));
}

fn inlines_terminal(inlines: &[Inline]) -> String {
    let mut s = String::new();
    for i in inlines {
        i.write_terminal(&mut s);
    }
    s
}

impl Block {
    pub fn plain_text(&self) -> String {
        match self {
            Block::Heading { content, .. } | Block::Paragraph(content) => inlines_plain(content),
            Block::List { items, .. } => items
                .iter()
                .map(|item| item.iter().map(Block::plain_text).collect::<Vec<_>>().join("\n"))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Quote(blocks) => blocks.iter().map(Block::plain_text).collect::<Vec<_>>().join("\n"),
            Block::CodeBlock { code, .. } => code.clone(),
            Block::Table { header, rows } => std::iter::once(header)
                .chain(rows)
                .map(|row| row.iter().map(|c| inlines_plain(c)).collect::<Vec<_>>().join("\t"))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Rule => String::new(),
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Block::Heading { level, content } => {
                let tag = format!("h{}", (*level).clamp(1, 6));
                wrap_html(out, &tag, content);
                out.push('\n');
            }
            Block::Paragraph(content) => {
                wrap_html(out, "p", content);
                out.push('\n');
            }
            Block::List { start, items } => {
                match start {
                    Some(1) => out.push_str("<ol>\n"),
                    Some(n) => out.push_str(&format!("<ol start=\"{}\">\n", n)),
                    None => out.push_str("<ul>\n"),
                }
                for item in items {
                    out.push_str("<li>");
                    for b in item {
                        b.write_html(out);
                    }
                    out.push_str("</li>\n");
                }
                out.push_str(if start.is_some() { "</ol>\n" } else { "</ul>\n" });
            }
            Block::Quote(blocks) => {
                out.push_str("<blockquote>\n");
                for b in blocks {
                    b.write_html(out);
                }
                out.push_str("</blockquote>\n");
            }
            Block::CodeBlock { lang, code } => {
                match lang {
                    Some(l) => out.push_str(&format!(
                        "<pre><code class=\"language-{}\">",
                        escape_html(l)
                    )),
                    None => out.push_str("<pre><code>"),
                }
                out.push_str(&escape_html(code));
                out.push_str("</code></pre>\n");
            }
            Block::Table { header, rows } => {
                out.push_str("<table>\n<thead>\n<tr>");
                for cell in header {
                    wrap_html(out, "th", cell);
                }
                out.push_str("</tr>\n</thead>\n<tbody>\n");
                for row in rows {
                    out.push_str("<tr>");
                    for cell in row {
                        wrap_html(out, "td", cell);
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</tbody>\n</table>\n");
            }
            Block::Rule => out.push_str("<hr />\n"),
        }
    }

    fn write_terminal(&self, out: &mut String, indent: &str) {
        match self {
            Block::Heading { level, content } => {
                let text = inlines_terminal(content);
                out.push_str(indent);
                out.push_str(&text);
                out.push('\n');
                let underline = if *level <= 1 { '=' } else { '-' };
                out.push_str(indent);
                out.push_str(&underline.to_string().repeat(text.chars().count().max(3)));
                out.push('\n');
            }
            Block::Paragraph(content) => {
                for line in inlines_terminal(content).lines() {
                    out.push_str(indent);
                    out.push_str(line);
                    out.push('\n');
                }
            }
            Block::List { start, items } => {
                for (n, item) in items.iter().enumerate() {
                    let marker = match start {
                        Some(s) => format!("{}. ", s + n as u64),
                        None => "• ".to_string(),
                    };
                    let mut body = String::new();
                    let nested = format!("{}{}", indent, " ".repeat(marker.chars().count()));
                    for b in item {
                        b.write_terminal(&mut body, &nested);
                    }
                    // first line carries the marker in place of the padding
                    let body = body.strip_prefix(nested.as_str()).unwrap_or(&body);
                    out.push_str(indent);
                    out.push_str(&marker);
                    out.push_str(body);
                    if !body.ends_with('\n') {
                        out.push('\n');
                    }
                }
            }
            Block::Quote(blocks) => {
                let nested = format!("{}│ ", indent);
                for b in blocks {
                    b.write_terminal(out, &nested);
                }
            }
            Block::CodeBlock { code, .. } => {
                for line in escape_terminal(code).lines() {
                    out.push_str(indent);
                    out.push_str("    ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
            Block::Table { header, rows } => write_terminal_table(out, indent, header, rows),
            Block::Rule => {
                out.push_str(indent);
                out.push_str(&"─".repeat(40));
                out.push('\n');
            }
        }
    }
}

/// One line per row, columns padded to their widest cell, a dashed rule under
/// the header.
fn write_terminal_table(out: &mut String, indent: &str, header: &[Vec<Inline>], rows: &[Vec<Vec<Inline>>]) {
    let render_row = |row: &[Vec<Inline>]| -> Vec<String> {
        row.iter()
            .map(|cell| inlines_terminal(cell).replace('\n', " "))
            .collect()
    };
    let header = render_row(header);
    let rows: Vec<Vec<String>> = rows.iter().map(|r| render_row(r)).collect();

    let columns = rows.iter().map(Vec::len).chain([header.len()]).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&header).chain(&rows) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let write_line = |out: &mut String, row: &[String]| {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                format!("{}{}", cell, " ".repeat(w - cell.chars().count()))
            })
            .collect();
        out.push_str(indent);
        out.push_str(cells.join(" | ").trim_end());
        out.push('\n');
    };

    write_line(out, &header);
    out.push_str(indent);
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat((*w).max(1)))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &rows {
        write_line(out, row);
    }
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn plain_text(&self) -> String {
        self.blocks.iter().map(Block::plain_text).collect::<Vec<_>>().join("\n")
    }

    /// Headings in document order, as plain text.
    pub fn headings(&self) -> Vec<String> {
        fn walk(blocks: &[Block], out: &mut Vec<String>) {
            for b in blocks {
                match b {
                    Block::Heading { content, .. } => out.push(inlines_plain(content)),
                    Block::Quote(inner) => walk(inner, out),
                    Block::List { items, .. } => items.iter().for_each(|i| walk(i, out)),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.blocks, &mut out);
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for b in &self.blocks {
            b.write_html(&mut out);
        }
        out
    }

    pub fn to_terminal(&self) -> String {
        let mut out = String::new();
        for (i, b) in self.blocks.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            b.write_terminal(&mut out, "");
        }
        out
    }
}
