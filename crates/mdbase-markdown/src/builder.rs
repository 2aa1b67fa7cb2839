//! Builds an [`EditorSurface`] from parser events.
//!
//! The builder keeps a stack of open frames. Block-level tags map onto tree
//! nodes directly; editor-specific structure (alerts, heading anchors,
//! footnote references, emoji, inline `<sub>`/`<sup>`/`<u>`/`<ins>` spans)
//! is recognized while frames close.

use std::ops::Range;
use std::sync::LazyLock;

use markdown_weaver::{Alignment, CodeBlockKind, CowStr, Event, Tag, TagEnd};
use regex::Regex;
use smol_str::SmolStr;

use crate::emoji;
use crate::footnotes;
use crate::tree::{
    Alert, AlertKind, Anchor, Block, CodeBlock, ColumnAlign, EditorSurface, Heading, Image,
    Inline, Link, List, ListItem, Table, inline_text, normalize_inlines,
};

static ALERT_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\[!(NOTE|TIP|IMPORTANT|WARNING|CAUTION)\][ \t]*").unwrap()
});

static HEADING_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\{#([a-zA-Z0-9_-]+)\}\s*$").unwrap());

/// `\{#id}` at the end of a heading line, optionally before a closing `#` run.
static ESCAPED_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\{#[^}\s]*\}[ \t#]*$").unwrap());

static INLINE_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<(/?)(sub|sup|u|ins)\s*>$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanKind {
    Emphasis,
    Strong,
    Strikethrough,
    Underline,
    Subscript,
    Superscript,
}

impl SpanKind {
    fn wrap(self, children: Vec<Inline>) -> Inline {
        match self {
            SpanKind::Emphasis => Inline::Emphasis(children),
            SpanKind::Strong => Inline::Strong(children),
            SpanKind::Strikethrough => Inline::Strikethrough(children),
            SpanKind::Underline => Inline::Underline(children),
            SpanKind::Subscript => Inline::Subscript(children),
            SpanKind::Superscript => Inline::Superscript(children),
        }
    }

    fn from_html_tag(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sub" => Some(SpanKind::Subscript),
            "sup" => Some(SpanKind::Superscript),
            "u" | "ins" => Some(SpanKind::Underline),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Frame {
    Root(Vec<Block>),
    Quote(Vec<Block>),
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
        loose: bool,
    },
    Item {
        checked: Option<bool>,
        blocks: Vec<Block>,
        pending: Vec<Inline>,
    },
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    Table {
        alignments: Vec<ColumnAlign>,
        head: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
        row: Vec<Vec<Inline>>,
    },
    Cell(Vec<Inline>),
    Span {
        kind: SpanKind,
        children: Vec<Inline>,
    },
    /// Span opened by an inline HTML tag. Not matched by a parser end event.
    HtmlSpan {
        kind: SpanKind,
        open_tag: String,
        children: Vec<Inline>,
    },
    Link {
        url: String,
        title: String,
        content: Vec<Inline>,
    },
    Image {
        url: String,
        title: String,
        alt: String,
    },
    Code {
        lang: SmolStr,
        code: String,
    },
    HtmlBlock(String),
    /// Container with no dedicated node; its content flows to the parent.
    Passthrough {
        blocks: Vec<Block>,
        inlines: Vec<Inline>,
    },
}

/// Event-stream to tree builder.
pub struct TreeBuilder {
    stack: Vec<Frame>,
    footnote_ids: Vec<SmolStr>,
    /// The heading being closed wrote its trailing `{#id}` escaped.
    literal_anchor: bool,
}

impl TreeBuilder {
    pub fn new(footnote_ids: Vec<SmolStr>) -> Self {
        Self {
            stack: vec![Frame::Root(Vec::new())],
            footnote_ids,
            literal_anchor: false,
        }
    }

    pub fn build<'a, I>(mut self, events: I) -> EditorSurface
    where
        I: IntoIterator<Item = Event<'a>>,
    {
        for event in events {
            self.event(event);
        }
        self.finish()
    }

    /// Build from an offset iterator over `source`.
    ///
    /// Offsets let heading anchors tell `{#id}` from an escaped `\{#id}`,
    /// which parse to the same text.
    pub fn build_with_source<'a, I>(mut self, source: &str, events: I) -> EditorSurface
    where
        I: IntoIterator<Item = (Event<'a>, Range<usize>)>,
    {
        for (event, range) in events {
            if let Event::End(TagEnd::Heading(_)) = event {
                self.literal_anchor = source.get(range).is_some_and(escaped_anchor);
            }
            self.event(event);
        }
        self.finish()
    }

    fn finish(mut self) -> EditorSurface {
        // Unclosed frames only come from malformed streams. Fold them up.
        while self.stack.len() > 1 {
            self.close_top();
        }
        match self.stack.pop() {
            Some(Frame::Root(blocks)) => EditorSurface::new(blocks),
            _ => EditorSurface::default(),
        }
    }

    /// Build only the inline content of a single paragraph of source.
    pub fn build_inline<'a, I>(self, events: I) -> Vec<Inline>
    where
        I: IntoIterator<Item = Event<'a>>,
    {
        let surface = self.build(events);
        let mut out = Vec::new();
        for block in surface.blocks {
            match block {
                Block::Paragraph(inlines) => {
                    if !out.is_empty() {
                        out.push(Inline::SoftBreak);
                    }
                    out.extend(inlines);
                }
                Block::Heading(heading) => out.extend(heading.content),
                _ => {}
            }
        }
        out
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push_inline(Inline::Code(code.to_string())),
            Event::Html(html) => self.html(&html),
            Event::InlineHtml(html) => self.inline_html(&html),
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => self.push_block(Block::Rule),
            Event::TaskListMarker(checked) => {
                if let Some(Frame::Item { checked: slot, .. }) = self
                    .stack
                    .iter_mut()
                    .rev()
                    .find(|frame| matches!(frame, Frame::Item { .. }))
                {
                    *slot = Some(checked);
                }
            }
            Event::FootnoteReference(name) => {
                self.push_inline(Inline::FootnoteRef(SmolStr::new(&*name)))
            }
            Event::InlineMath(text) | Event::DisplayMath(text) => self.text(&text),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph(_) => {
                self.mark_loose();
                Frame::Paragraph(Vec::new())
            }
            Tag::Heading { level, .. } => Frame::Heading {
                level: level as u8,
                content: Vec::new(),
            },
            Tag::BlockQuote(_) => Frame::Quote(Vec::new()),
            Tag::CodeBlock(kind) => Frame::Code {
                lang: match kind {
                    CodeBlockKind::Fenced(info) => fence_lang(&info),
                    _ => SmolStr::default(),
                },
                code: String::new(),
            },
            Tag::HtmlBlock => Frame::HtmlBlock(String::new()),
            Tag::List(start) => Frame::List {
                start,
                items: Vec::new(),
                loose: false,
            },
            Tag::Item => Frame::Item {
                checked: None,
                blocks: Vec::new(),
                pending: Vec::new(),
            },
            Tag::Table(alignments) => Frame::Table {
                alignments: alignments.iter().map(column_align).collect(),
                head: Vec::new(),
                rows: Vec::new(),
                row: Vec::new(),
            },
            Tag::TableHead | Tag::TableRow => {
                if let Some(Frame::Table { row, .. }) = self.stack.last_mut() {
                    row.clear();
                }
                return;
            }
            Tag::TableCell => Frame::Cell(Vec::new()),
            Tag::Emphasis => span(SpanKind::Emphasis),
            Tag::Strong => span(SpanKind::Strong),
            Tag::Strikethrough => span(SpanKind::Strikethrough),
            Tag::Superscript => span(SpanKind::Superscript),
            Tag::Subscript => span(SpanKind::Subscript),
            Tag::Link {
                dest_url, title, ..
            } => Frame::Link {
                url: dest_url.to_string(),
                title: title.to_string(),
                content: Vec::new(),
            },
            Tag::Image {
                dest_url, title, ..
            } => Frame::Image {
                url: dest_url.to_string(),
                title: title.to_string(),
                alt: String::new(),
            },
            _ => Frame::Passthrough {
                blocks: Vec::new(),
                inlines: Vec::new(),
            },
        };
        self.stack.push(frame);
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::TableHead => {
                self.close_html_spans();
                if let Some(Frame::Table { head, row, .. }) = self.stack.last_mut() {
                    *head = std::mem::take(row);
                }
            }
            TagEnd::TableRow => {
                self.close_html_spans();
                if let Some(Frame::Table { rows, row, .. }) = self.stack.last_mut() {
                    rows.push(std::mem::take(row));
                }
            }
            _ => {
                self.close_html_spans();
                if self.stack.len() > 1 {
                    self.close_top();
                }
            }
        }
    }

    /// Inline HTML spans left open when their enclosing element ends are
    /// kept as literal markup.
    fn close_html_spans(&mut self) {
        while let Some(Frame::HtmlSpan { .. }) = self.stack.last() {
            if let Some(Frame::HtmlSpan {
                open_tag, children, ..
            }) = self.stack.pop()
            {
                self.push_inline(Inline::Html(open_tag));
                for child in children {
                    self.push_inline(child);
                }
            }
        }
    }

    fn close_top(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Root(blocks) => {
                // Never popped by an end event; put it back.
                self.stack.push(Frame::Root(blocks));
            }
            Frame::Quote(blocks) => {
                let block = make_quote(blocks);
                self.push_block(block);
            }
            Frame::List {
                start,
                items,
                loose,
            } => self.push_block(Block::List(List {
                start,
                tight: !loose,
                items,
            })),
            Frame::Item {
                checked,
                mut blocks,
                pending,
            } => {
                let pending = self.finish_inlines(pending);
                if !pending.is_empty() {
                    blocks.push(Block::Paragraph(pending));
                }
                if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                    items.push(ListItem { checked, blocks });
                }
            }
            Frame::Paragraph(content) => {
                let content = self.finish_inlines(content);
                if !content.is_empty() {
                    self.push_block(Block::Paragraph(content));
                }
            }
            Frame::Heading { level, content } => {
                let mut content = self.finish_inlines(content);
                let explicit = if std::mem::take(&mut self.literal_anchor) {
                    None
                } else {
                    take_trailing_anchor(&mut content)
                };
                let anchor =
                    explicit.unwrap_or_else(|| Anchor::derived(inline_text(&content).trim()));
                self.push_block(Block::Heading(Heading {
                    level,
                    anchor,
                    content,
                }));
            }
            Frame::Table {
                alignments,
                head,
                rows,
                ..
            } => self.push_block(Block::Table(Table {
                alignments,
                head,
                rows,
            })),
            Frame::Cell(content) => {
                let content = self.finish_inlines(content);
                if let Some(Frame::Table { row, .. }) = self.stack.last_mut() {
                    row.push(content);
                }
            }
            Frame::Span { kind, children } | Frame::HtmlSpan { kind, children, .. } => {
                let children = self.finish_inlines(children);
                if !children.is_empty() {
                    self.push_inline(kind.wrap(children));
                }
            }
            Frame::Link {
                url,
                title,
                content,
            } => {
                let content = self.finish_inlines(content);
                self.push_inline(Inline::Link(Link {
                    url,
                    title,
                    content,
                }));
            }
            Frame::Image { url, title, alt } => {
                self.push_inline(Inline::Image(Image { url, title, alt }))
            }
            Frame::Code { lang, mut code } => {
                if code.ends_with('\n') {
                    code.pop();
                }
                self.push_block(Block::CodeBlock(CodeBlock { lang, code }));
            }
            Frame::HtmlBlock(html) => {
                let html = html.trim_end_matches('\n');
                if !html.is_empty() {
                    self.push_block(Block::Html(html.to_string()));
                }
            }
            Frame::Passthrough { blocks, inlines } => {
                for block in blocks {
                    self.push_block(block);
                }
                for inline in inlines {
                    self.push_inline(inline);
                }
            }
        }
    }

    /// Loose-list detection: a paragraph tag directly inside an item.
    fn mark_loose(&mut self) {
        let len = self.stack.len();
        if len < 2 {
            return;
        }
        if let Frame::Item { .. } = self.stack[len - 1]
            && let Frame::List { loose, .. } = &mut self.stack[len - 2]
        {
            *loose = true;
        }
    }

    fn text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(Frame::Code { code, .. }) => code.push_str(text),
            Some(Frame::HtmlBlock(html)) => html.push_str(text),
            _ => self.push_inline(Inline::Text(text.to_string())),
        }
    }

    fn html(&mut self, html: &str) {
        match self.stack.last_mut() {
            Some(Frame::HtmlBlock(buf)) => buf.push_str(html),
            _ => self.inline_html(html),
        }
    }

    fn inline_html(&mut self, html: &str) {
        let Some(caps) = INLINE_SPAN_RE.captures(html.trim()) else {
            self.push_inline(Inline::Html(html.to_string()));
            return;
        };
        let Some(kind) = SpanKind::from_html_tag(&caps[2]) else {
            self.push_inline(Inline::Html(html.to_string()));
            return;
        };
        if caps[1].is_empty() {
            self.stack.push(Frame::HtmlSpan {
                kind,
                open_tag: html.to_string(),
                children: Vec::new(),
            });
            return;
        }
        // Closing tag: only closes a span opened in the same inline run.
        let open_name = caps[2].to_ascii_lowercase();
        let matches_top = match self.stack.last() {
            Some(Frame::HtmlSpan { open_tag, .. }) => INLINE_SPAN_RE
                .captures(open_tag.trim())
                .is_some_and(|open| open[2].eq_ignore_ascii_case(&open_name)),
            _ => false,
        };
        if matches_top {
            self.close_top();
        } else {
            self.push_inline(Inline::Html(html.to_string()));
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.stack.last_mut() {
            Some(
                Frame::Paragraph(content)
                | Frame::Heading { content, .. }
                | Frame::Cell(content)
                | Frame::Span {
                    children: content, ..
                }
                | Frame::HtmlSpan {
                    children: content, ..
                }
                | Frame::Link { content, .. }
                | Frame::Item {
                    pending: content, ..
                }
                | Frame::Passthrough {
                    inlines: content, ..
                },
            ) => content.push(inline),
            Some(Frame::Image { alt, .. }) => inline.push_plain_text(alt),
            Some(Frame::Code { code, .. }) => inline.push_plain_text(code),
            Some(Frame::HtmlBlock(html)) => inline.push_plain_text(html),
            Some(Frame::Root(blocks) | Frame::Quote(blocks)) => {
                blocks.push(Block::Paragraph(vec![inline]))
            }
            _ => tracing::trace!(?inline, "inline content outside an inline container"),
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(
                Frame::Root(blocks)
                | Frame::Quote(blocks)
                | Frame::Passthrough { blocks, .. },
            ) => blocks.push(block),
            Some(Frame::Item {
                blocks, pending, ..
            }) => {
                // Tight item text before a nested block becomes its own paragraph.
                if !pending.is_empty() {
                    let pending = finish_inlines_with(std::mem::take(pending), &self.footnote_ids);
                    if !pending.is_empty() {
                        blocks.push(Block::Paragraph(pending));
                    }
                }
                blocks.push(block);
            }
            _ => tracing::trace!(?block, "block content outside a block container"),
        }
    }

    fn finish_inlines(&self, inlines: Vec<Inline>) -> Vec<Inline> {
        finish_inlines_with(inlines, &self.footnote_ids)
    }
}

fn span(kind: SpanKind) -> Frame {
    Frame::Span {
        kind,
        children: Vec::new(),
    }
}

fn fence_lang(info: &CowStr<'_>) -> SmolStr {
    SmolStr::new(info.split_whitespace().next().unwrap_or(""))
}

fn column_align(alignment: &Alignment) -> ColumnAlign {
    match alignment {
        Alignment::Left => ColumnAlign::Left,
        Alignment::Center => ColumnAlign::Center,
        Alignment::Right => ColumnAlign::Right,
        _ => ColumnAlign::None,
    }
}

/// Merge adjacent text, then resolve footnote references and emoji
/// shortcodes in the text nodes.
fn finish_inlines_with(mut inlines: Vec<Inline>, footnote_ids: &[SmolStr]) -> Vec<Inline> {
    normalize_inlines(&mut inlines);
    let mut out = Vec::with_capacity(inlines.len());
    for inline in inlines {
        match inline {
            Inline::Text(text) => match footnotes::split_references(&text, footnote_ids) {
                Some(parts) => out.extend(parts.into_iter().map(replace_emoji)),
                None => out.push(replace_emoji(Inline::Text(text))),
            },
            other => out.push(other),
        }
    }
    out
}

fn replace_emoji(inline: Inline) -> Inline {
    match inline {
        Inline::Text(text) => Inline::Text(emoji::replace_shortcodes(&text).into_owned()),
        other => other,
    }
}

/// Strip a trailing `{#id}` from heading content.
fn take_trailing_anchor(content: &mut Vec<Inline>) -> Option<Anchor> {
    let Some(Inline::Text(last)) = content.last_mut() else {
        return None;
    };
    let caps = HEADING_ANCHOR_RE.captures(last)?;
    let id = caps[1].to_string();
    let start = caps.get(0)?.start();
    last.truncate(start);
    if last.is_empty() {
        content.pop();
    }
    Some(Anchor::explicit(id))
}

fn escaped_anchor(raw: &str) -> bool {
    let content = raw.trim_end();
    // Setext headings end with their underline.
    let content = match content.rsplit_once('\n') {
        Some((text, underline))
            if underline.trim().chars().all(|c| c == '=' || c == '-') =>
        {
            text.trim_end()
        }
        _ => content,
    };
    ESCAPED_ANCHOR_RE.is_match(content)
}

/// A blockquote whose first paragraph opens with `[!TYPE]` is an alert.
fn make_quote(mut blocks: Vec<Block>) -> Block {
    let kind = match blocks.first_mut() {
        Some(Block::Paragraph(content)) => take_alert_marker(content),
        _ => None,
    };
    match kind {
        Some(kind) => {
            if let Some(Block::Paragraph(content)) = blocks.first()
                && content.is_empty()
            {
                blocks.remove(0);
            }
            Block::Alert(Alert { kind, blocks })
        }
        None => Block::BlockQuote(blocks),
    }
}

fn take_alert_marker(content: &mut Vec<Inline>) -> Option<AlertKind> {
    let Some(Inline::Text(first)) = content.first_mut() else {
        return None;
    };
    let caps = ALERT_MARKER_RE.captures(first)?;
    let kind = caps[1].parse::<AlertKind>().ok()?;
    let end = caps.get(0)?.end();
    first.replace_range(..end, "");
    if first.is_empty() {
        content.remove(0);
        if matches!(content.first(), Some(Inline::SoftBreak | Inline::HardBreak)) {
            content.remove(0);
        }
    }
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_md_options;
    use markdown_weaver::Parser;

    fn build(source: &str) -> EditorSurface {
        TreeBuilder::new(Vec::new()).build(Parser::new_ext(source, default_md_options()))
    }

    #[test]
    fn alert_marker_becomes_alert() {
        let surface = build("> [!warning]\n> Back up first.");
        assert_eq!(
            surface.blocks,
            vec![Block::Alert(Alert {
                kind: AlertKind::Warning,
                blocks: vec![Block::Paragraph(vec![Inline::text("Back up first.")])],
            })]
        );
    }

    #[test]
    fn plain_quote_stays_quote() {
        let surface = build("> [!danger] nope");
        assert!(matches!(surface.blocks[0], Block::BlockQuote(_)));
    }

    #[test]
    fn heading_anchor_forms() {
        let surface = build("## Setup {#setup}\n\n# Getting Started!");
        let Block::Heading(explicit) = &surface.blocks[0] else {
            panic!("expected heading");
        };
        assert_eq!(explicit.anchor, Anchor::explicit("setup"));
        assert_eq!(explicit.content, vec![Inline::text("Setup")]);
        let Block::Heading(derived) = &surface.blocks[1] else {
            panic!("expected heading");
        };
        assert_eq!(derived.anchor.id, "getting-started");
        assert!(!derived.anchor.explicit);
    }

    #[test]
    fn inline_html_spans() {
        let surface = build("H<sub>2</sub>O and <ins>new</ins> <b>raw</b>");
        let Block::Paragraph(content) = &surface.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(content[0], Inline::text("H"));
        assert_eq!(content[1], Inline::Subscript(vec![Inline::text("2")]));
        assert_eq!(content[3], Inline::Underline(vec![Inline::text("new")]));
        assert!(content.contains(&Inline::Html("<b>".to_string())));
    }

    #[test]
    fn task_items_and_tightness() {
        let surface = build("- [x] done\n- [ ] todo\n  - nested");
        let Block::List(list) = &surface.blocks[0] else {
            panic!("expected list");
        };
        assert!(list.tight);
        assert_eq!(list.items[0].checked, Some(true));
        assert_eq!(list.items[1].checked, Some(false));
        assert_eq!(list.items[1].blocks.len(), 2);
        assert!(matches!(list.items[1].blocks[1], Block::List(_)));
    }

    #[test]
    fn code_block_language() {
        let surface = build("```rust ignore\nfn main() {}\n```\n\n```\nplain\n```");
        assert_eq!(
            surface.blocks,
            vec![
                Block::CodeBlock(CodeBlock::new("rust", "fn main() {}")),
                Block::CodeBlock(CodeBlock::new("", "plain")),
            ]
        );
    }
}
