//! Markdown serializer for the editor surface.
//!
//! Inverse of the render pipeline: alerts become `> [!TYPE]` quotes,
//! code blocks become fences tagged with their language, explicit heading
//! anchors keep their `{#id}` suffix, underline becomes `<ins>`, and
//! footnote references and definitions are written back in `[^id]` form.
//! Text is escaped so that it reads back as the same text.

use std::sync::LazyLock;

use regex::Regex;

use crate::tree::{
    Alert, Block, CodeBlock, ColumnAlign, EditorSurface, FootnoteDef, Heading, Image, Inline,
    Link, List, Table,
};

static ORDERED_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([.)])(\s|$)").unwrap());

/// Escaped heading text that would read back as an explicit anchor.
static TRAILING_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{#(?:[a-zA-Z0-9-]|\\_)+\}$").unwrap());

/// Serialize a surface to Markdown.
///
/// Blocks are separated by one blank line; the result carries no trailing
/// newline.
pub fn to_markdown(surface: &EditorSurface) -> String {
    blocks_to_markdown(&surface.blocks, "\n\n")
}

fn blocks_to_markdown(blocks: &[Block], separator: &str) -> String {
    let mut out = String::new();
    let mut previous: Option<&Block> = None;
    let mut alternate = false;
    for block in blocks {
        let text = match (previous, block) {
            // Adjacent lists of the same kind would merge on re-read.
            (Some(Block::List(prev)), Block::List(list))
                if prev.is_ordered() == list.is_ordered() =>
            {
                alternate = !alternate;
                self::list(list, alternate)
            }
            _ => {
                alternate = false;
                block_to_markdown(block)
            }
        };
        previous = Some(block);
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str(separator);
        }
        out.push_str(&text);
    }
    out
}

fn block_to_markdown(block: &Block) -> String {
    match block {
        Block::Paragraph(content) => paragraph(content),
        Block::Heading(heading) => self::heading(heading),
        Block::List(list) => self::list(list, false),
        Block::BlockQuote(blocks) => quote_lines(&blocks_to_markdown(blocks, "\n\n")),
        Block::Alert(alert) => self::alert(alert),
        Block::CodeBlock(code) => code_fence(code),
        Block::Table(table) => self::table(table),
        Block::Rule => "---".to_string(),
        Block::Html(html) => html.trim_end().to_string(),
        Block::Footnotes(defs) => footnotes(defs),
    }
}

fn paragraph(content: &[Inline]) -> String {
    let text = inlines_to_markdown(content);
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&escape_line_start(line));
    }
    out.trim_end_matches(['\n', ' ']).to_string()
}

/// Escape a leading character that would otherwise start a block construct.
fn escape_line_start(line: &str) -> String {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];
    let mut out = String::with_capacity(line.len() + 1);
    out.push_str(indent);
    if let Some(caps) = ORDERED_MARKER_RE.captures(trimmed) {
        out.push_str(&caps[1]);
        out.push('\\');
        out.push_str(&trimmed[caps[1].len()..]);
        return out;
    }
    let needs_escape = match trimmed.chars().next() {
        Some('#' | '>' | '-' | '=' | '|') => true,
        Some('+') => trimmed[1..].starts_with(' ') || trimmed.len() == 1,
        _ => false,
    };
    if needs_escape {
        out.push('\\');
    }
    out.push_str(trimmed);
    out
}

fn heading(heading: &Heading) -> String {
    let mut out = "#".repeat(heading.level.clamp(1, 6) as usize);
    out.push(' ');
    let text = inlines_to_markdown(&heading.content);
    let text = text.replace("  \n", " ").replace('\n', " ");
    let text = text.trim();
    match TRAILING_ANCHOR_RE.find(text) {
        Some(literal) if !heading.anchor.explicit => {
            out.push_str(&text[..literal.start()]);
            out.push('\\');
            out.push_str(literal.as_str());
        }
        _ => out.push_str(text),
    }
    if heading.anchor.explicit {
        out.push_str(" {#");
        out.push_str(&heading.anchor.id);
        out.push('}');
    }
    out
}

fn list(list: &List, alternate: bool) -> String {
    let separator = if list.tight { "\n" } else { "\n\n" };
    let mut out = String::new();
    for (i, item) in list.items.iter().enumerate() {
        let mut marker = match (list.start, alternate) {
            (Some(start), false) => format!("{}. ", start + i as u64),
            (Some(start), true) => format!("{}) ", start + i as u64),
            (None, false) => "- ".to_string(),
            (None, true) => "* ".to_string(),
        };
        let indent = " ".repeat(marker.len());
        match item.checked {
            Some(true) => marker.push_str("[x] "),
            Some(false) => marker.push_str("[ ] "),
            None => {}
        }
        let body = blocks_to_markdown(&item.blocks, separator);
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(&marker);
        for (n, line) in body.split('\n').enumerate() {
            if n > 0 {
                out.push('\n');
                if !line.is_empty() {
                    out.push_str(&indent);
                }
            }
            out.push_str(line);
        }
        // An item with no content keeps its bare marker.
        let trimmed = out.trim_end_matches(' ').len();
        out.truncate(trimmed);
    }
    out
}

fn quote_lines(body: &str) -> String {
    body.split('\n')
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn alert(alert: &Alert) -> String {
    let mut out = format!("> [!{}]", alert.kind.marker());
    let body = blocks_to_markdown(&alert.blocks, "\n\n");
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&quote_lines(&body));
    }
    out
}

fn code_fence(code: &CodeBlock) -> String {
    if code.code.trim().is_empty() {
        return String::new();
    }
    let longest = longest_backtick_run(&code.code);
    let fence = "`".repeat(if longest >= 3 { longest + 1 } else { 3 });
    let mut out = String::with_capacity(code.code.len() + 16);
    out.push_str(&fence);
    out.push_str(&code.lang);
    out.push('\n');
    out.push_str(&code.code);
    out.push('\n');
    out.push_str(&fence);
    out
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn table(table: &Table) -> String {
    let columns = table.columns().max(1);
    let mut out = String::new();
    table_row(&mut out, &table.head, columns);
    out.push('\n');
    out.push('|');
    for i in 0..columns {
        let divider = match table.alignments.get(i).copied().unwrap_or_default() {
            ColumnAlign::None => " --- ",
            ColumnAlign::Left => " :-- ",
            ColumnAlign::Center => " :-: ",
            ColumnAlign::Right => " --: ",
        };
        out.push_str(divider);
        out.push('|');
    }
    for row in &table.rows {
        out.push('\n');
        table_row(&mut out, row, columns);
    }
    out
}

fn table_row(out: &mut String, cells: &[Vec<Inline>], columns: usize) {
    out.push('|');
    for i in 0..columns {
        let text = cells
            .get(i)
            .map(|cell| inlines_to_markdown(cell))
            .unwrap_or_default();
        let text = text.replace("  \n", " ").replace('\n', " ").replace('|', "\\|");
        out.push(' ');
        out.push_str(text.trim());
        out.push_str(" |");
    }
}

fn footnotes(defs: &[FootnoteDef]) -> String {
    defs.iter()
        .map(|def| {
            let text = inlines_to_markdown(&def.content);
            format!("[^{}]: {}", def.id, text.replace("  \n", " ").replace('\n', " ").trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize inline content.
pub fn inlines_to_markdown(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for (i, inline) in inlines.iter().enumerate() {
        match inline {
            Inline::Emphasis(children) => {
                // `_` does not open emphasis inside a word.
                let intraword = out.chars().last().is_some_and(char::is_alphanumeric)
                    || inlines
                        .get(i + 1)
                        .and_then(first_char)
                        .is_some_and(char::is_alphanumeric);
                let delimiter = if intraword { "*" } else { "_" };
                delimited(&mut out, delimiter, delimiter, children);
            }
            other => inline_to_markdown(&mut out, other),
        }
    }
    out
}

fn first_char(inline: &Inline) -> Option<char> {
    match inline {
        Inline::Text(text) => text.chars().next(),
        other => other.children()?.first().and_then(first_char),
    }
}

fn inline_to_markdown(out: &mut String, inline: &Inline) {
    match inline {
        Inline::Text(text) => escape_text(out, text),
        Inline::Code(code) => code_span(out, code),
        Inline::Emphasis(children) => delimited(out, "_", "_", children),
        Inline::Strong(children) => delimited(out, "**", "**", children),
        Inline::Strikethrough(children) => delimited(out, "~~", "~~", children),
        Inline::Underline(children) => delimited(out, "<ins>", "</ins>", children),
        Inline::Subscript(children) => delimited(out, "<sub>", "</sub>", children),
        Inline::Superscript(children) => delimited(out, "<sup>", "</sup>", children),
        Inline::Link(link) => self::link(out, link),
        Inline::Image(image) => self::image(out, image),
        Inline::FootnoteRef(id) => {
            out.push_str("[^");
            out.push_str(id);
            out.push(']');
        }
        Inline::SoftBreak => out.push('\n'),
        Inline::HardBreak => out.push_str("  \n"),
        Inline::Html(html) => out.push_str(html),
    }
}

/// Wrap serialized children, moving edge whitespace outside the delimiters.
fn delimited(out: &mut String, open: &str, close: &str, children: &[Inline]) {
    let inner = inlines_to_markdown(children);
    let core = inner.trim();
    if core.is_empty() {
        out.push_str(&inner);
        return;
    }
    let leading = &inner[..inner.len() - inner.trim_start().len()];
    let trailing = &inner[inner.trim_end().len()..];
    out.push_str(leading);
    out.push_str(open);
    out.push_str(core);
    out.push_str(close);
    out.push_str(trailing);
}

fn code_span(out: &mut String, code: &str) {
    let ticks = "`".repeat(longest_backtick_run(code) + 1);
    let pad = code.starts_with('`')
        || code.ends_with('`')
        || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());
    out.push_str(&ticks);
    if pad {
        out.push(' ');
    }
    out.push_str(code);
    if pad {
        out.push(' ');
    }
    out.push_str(&ticks);
}

fn link(out: &mut String, link: &Link) {
    out.push('[');
    out.push_str(&inlines_to_markdown(&link.content));
    out.push_str("](");
    push_destination(out, &link.url);
    push_title(out, &link.title);
    out.push(')');
}

fn image(out: &mut String, image: &Image) {
    out.push_str("![");
    escape_text(out, &image.alt);
    out.push_str("](");
    push_destination(out, &image.url);
    push_title(out, &image.title);
    out.push(')');
}

fn push_destination(out: &mut String, url: &str) {
    if url.contains([' ', '(', ')', '<', '>']) {
        out.push('<');
        out.push_str(&url.replace('<', "%3C").replace('>', "%3E"));
        out.push('>');
    } else {
        out.push_str(url);
    }
}

fn push_title(out: &mut String, title: &str) {
    if title.is_empty() {
        return;
    }
    out.push_str(" \"");
    out.push_str(&title.replace('"', "\\\""));
    out.push('"');
}

/// Backslash-escape characters that would read back as inline markup.
fn escape_text(out: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' | '*' | '_' | '`' | '[' | ']' | '~' => {
                out.push('\\');
                out.push(c);
            }
            '<' if chars
                .peek()
                .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?')) =>
            {
                out.push_str("\\<");
            }
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{AlertKind, Anchor, ListItem};

    #[test]
    fn escapes_literal_markup() {
        let surface = EditorSurface::new(vec![Block::Paragraph(vec![Inline::text(
            "2 * 3 = [six] and snake_case",
        )])]);
        assert_eq!(to_markdown(&surface), r"2 \* 3 = \[six\] and snake\_case");
    }

    #[test]
    fn escapes_block_starts() {
        let surface = EditorSurface::new(vec![
            Block::Paragraph(vec![Inline::text("# not a heading")]),
            Block::Paragraph(vec![Inline::text("1. not a list")]),
            Block::Paragraph(vec![Inline::text("- nor this")]),
        ]);
        insta::assert_snapshot!(to_markdown(&surface), @r"
        \# not a heading

        1\. not a list

        \- nor this
        ");
    }

    #[test]
    fn alert_and_anchor() {
        let surface = EditorSurface::new(vec![
            Block::Heading(Heading {
                level: 2,
                anchor: Anchor::explicit("setup"),
                content: vec![Inline::text("Setup")],
            }),
            Block::Alert(Alert {
                kind: AlertKind::Warning,
                blocks: vec![Block::Paragraph(vec![Inline::text("Back up first.")])],
            }),
        ]);
        insta::assert_snapshot!(to_markdown(&surface), @r"
        ## Setup {#setup}

        > [!WARNING]
        > Back up first.
        ");
    }

    #[test]
    fn derived_anchor_is_not_written() {
        let surface = EditorSurface::new(vec![Block::Heading(Heading {
            level: 1,
            anchor: Anchor::derived("Title"),
            content: vec![Inline::text("Title")],
        })]);
        assert_eq!(to_markdown(&surface), "# Title");
    }

    #[test]
    fn literal_anchor_text_is_escaped() {
        let surface = EditorSurface::new(vec![Block::Heading(Heading {
            level: 2,
            anchor: Anchor::derived("Notes {#x}"),
            content: vec![Inline::text("Notes {#x}")],
        })]);
        assert_eq!(to_markdown(&surface), r"## Notes \{#x}");
    }

    #[test]
    fn empty_code_block_is_dropped() {
        let surface = EditorSurface::new(vec![
            Block::CodeBlock(CodeBlock::new("rust", "  \n")),
            Block::Paragraph(vec![Inline::text("after")]),
        ]);
        assert_eq!(to_markdown(&surface), "after");
    }

    #[test]
    fn code_fence_grows_past_inner_fences() {
        let surface = EditorSurface::new(vec![Block::CodeBlock(CodeBlock::new(
            "md",
            "```js\nx\n```",
        ))]);
        assert_eq!(to_markdown(&surface), "````md\n```js\nx\n```\n````");
    }

    #[test]
    fn emphasis_whitespace_moves_outside() {
        let inlines = vec![
            Inline::text("a"),
            Inline::Strong(vec![Inline::text(" bold ")]),
            Inline::text("b"),
        ];
        assert_eq!(inlines_to_markdown(&inlines), "a **bold** b");
    }

    #[test]
    fn intraword_emphasis_uses_asterisks() {
        let inlines = vec![
            Inline::text("un"),
            Inline::Emphasis(vec![Inline::text("believ")]),
            Inline::text("able"),
        ];
        assert_eq!(inlines_to_markdown(&inlines), "un*believ*able");
        assert_eq!(
            inlines_to_markdown(&[Inline::Emphasis(vec![Inline::text("word")])]),
            "_word_"
        );
    }

    #[test]
    fn task_list_and_underline() {
        let surface = EditorSurface::new(vec![Block::List(List {
            start: None,
            tight: true,
            items: vec![
                ListItem {
                    checked: Some(true),
                    blocks: vec![Block::Paragraph(vec![Inline::Underline(vec![
                        Inline::text("done"),
                    ])])],
                },
                ListItem {
                    checked: Some(false),
                    blocks: vec![Block::Paragraph(vec![Inline::text("todo")])],
                },
            ],
        })]);
        assert_eq!(to_markdown(&surface), "- [x] <ins>done</ins>\n- [ ] todo");
    }

    #[test]
    fn adjacent_lists_alternate_markers() {
        let list = |text: &str| {
            Block::List(List {
                start: None,
                tight: true,
                items: vec![ListItem {
                    checked: None,
                    blocks: vec![Block::Paragraph(vec![Inline::text(text)])],
                }],
            })
        };
        let surface = EditorSurface::new(vec![list("a"), list("b"), list("c")]);
        assert_eq!(to_markdown(&surface), "- a\n\n* b\n\n- c");
    }

    #[test]
    fn ordered_list_numbers_from_start() {
        let surface = EditorSurface::new(vec![Block::List(List {
            start: Some(3),
            tight: true,
            items: vec![
                ListItem {
                    checked: None,
                    blocks: vec![Block::Paragraph(vec![Inline::text("c")])],
                },
                ListItem {
                    checked: None,
                    blocks: vec![Block::Paragraph(vec![Inline::text("d")])],
                },
            ],
        })]);
        assert_eq!(to_markdown(&surface), "3. c\n4. d");
    }
}
