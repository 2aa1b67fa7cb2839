//! Reads editor markup back into an [`EditorSurface`].
//!
//! Stored documents hold the editor's rendered HTML, and raw HTML blocks in
//! the source may carry the same constructs. The reader is tolerant: it
//! accepts unclosed tags, stray end tags and unknown elements, and it repairs
//! markup written by older editor versions (bare `<pre>` code blocks become
//! wrapped code blocks, removed per-block delete buttons are dropped).

use smol_str::SmolStr;

use crate::tree::{
    Alert, AlertKind, Anchor, Block, CodeBlock, ColumnAlign, EditorSurface, FootnoteDef, Heading,
    Image, Inline, Link, List, ListItem, Table, inline_text, normalize_inlines,
};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "ul",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum HtmlNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<HtmlNode>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(key, _)| key == name)
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn is_block(&self) -> bool {
        BLOCK_ELEMENTS.contains(&self.name.as_str())
    }

    fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            HtmlNode::Element(el) => Some(el),
            HtmlNode::Text(_) => None,
        })
    }

    /// First descendant element matching `pred`, depth first.
    fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.child_elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find(pred) {
                return Some(found);
            }
        }
        None
    }

    fn text_content(&self) -> String {
        let mut out = String::new();
        push_text_content(&self.children, &mut out);
        out
    }
}

fn push_text_content(nodes: &[HtmlNode], out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Element(el) if el.name == "br" => out.push('\n'),
            HtmlNode::Element(el) => push_text_content(&el.children, out),
        }
    }
}

/// Read editor markup into a surface.
pub fn read_markup(html: &str) -> EditorSurface {
    let nodes = parse_fragment(html);
    EditorSurface::new(nodes_to_blocks(&nodes))
}

/// Whether a raw HTML block holds markup the reader turns into editor nodes.
pub fn needs_repair(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    lower.contains("<pre") || lower.contains("code-delete-btn") || lower.contains("code-block-wrapper")
}

/// Rewrite raw HTML blocks that hold legacy code markup into editor nodes.
pub fn repair_surface(surface: &mut EditorSurface) {
    repair_blocks(&mut surface.blocks);
}

fn repair_blocks(blocks: &mut Vec<Block>) {
    let mut repaired = Vec::with_capacity(blocks.len());
    for mut block in blocks.drain(..) {
        match &mut block {
            Block::Html(html) if needs_repair(html) => {
                tracing::debug!("repairing legacy code markup");
                repaired.extend(read_markup(html).blocks);
                continue;
            }
            Block::BlockQuote(children) => repair_blocks(children),
            Block::Alert(alert) => repair_blocks(&mut alert.blocks),
            Block::List(list) => {
                for item in &mut list.items {
                    repair_blocks(&mut item.blocks);
                }
            }
            _ => {}
        }
        repaired.push(block);
    }
    *blocks = repaired;
}

// --- tokenizer -------------------------------------------------------------

fn parse_fragment(html: &str) -> Vec<HtmlNode> {
    let mut stack: Vec<Element> = vec![Element {
        name: String::new(),
        attrs: Vec::new(),
        children: Vec::new(),
    }];
    let mut rest = html;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map_or("", |end| &rest[end + 1..]);
            continue;
        }
        if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').unwrap_or(after.len());
            let name = after[..end].trim().to_ascii_lowercase();
            rest = after.get(end + 1..).unwrap_or("");
            close_element(&mut stack, &name);
            continue;
        }
        if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let (element, self_closing, consumed) = read_start_tag(rest);
            rest = &rest[consumed..];
            if element.name == "script" || element.name == "style" {
                let close = format!("</{}", element.name);
                let lower = rest.to_ascii_lowercase();
                rest = match lower.find(&close) {
                    Some(pos) => rest[pos..].find('>').map_or("", |end| &rest[pos + end + 1..]),
                    None => "",
                };
                continue;
            }
            if element.name == "p" && stack.last().is_some_and(|top| top.name == "p") {
                close_element(&mut stack, "p");
            }
            if self_closing || VOID_ELEMENTS.contains(&element.name.as_str()) {
                push_node(&mut stack, HtmlNode::Element(element));
            } else {
                stack.push(element);
            }
            continue;
        }
        let skip = rest.chars().next().map_or(1, char::len_utf8);
        let end = rest[skip..].find('<').map_or(rest.len(), |pos| pos + skip);
        push_node(&mut stack, HtmlNode::Text(decode_entities(&rest[..end])));
        rest = &rest[end..];
    }
    while stack.len() > 1 {
        if let Some(open) = stack.pop() {
            push_node(&mut stack, HtmlNode::Element(open));
        }
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn push_node(stack: &mut [Element], node: HtmlNode) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

/// Close the nearest open element named `name`. Stray end tags are ignored.
fn close_element(stack: &mut Vec<Element>, name: &str) {
    let Some(pos) = stack.iter().rposition(|el| el.name == name) else {
        return;
    };
    if pos == 0 {
        return;
    }
    while stack.len() > pos {
        if let Some(open) = stack.pop() {
            push_node(stack, HtmlNode::Element(open));
        }
    }
}

/// Parse a start tag at the beginning of `input`. Returns the element, whether
/// it was self-closing, and the bytes consumed.
fn read_start_tag(input: &str) -> (Element, bool, usize) {
    let bytes = input.as_bytes();
    let mut i = 1;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/'
    {
        i += 1;
    }
    let name = input[1..i].to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                self_closing = true;
                i += 1;
                continue;
            }
            _ => {}
        }
        let start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let key = input[start..i].to_ascii_lowercase();
        if start == i {
            // Lone `=` or similar junk.
            i += 1;
            continue;
        }
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                let value_start = i + 1;
                i = value_start;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                value = decode_entities(&input[value_start..i]);
                i = (i + 1).min(bytes.len());
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                value = decode_entities(&input[value_start..i]);
            }
        }
        self_closing = false;
        attrs.push((key, value));
    }
    (
        Element {
            name,
            attrs,
            children: Vec::new(),
        },
        self_closing,
        i,
    )
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// --- tree conversion -------------------------------------------------------

fn nodes_to_blocks(nodes: &[HtmlNode]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending: Vec<Inline> = Vec::new();
    for node in nodes {
        match node {
            HtmlNode::Element(el) if el.has_class("code-delete-btn") => {}
            HtmlNode::Element(el) if el.is_block() => {
                flush_paragraph(&mut pending, &mut blocks);
                element_to_blocks(el, &mut blocks);
            }
            other => push_inline_node(other, &mut pending),
        }
    }
    flush_paragraph(&mut pending, &mut blocks);
    blocks
}

fn flush_paragraph(pending: &mut Vec<Inline>, blocks: &mut Vec<Block>) {
    let content = finish_inlines(std::mem::take(pending));
    if !content.is_empty() {
        blocks.push(Block::Paragraph(content));
    }
}

/// Normalize a run and trim whitespace at its edges.
fn finish_inlines(mut inlines: Vec<Inline>) -> Vec<Inline> {
    normalize_inlines(&mut inlines);
    while matches!(inlines.last(), Some(Inline::SoftBreak | Inline::HardBreak)) {
        inlines.pop();
    }
    if let Some(Inline::Text(first)) = inlines.first_mut() {
        let trimmed = first.trim_start().len();
        first.replace_range(..first.len() - trimmed, "");
    }
    if let Some(Inline::Text(last)) = inlines.last_mut() {
        let trimmed = last.trim_end().len();
        last.truncate(trimmed);
    }
    normalize_inlines(&mut inlines);
    inlines
}

fn element_to_blocks(el: &Element, blocks: &mut Vec<Block>) {
    match el.name.as_str() {
        "p" => {
            let content = finish_inlines(nodes_to_inlines(&el.children));
            if !content.is_empty() {
                blocks.push(Block::Paragraph(content));
            }
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => blocks.push(heading(el)),
        "ul" | "ol" => blocks.push(list(el)),
        "blockquote" => blocks.push(Block::BlockQuote(nodes_to_blocks(&el.children))),
        "pre" => blocks.push(Block::CodeBlock(pre_code(el, None))),
        "hr" => blocks.push(Block::Rule),
        "table" => blocks.push(table(el)),
        "div" if el.has_class("code-block-wrapper") => {
            let lang = el.attr("data-lang");
            let code = match el.find(&|e| e.name == "pre") {
                Some(pre) => pre_code(pre, lang),
                None => CodeBlock::new(lang.unwrap_or(""), el.text_content()),
            };
            blocks.push(Block::CodeBlock(code));
        }
        "div" if el.has_class("alert") => blocks.push(alert(el)),
        "div" if el.has_class("footnotes") => blocks.push(footnotes(el)),
        "div" if !el.children.iter().any(is_block_node) => {
            // A line the browser wrapped in a bare div.
            let content = finish_inlines(nodes_to_inlines(&el.children));
            if !content.is_empty() {
                blocks.push(Block::Paragraph(content));
            }
        }
        _ => blocks.extend(nodes_to_blocks(&el.children)),
    }
}

fn is_block_node(node: &HtmlNode) -> bool {
    matches!(node, HtmlNode::Element(el) if el.is_block())
}

fn heading(el: &Element) -> Block {
    let level = el.name[1..].parse::<u8>().unwrap_or(1);
    let content = finish_inlines(nodes_to_inlines(&el.children));
    let anchor = match el.attr("id") {
        Some(id) if el.attr("data-custom-anchor") == Some("true") && !id.is_empty() => {
            Anchor::explicit(id)
        }
        _ => Anchor::derived(inline_text(&content).trim()),
    };
    Block::Heading(Heading {
        level,
        anchor,
        content,
    })
}

fn list(el: &Element) -> Block {
    let start = if el.name == "ol" {
        Some(el.attr("start").and_then(|s| s.parse().ok()).unwrap_or(1))
    } else {
        None
    };
    let mut tight = true;
    let mut items = Vec::new();
    for li in el.child_elements().filter(|child| child.name == "li") {
        let mut checked = None;
        let mut children = Vec::with_capacity(li.children.len());
        for child in &li.children {
            match child {
                HtmlNode::Element(input)
                    if input.name == "input" && input.attr("type") == Some("checkbox") =>
                {
                    checked = Some(input.has_attr("checked"));
                }
                other => children.push(other.clone()),
            }
        }
        if children
            .iter()
            .any(|child| matches!(child, HtmlNode::Element(e) if e.name == "p"))
        {
            tight = false;
        }
        items.push(ListItem {
            checked,
            blocks: nodes_to_blocks(&children),
        });
    }
    Block::List(List {
        start,
        tight,
        items,
    })
}

fn pre_code(pre: &Element, lang: Option<&str>) -> CodeBlock {
    let code_el = pre.find(&|e| e.name == "code");
    let lang = lang.map(str::to_string).or_else(|| {
        code_el
            .and_then(|code| code.attr("class"))
            .and_then(|classes| {
                classes
                    .split_whitespace()
                    .find_map(|c| c.strip_prefix("language-"))
                    .map(str::to_string)
            })
    });
    let mut code = pre.text_content();
    if code.ends_with('\n') {
        code.pop();
    }
    let lang = lang.unwrap_or_default();
    // `text` is the display fallback for an unset language.
    let lang = if lang == "text" { String::new() } else { lang };
    CodeBlock::new(lang, code)
}

fn alert(el: &Element) -> Block {
    let kind = el
        .attr("data-alert-type")
        .and_then(|t| t.parse::<AlertKind>().ok())
        .or_else(|| {
            AlertKind::ALL
                .into_iter()
                .find(|kind| el.has_class(&format!("alert-{}", kind.as_str())))
        })
        .unwrap_or(AlertKind::Note);
    let blocks = match el.find(&|e| e.has_class("alert-content")) {
        Some(content) => nodes_to_blocks(&content.children),
        None => {
            let body: Vec<HtmlNode> = el
                .children
                .iter()
                .filter(|child| !matches!(child, HtmlNode::Element(e) if e.has_class("alert-header")))
                .cloned()
                .collect();
            nodes_to_blocks(&body)
        }
    };
    Block::Alert(Alert { kind, blocks })
}

fn footnotes(el: &Element) -> Block {
    let mut defs = Vec::new();
    if let Some(ol) = el.find(&|e| e.name == "ol") {
        for li in ol.child_elements().filter(|child| child.name == "li") {
            let Some(id) = li.attr("id").and_then(|id| id.strip_prefix("fn-")) else {
                continue;
            };
            let body: Vec<HtmlNode> = li
                .children
                .iter()
                .filter(|child| {
                    !matches!(child, HtmlNode::Element(a) if a.name == "a"
                        && a.attr("href").is_some_and(|href| href.starts_with("#fnref-")))
                })
                .cloned()
                .collect();
            let mut content = finish_inlines(nodes_to_inlines(&body));
            if let Some(Inline::Text(last)) = content.last_mut() {
                let trimmed = last.trim_end_matches(['↩', ' ']).len();
                last.truncate(trimmed);
            }
            normalize_inlines(&mut content);
            defs.push(FootnoteDef {
                id: SmolStr::new(id),
                content,
            });
        }
    }
    Block::Footnotes(defs)
}

fn table(el: &Element) -> Block {
    let mut rows: Vec<&Element> = Vec::new();
    collect_rows(el, &mut rows);
    let mut alignments = Vec::new();
    let mut head = Vec::new();
    let mut body = Vec::new();
    for (r, row) in rows.iter().enumerate() {
        let cells: Vec<&Element> = row
            .child_elements()
            .filter(|c| c.name == "td" || c.name == "th")
            .collect();
        if r == 0 {
            alignments = cells.iter().map(|cell| cell_align(cell)).collect();
            head = cells
                .iter()
                .map(|cell| finish_inlines(nodes_to_inlines(&cell.children)))
                .collect();
        } else {
            body.push(
                cells
                    .iter()
                    .map(|cell| finish_inlines(nodes_to_inlines(&cell.children)))
                    .collect(),
            );
        }
    }
    Block::Table(Table {
        alignments,
        head,
        rows: body,
    })
}

fn collect_rows<'a>(el: &'a Element, rows: &mut Vec<&'a Element>) {
    for child in el.child_elements() {
        match child.name.as_str() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => collect_rows(child, rows),
            _ => {}
        }
    }
}

fn cell_align(cell: &Element) -> ColumnAlign {
    let style = cell.attr("style").unwrap_or("").replace(' ', "");
    let align = cell.attr("align").unwrap_or("");
    if style.contains("text-align:left") || align == "left" {
        ColumnAlign::Left
    } else if style.contains("text-align:center") || align == "center" {
        ColumnAlign::Center
    } else if style.contains("text-align:right") || align == "right" {
        ColumnAlign::Right
    } else {
        ColumnAlign::None
    }
}

fn nodes_to_inlines(nodes: &[HtmlNode]) -> Vec<Inline> {
    let mut out = Vec::new();
    for node in nodes {
        push_inline_node(node, &mut out);
    }
    out
}

fn push_inline_node(node: &HtmlNode, out: &mut Vec<Inline>) {
    let el = match node {
        HtmlNode::Text(text) => {
            out.push(Inline::Text(collapse_whitespace(text)));
            return;
        }
        HtmlNode::Element(el) => el,
    };
    let children = || nodes_to_inlines(&el.children);
    match el.name.as_str() {
        "strong" | "b" => out.push(Inline::Strong(children())),
        "em" | "i" if !el.has_class("ph") => out.push(Inline::Emphasis(children())),
        "del" | "s" | "strike" => out.push(Inline::Strikethrough(children())),
        "u" | "ins" => out.push(Inline::Underline(children())),
        "sub" => out.push(Inline::Subscript(children())),
        "sup" if el.has_class("footnote-ref") => {
            let id = el
                .find(&|e| e.name == "a")
                .and_then(|a| {
                    a.attr("href")
                        .and_then(|href| href.strip_prefix("#fn-"))
                        .or_else(|| a.attr("id").and_then(|id| id.strip_prefix("fnref-")))
                })
                .map(SmolStr::new);
            match id {
                Some(id) => out.push(Inline::FootnoteRef(id)),
                None => out.push(Inline::Superscript(children())),
            }
        }
        "sup" => out.push(Inline::Superscript(children())),
        "code" => out.push(Inline::Code(el.text_content())),
        "a" => out.push(Inline::Link(Link {
            url: el.attr("href").unwrap_or("").to_string(),
            title: el.attr("title").unwrap_or("").to_string(),
            content: children(),
        })),
        "img" => out.push(Inline::Image(Image {
            url: el.attr("src").unwrap_or("").to_string(),
            title: el.attr("title").unwrap_or("").to_string(),
            alt: el.attr("alt").unwrap_or("").to_string(),
        })),
        "br" => out.push(Inline::HardBreak),
        "input" | "button" | "i" => {}
        _ if el.is_block() => {
            // Block content inside an inline run reads as its text.
            let text = finish_inlines(children());
            if !text.is_empty() {
                if !out.is_empty() {
                    out.push(Inline::HardBreak);
                }
                out.extend(text);
            }
        }
        _ => out.extend(children()),
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\t' | '\n' | '\r') {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{html::render_html, parse_markdown};

    #[test]
    fn reads_back_rendered_markup() {
        let source = "## Setup {#setup}\n\n> [!NOTE]\n> Read **this**.\n\n- [x] done\n- [ ] todo\n\n```rust\nfn main() {}\n```\n\nText[^a] with `#abc`\n\n[^a]: Explanation";
        let surface = parse_markdown(source);
        let html = render_html(&surface);
        assert_eq!(read_markup(&html), surface);
    }

    #[test]
    fn repairs_bare_pre_blocks() {
        let surface = read_markup(
            "<p>before</p><pre><code class=\"language-js\">let x = 1;\n</code></pre><button class=\"code-delete-btn\">x</button>",
        );
        assert_eq!(
            surface.blocks,
            vec![
                Block::Paragraph(vec![Inline::text("before")]),
                Block::CodeBlock(CodeBlock::new("js", "let x = 1;")),
            ]
        );
    }

    #[test]
    fn tolerates_broken_markup() {
        let surface = read_markup("<div>one <b>two</div><p>three &amp; four</span>");
        assert_eq!(
            surface.blocks,
            vec![
                Block::Paragraph(vec![
                    Inline::text("one "),
                    Inline::Strong(vec![Inline::text("two")]),
                ]),
                Block::Paragraph(vec![Inline::text("three & four")]),
            ]
        );
    }

    #[test]
    fn task_checkbox_state_from_attribute() {
        let surface = read_markup(
            "<ul><li class=\"task-list-item\"><input type=\"checkbox\" checked=\"\"> a</li><li class=\"task-list-item\"><input type=\"checkbox\"> b</li></ul>",
        );
        let Block::List(list) = &surface.blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(list.items[0].checked, Some(true));
        assert_eq!(list.items[1].checked, Some(false));
        assert_eq!(list.items[1].blocks, vec![Block::Paragraph(vec![Inline::text("b")])]);
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; &bogus; &"), "a <b> AB &bogus; &");
    }
}
