//! The rich-text document tree.
//!
//! `EditorSurface` is the structured counterpart of the Markdown source: a
//! list of tagged block nodes holding tagged inline nodes. Everything the
//! editor shows (alerts, code block chrome, footnote sections, heading
//! anchors) has a node here, and both the HTML writer and the Markdown
//! serializer are pure functions over this tree.

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::path::{Node, NodeMut, NodePath};

/// Whole-document rich-text tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorSurface {
    pub blocks: Vec<Block>,
}

/// Block-level node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading(Heading),
    List(List),
    BlockQuote(Vec<Block>),
    Alert(Alert),
    CodeBlock(CodeBlock),
    Table(Table),
    Rule,
    /// Raw HTML block, passed through untouched.
    Html(String),
    /// Footnote section, always rendered after the document body.
    Footnotes(Vec<FootnoteDef>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 1 through 6.
    pub level: u8,
    pub anchor: Anchor,
    pub content: Vec<Inline>,
}

/// Heading anchor id.
///
/// `explicit` anchors came from a `{#id}` suffix in the source and are
/// written back out by the serializer. Derived anchors are recomputed from
/// the heading text and never serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub id: SmolStr,
    pub explicit: bool,
}

impl Anchor {
    pub fn explicit(id: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            explicit: true,
        }
    }

    /// Derive an anchor from heading text: lowercased, characters outside
    /// `[A-Za-z0-9_-]` and whitespace dropped, whitespace runs become `-`.
    pub fn derived(text: &str) -> Self {
        let mut id = String::with_capacity(text.len());
        let mut in_space = false;
        for c in text.to_lowercase().chars() {
            if c.is_whitespace() {
                in_space = true;
                continue;
            }
            if !(c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                continue;
            }
            if in_space {
                id.push('-');
                in_space = false;
            }
            id.push(c);
        }
        // Trailing whitespace still produces a dash.
        if in_space {
            id.push('-');
        }
        Self {
            id: id.into(),
            explicit: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    /// `Some(n)` for ordered lists starting at `n`.
    pub start: Option<u64>,
    pub tight: bool,
    pub items: Vec<ListItem>,
}

impl List {
    pub fn is_ordered(&self) -> bool {
        self.start.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListItem {
    /// `Some` for task items.
    pub checked: Option<bool>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub blocks: Vec<Block>,
}

/// GitHub-style callout type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AlertKind {
    pub const ALL: [AlertKind; 5] = [
        AlertKind::Note,
        AlertKind::Tip,
        AlertKind::Important,
        AlertKind::Warning,
        AlertKind::Caution,
    ];

    /// Lowercase type name used in class names and data attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::Note => "note",
            AlertKind::Tip => "tip",
            AlertKind::Important => "important",
            AlertKind::Warning => "warning",
            AlertKind::Caution => "caution",
        }
    }

    /// Uppercase marker as written in `> [!NOTE]`.
    pub fn marker(self) -> &'static str {
        match self {
            AlertKind::Note => "NOTE",
            AlertKind::Tip => "TIP",
            AlertKind::Important => "IMPORTANT",
            AlertKind::Warning => "WARNING",
            AlertKind::Caution => "CAUTION",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AlertKind::Note => "Note",
            AlertKind::Tip => "Tip",
            AlertKind::Important => "Important",
            AlertKind::Warning => "Warning",
            AlertKind::Caution => "Caution",
        }
    }

    /// Phosphor icon class shown in the alert header.
    pub fn icon(self) -> &'static str {
        match self {
            AlertKind::Note => "ph-info",
            AlertKind::Tip => "ph-lightbulb",
            AlertKind::Important => "ph-star",
            AlertKind::Warning => "ph-warning",
            AlertKind::Caution => "ph-warning-octagon",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized alert type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown alert type: {0}")]
pub struct UnknownAlertKind(pub String);

impl FromStr for AlertKind {
    type Err = UnknownAlertKind;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownAlertKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language tag. Empty when the fence carried none.
    pub lang: SmolStr,
    pub code: String,
}

impl CodeBlock {
    pub fn new(lang: impl Into<SmolStr>, code: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            code: code.into(),
        }
    }

    /// Language used for markup attributes, `text` when unset.
    pub fn markup_lang(&self) -> &str {
        if self.lang.is_empty() {
            "text"
        } else {
            &self.lang
        }
    }

    /// Language shown in the block header, `code` when unset or `text`.
    pub fn display_lang(&self) -> &str {
        match self.lang.as_str() {
            "" | "text" => "code",
            lang => lang,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnAlign {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// A cell's inline content.
pub type Cell = Vec<Inline>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub alignments: Vec<ColumnAlign>,
    pub head: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Row by index, where row 0 is the header row.
    pub fn row(&self, index: usize) -> Option<&Vec<Cell>> {
        match index {
            0 => Some(&self.head),
            n => self.rows.get(n - 1),
        }
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut Vec<Cell>> {
        match index {
            0 => Some(&mut self.head),
            n => self.rows.get_mut(n - 1),
        }
    }

    pub fn columns(&self) -> usize {
        self.head.len().max(self.alignments.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteDef {
    pub id: SmolStr,
    pub content: Vec<Inline>,
}

/// Inline node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Underline(Vec<Inline>),
    Subscript(Vec<Inline>),
    Superscript(Vec<Inline>),
    Link(Link),
    Image(Image),
    FootnoteRef(SmolStr),
    SoftBreak,
    HardBreak,
    Html(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub title: String,
    pub content: Vec<Inline>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub url: String,
    pub title: String,
    pub alt: String,
}

impl Inline {
    pub fn text(s: impl Into<String>) -> Self {
        Inline::Text(s.into())
    }

    /// Child inlines of a span node.
    pub fn children(&self) -> Option<&Vec<Inline>> {
        match self {
            Inline::Emphasis(c)
            | Inline::Strong(c)
            | Inline::Strikethrough(c)
            | Inline::Underline(c)
            | Inline::Subscript(c)
            | Inline::Superscript(c) => Some(c),
            Inline::Link(link) => Some(&link.content),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Inline::Emphasis(c)
            | Inline::Strong(c)
            | Inline::Strikethrough(c)
            | Inline::Underline(c)
            | Inline::Subscript(c)
            | Inline::Superscript(c) => Some(c),
            Inline::Link(link) => Some(&mut link.content),
            _ => None,
        }
    }

    /// Visible text of this node, as it would read in the editor.
    pub fn push_plain_text(&self, out: &mut String) {
        match self {
            Inline::Text(s) | Inline::Code(s) => out.push_str(s),
            Inline::SoftBreak | Inline::HardBreak => out.push('\n'),
            Inline::Image(_) | Inline::FootnoteRef(_) | Inline::Html(_) => {}
            other => {
                if let Some(children) = other.children() {
                    for child in children {
                        child.push_plain_text(out);
                    }
                }
            }
        }
    }
}

/// Concatenated visible text of an inline run.
pub fn inline_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        inline.push_plain_text(&mut out);
    }
    out
}

/// Merge adjacent text nodes and drop empty ones, recursively.
pub fn normalize_inlines(inlines: &mut Vec<Inline>) {
    let mut merged: Vec<Inline> = Vec::with_capacity(inlines.len());
    for mut inline in inlines.drain(..) {
        if let Some(children) = inline.children_mut() {
            normalize_inlines(children);
        }
        match (merged.last_mut(), inline) {
            (_, Inline::Text(s)) if s.is_empty() => {}
            (Some(Inline::Text(prev)), Inline::Text(s)) => prev.push_str(&s),
            (_, other) => merged.push(other),
        }
    }
    *inlines = merged;
}

impl Block {
    /// Visible text of the block. Nested blocks are separated by newlines.
    pub fn push_plain_text(&self, out: &mut String) {
        match self {
            Block::Paragraph(inlines) => out.push_str(&inline_text(inlines)),
            Block::Heading(heading) => out.push_str(&inline_text(&heading.content)),
            Block::List(list) => {
                for (i, item) in list.items.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    push_blocks_text(&item.blocks, out);
                }
            }
            Block::BlockQuote(blocks) => push_blocks_text(blocks, out),
            Block::Alert(alert) => {
                out.push_str(alert.kind.label());
                out.push('\n');
                push_blocks_text(&alert.blocks, out);
            }
            Block::CodeBlock(code) => out.push_str(&code.code),
            Block::Table(table) => {
                let rows = std::iter::once(&table.head).chain(table.rows.iter());
                for (r, row) in rows.enumerate() {
                    if r > 0 {
                        out.push('\n');
                    }
                    for (c, cell) in row.iter().enumerate() {
                        if c > 0 {
                            out.push('\t');
                        }
                        out.push_str(&inline_text(cell));
                    }
                }
            }
            Block::Rule => {}
            Block::Html(raw) => out.push_str(&strip_tags(raw)),
            Block::Footnotes(defs) => {
                for (i, def) in defs.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    out.push_str(&inline_text(&def.content));
                }
            }
        }
    }

    /// Child blocks for container blocks.
    pub fn child_blocks_mut(&mut self) -> Option<&mut Vec<Block>> {
        match self {
            Block::BlockQuote(blocks) => Some(blocks),
            Block::Alert(alert) => Some(&mut alert.blocks),
            _ => None,
        }
    }
}

fn push_blocks_text(blocks: &[Block], out: &mut String) {
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        block.push_plain_text(out);
    }
}

fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

impl EditorSurface {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Visible text of the whole document, blocks separated by newlines.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        push_blocks_text(&self.blocks, &mut out);
        out
    }

    /// Node at `path`, if the path resolves.
    pub fn node(&self, path: &NodePath) -> Option<Node<'_>> {
        let (first, rest) = path.indices().split_first()?;
        let mut node = Node::Block(self.blocks.get(*first)?);
        for index in rest {
            node = node.child(*index)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &NodePath) -> Option<NodeMut<'_>> {
        let (first, rest) = path.indices().split_first()?;
        let mut node = NodeMut::Block(self.blocks.get_mut(*first)?);
        for index in rest {
            node = node.child(*index)?;
        }
        Some(node)
    }

    /// Nodes from the top-level block down to the node at `path`, inclusive.
    pub fn ancestors(&self, path: &NodePath) -> Vec<Node<'_>> {
        let mut out = Vec::with_capacity(path.len());
        let Some((first, rest)) = path.indices().split_first() else {
            return out;
        };
        let Some(block) = self.blocks.get(*first) else {
            return out;
        };
        let mut node = Node::Block(block);
        out.push(node);
        for index in rest {
            match node.child(*index) {
                Some(child) => {
                    node = child;
                    out.push(node);
                }
                None => break,
            }
        }
        out
    }

    pub fn block(&self, path: &NodePath) -> Option<&Block> {
        match self.node(path)? {
            Node::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn block_mut(&mut self, path: &NodePath) -> Option<&mut Block> {
        match self.node_mut(path)? {
            NodeMut::Block(block) => Some(block),
            _ => None,
        }
    }

    /// The block list a path's final index points into: the document root,
    /// a quote, an alert or a list item.
    pub fn sibling_blocks_mut(&mut self, path: &NodePath) -> Option<&mut Vec<Block>> {
        let parent = path.parent()?;
        if parent.is_empty() {
            return Some(&mut self.blocks);
        }
        match self.node_mut(&parent)? {
            NodeMut::Block(block) => block.child_blocks_mut(),
            NodeMut::Item(item) => Some(&mut item.blocks),
            _ => None,
        }
    }

    /// Inline content owned by the node at `path`: paragraph, heading,
    /// table cell, footnote definition or inline span.
    pub fn inlines(&self, path: &NodePath) -> Option<&Vec<Inline>> {
        match self.node(path)? {
            Node::Block(Block::Paragraph(inlines)) => Some(inlines),
            Node::Block(Block::Heading(heading)) => Some(&heading.content),
            Node::Cell(cell) => Some(cell),
            Node::Footnote(def) => Some(&def.content),
            Node::Inline(inline) => inline.children(),
            _ => None,
        }
    }

    pub fn inlines_mut(&mut self, path: &NodePath) -> Option<&mut Vec<Inline>> {
        match self.node_mut(path)? {
            NodeMut::Block(Block::Paragraph(inlines)) => Some(inlines),
            NodeMut::Block(Block::Heading(heading)) => Some(&mut heading.content),
            NodeMut::Cell(cell) => Some(cell),
            NodeMut::Footnote(def) => Some(&mut def.content),
            NodeMut::Inline(inline) => inline.children_mut(),
            _ => None,
        }
    }

    pub fn list_item_mut(&mut self, path: &NodePath) -> Option<&mut ListItem> {
        match self.node_mut(path)? {
            NodeMut::Item(item) => Some(item),
            _ => None,
        }
    }

    /// Editable text held by a leaf: a text or code inline, or a code block.
    pub fn text_slot(&self, path: &NodePath) -> Option<&str> {
        match self.node(path)? {
            Node::Inline(Inline::Text(s)) | Node::Inline(Inline::Code(s)) => Some(s),
            Node::Block(Block::CodeBlock(code)) => Some(&code.code),
            _ => None,
        }
    }

    pub fn text_slot_mut(&mut self, path: &NodePath) -> Option<&mut String> {
        match self.node_mut(path)? {
            NodeMut::Inline(Inline::Text(s)) | NodeMut::Inline(Inline::Code(s)) => Some(s),
            NodeMut::Block(Block::CodeBlock(code)) => Some(&mut code.code),
            _ => None,
        }
    }

    /// Depth-first, pre-order walk over every node.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&NodePath, Node<'a>)) {
        for (i, block) in self.blocks.iter().enumerate() {
            walk_node(&NodePath::from(vec![i]), Node::Block(block), visit);
        }
    }

    /// Merge adjacent text nodes throughout the tree.
    pub fn normalize_text(&mut self) {
        normalize_blocks(&mut self.blocks);
    }
}

fn walk_node<'a>(path: &NodePath, node: Node<'a>, visit: &mut dyn FnMut(&NodePath, Node<'a>)) {
    visit(path, node);
    let mut index = 0;
    while let Some(child) = node.child(index) {
        walk_node(&path.child(index), child, visit);
        index += 1;
    }
}

fn normalize_blocks(blocks: &mut [Block]) {
    for block in blocks {
        match block {
            Block::Paragraph(inlines) => normalize_inlines(inlines),
            Block::Heading(heading) => normalize_inlines(&mut heading.content),
            Block::List(list) => {
                for item in &mut list.items {
                    normalize_blocks(&mut item.blocks);
                }
            }
            Block::BlockQuote(children) => normalize_blocks(children),
            Block::Alert(alert) => normalize_blocks(&mut alert.blocks),
            Block::Table(table) => {
                for cell in table.head.iter_mut().chain(table.rows.iter_mut().flatten()) {
                    normalize_inlines(cell);
                }
            }
            Block::Footnotes(defs) => {
                for def in defs {
                    normalize_inlines(&mut def.content);
                }
            }
            Block::CodeBlock(_) | Block::Rule | Block::Html(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_anchor_strips_punctuation() {
        assert_eq!(Anchor::derived("Getting Started!").id, "getting-started");
        assert_eq!(Anchor::derived("API v2.0 (beta)").id, "api-v20-beta");
        assert_eq!(Anchor::derived("snake_case and-dash").id, "snake_case-and-dash");
        assert_eq!(Anchor::derived("Åsa går").id, "sa-gr");
    }

    #[test]
    fn alert_kind_parses_case_insensitively() {
        assert_eq!("warning".parse::<AlertKind>(), Ok(AlertKind::Warning));
        assert_eq!("CAUTION".parse::<AlertKind>(), Ok(AlertKind::Caution));
        assert!("danger".parse::<AlertKind>().is_err());
    }

    #[test]
    fn normalize_merges_text() {
        let mut inlines = vec![
            Inline::text("a"),
            Inline::text(""),
            Inline::text("b"),
            Inline::Strong(vec![Inline::text("c"), Inline::text("d")]),
        ];
        normalize_inlines(&mut inlines);
        assert_eq!(
            inlines,
            vec![Inline::text("ab"), Inline::Strong(vec![Inline::text("cd")])]
        );
    }

    #[test]
    fn navigates_paths() {
        let surface = EditorSurface::new(vec![
            Block::Paragraph(vec![Inline::text("intro")]),
            Block::List(List {
                start: None,
                tight: true,
                items: vec![ListItem {
                    checked: Some(false),
                    blocks: vec![Block::Paragraph(vec![Inline::Strong(vec![
                        Inline::text("deep"),
                    ])])],
                }],
            }),
        ]);
        let path = NodePath::from(vec![1, 0, 0, 0, 0]);
        assert_eq!(surface.text_slot(&path), Some("deep"));
        let ancestors = surface.ancestors(&path);
        assert_eq!(ancestors.len(), 5);
        assert!(matches!(ancestors[1], Node::Item(_)));
        assert!(matches!(ancestors[3], Node::Inline(Inline::Strong(_))));
        assert!(surface.node(&NodePath::from(vec![1, 3])).is_none());
    }
}
