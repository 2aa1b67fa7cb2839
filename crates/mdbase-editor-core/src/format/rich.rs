//! Formatting on the rich-text tree.
//!
//! Inline toggles flatten a container's inlines into runs of text tagged
//! with [`Marks`], flip one mark over a range, and rebuild the spans in a
//! fixed nesting order. Block toggles restructure the block list and move
//! the selection's container path along with the block.

use std::ops::Range;

use bitflags::bitflags;
use mdbase_markdown::{
    Anchor, Block, CodeBlock, EditorSurface, Heading, Inline, List, ListItem, Node, NodePath,
    inline_text, normalize_inlines,
};

use super::{BlockFormat, InlineFormat};
use crate::types::RichSelection;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Marks: u8 {
        const STRONG = 1;
        const EMPHASIS = 1 << 1;
        const STRIKETHROUGH = 1 << 2;
        const UNDERLINE = 1 << 3;
        const SUBSCRIPT = 1 << 4;
        const SUPERSCRIPT = 1 << 5;
        const CODE = 1 << 6;
    }
}

impl From<InlineFormat> for Marks {
    fn from(format: InlineFormat) -> Self {
        match format {
            InlineFormat::Bold => Marks::STRONG,
            InlineFormat::Italic => Marks::EMPHASIS,
            InlineFormat::Strikethrough => Marks::STRIKETHROUGH,
            InlineFormat::Underline => Marks::UNDERLINE,
            InlineFormat::Code => Marks::CODE,
            InlineFormat::Subscript => Marks::SUBSCRIPT,
            InlineFormat::Superscript => Marks::SUPERSCRIPT,
        }
    }
}

/// Outermost first. Code is always innermost and handled at the leaves.
const NESTING: [(Marks, fn(Vec<Inline>) -> Inline); 6] = [
    (Marks::STRONG, Inline::Strong),
    (Marks::EMPHASIS, Inline::Emphasis),
    (Marks::STRIKETHROUGH, Inline::Strikethrough),
    (Marks::UNDERLINE, Inline::Underline),
    (Marks::SUBSCRIPT, Inline::Subscript),
    (Marks::SUPERSCRIPT, Inline::Superscript),
];

#[derive(Debug, Clone)]
enum Run {
    Text { text: String, marks: Marks },
    /// Links, images, breaks, footnote refs and inline HTML move as a unit.
    Atom { inline: Inline, marks: Marks, len: usize },
}

impl Run {
    fn marks(&self) -> Marks {
        match self {
            Run::Text { marks, .. } | Run::Atom { marks, .. } => *marks,
        }
    }

    fn marks_mut(&mut self) -> &mut Marks {
        match self {
            Run::Text { marks, .. } | Run::Atom { marks, .. } => marks,
        }
    }

    fn len(&self) -> usize {
        match self {
            Run::Text { text, .. } => text.chars().count(),
            Run::Atom { len, .. } => *len,
        }
    }
}

fn span_mark(inline: &Inline) -> Option<(Marks, &Vec<Inline>)> {
    match inline {
        Inline::Strong(c) => Some((Marks::STRONG, c)),
        Inline::Emphasis(c) => Some((Marks::EMPHASIS, c)),
        Inline::Strikethrough(c) => Some((Marks::STRIKETHROUGH, c)),
        Inline::Underline(c) => Some((Marks::UNDERLINE, c)),
        Inline::Subscript(c) => Some((Marks::SUBSCRIPT, c)),
        Inline::Superscript(c) => Some((Marks::SUPERSCRIPT, c)),
        _ => None,
    }
}

fn flatten(inlines: &[Inline], marks: Marks, out: &mut Vec<Run>) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push(Run::Text {
                text: text.clone(),
                marks,
            }),
            Inline::Code(text) => out.push(Run::Text {
                text: text.clone(),
                marks: marks | Marks::CODE,
            }),
            other => match span_mark(other) {
                Some((mark, children)) => flatten(children, marks | mark, out),
                None => {
                    let mut text = String::new();
                    other.push_plain_text(&mut text);
                    out.push(Run::Atom {
                        inline: other.clone(),
                        marks,
                        len: text.chars().count(),
                    });
                }
            },
        }
    }
}

fn runs_of(inlines: &[Inline]) -> Vec<Run> {
    let mut runs = Vec::new();
    flatten(inlines, Marks::empty(), &mut runs);
    runs
}

fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
}

/// Split the text run straddling `offset` so a run boundary falls on it.
fn split_runs(runs: &mut Vec<Run>, offset: usize) {
    let mut pos = 0;
    for i in 0..runs.len() {
        let len = runs[i].len();
        if offset > pos && offset < pos + len {
            if let Run::Text { text, marks } = &mut runs[i] {
                let at = byte_index(text, offset - pos);
                let tail = Run::Text {
                    text: text.split_off(at),
                    marks: *marks,
                };
                runs.insert(i + 1, tail);
            }
            return;
        }
        pos += len;
    }
}

/// Start offset of every run.
fn positions(runs: &[Run]) -> Vec<usize> {
    let mut pos = 0;
    runs.iter()
        .map(|run| {
            let start = pos;
            pos += run.len();
            start
        })
        .collect()
}

/// Index of the run the caret at `offset` belongs to. A caret on a boundary
/// belongs to the run before it.
fn run_at(runs: &[Run], offset: usize) -> Option<usize> {
    let starts = positions(runs);
    runs.iter().enumerate().position(|(i, run)| {
        let pos = starts[i];
        (pos < offset && offset <= pos + run.len()) || (offset == 0 && pos == 0 && run.len() > 0)
    })
}

fn rebuild(runs: &[Run], depth: usize) -> Vec<Inline> {
    let Some(&(mark, wrap)) = NESTING.get(depth) else {
        return leaves(runs);
    };
    let mut out = Vec::new();
    for chunk in runs.chunk_by(|a, b| a.marks().contains(mark) == b.marks().contains(mark)) {
        let inner = rebuild(chunk, depth + 1);
        if chunk[0].marks().contains(mark) {
            out.push(wrap(inner));
        } else {
            out.extend(inner);
        }
    }
    out
}

fn leaves(runs: &[Run]) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(runs.len());
    for run in runs {
        match run {
            Run::Text { text, marks } if marks.contains(Marks::CODE) => match out.last_mut() {
                Some(Inline::Code(prev)) => prev.push_str(text),
                _ => out.push(Inline::Code(text.clone())),
            },
            Run::Text { text, .. } => out.push(Inline::Text(text.clone())),
            Run::Atom { inline, .. } => out.push(inline.clone()),
        }
    }
    out
}

/// Add `mark` over `range` (char offsets into the visible text), or remove
/// it when every text run in the range already carries it.
///
/// Returns false when the range covers nothing.
pub fn toggle_mark(inlines: &mut Vec<Inline>, range: Range<usize>, mark: Marks) -> bool {
    if range.is_empty() {
        return false;
    }
    let mut runs = runs_of(inlines);
    split_runs(&mut runs, range.start);
    split_runs(&mut runs, range.end);

    let starts = positions(&runs);
    let selected: Vec<usize> = (0..runs.len())
        .filter(|&i| {
            let (pos, len) = (starts[i], runs[i].len());
            pos >= range.start && pos + len <= range.end && (len > 0 || pos < range.end)
        })
        .collect();
    if selected.is_empty() {
        return false;
    }

    let mut texts = selected
        .iter()
        .filter(|&&i| matches!(runs[i], Run::Text { .. }))
        .peekable();
    let active = texts.peek().is_some() && texts.all(|&i| runs[i].marks().contains(mark));
    for &i in &selected {
        runs[i].marks_mut().set(mark, !active);
    }

    *inlines = rebuild(&runs, 0);
    normalize_inlines(inlines);
    true
}

/// Whether `mark` applies at a caret, or across every text run of a range.
pub fn mark_active(inlines: &[Inline], range: Range<usize>, mark: Marks) -> bool {
    let runs = runs_of(inlines);
    if range.is_empty() {
        return run_at(&runs, range.start).is_some_and(|i| runs[i].marks().contains(mark));
    }
    let starts = positions(&runs);
    let mut overlapping = runs
        .iter()
        .enumerate()
        .filter(|(i, run)| {
            matches!(run, Run::Text { .. })
                && starts[*i] < range.end
                && starts[*i] + run.len() > range.start
        })
        .peekable();
    overlapping.peek().is_some() && overlapping.all(|(_, run)| run.marks().contains(mark))
}

/// Range of the contiguous runs carrying `mark` around a caret.
pub fn marked_extent(inlines: &[Inline], offset: usize, mark: Marks) -> Option<Range<usize>> {
    let runs = runs_of(inlines);
    let at = run_at(&runs, offset)?;
    if !runs[at].marks().contains(mark) {
        return None;
    }
    let mut first = at;
    while first > 0 && runs[first - 1].marks().contains(mark) {
        first -= 1;
    }
    let mut last = at;
    while last + 1 < runs.len() && runs[last + 1].marks().contains(mark) {
        last += 1;
    }
    let starts = positions(&runs);
    Some(starts[first]..starts[last] + runs[last].len())
}

/// Toggle an inline format on the selection.
///
/// A collapsed caret inside formatted text removes the format from the
/// whole formatted stretch; a collapsed caret elsewhere does nothing.
pub fn toggle_inline(surface: &mut EditorSurface, sel: &RichSelection, mark: Marks) -> bool {
    let Some(inlines) = surface.inlines_mut(&sel.container) else {
        return false;
    };
    let range = if sel.is_collapsed() {
        match marked_extent(inlines, sel.start, mark) {
            Some(range) => range,
            None => return false,
        }
    } else {
        sel.to_range()
    };
    toggle_mark(inlines, range, mark)
}

pub fn inline_active(surface: &EditorSurface, sel: &RichSelection, mark: Marks) -> bool {
    surface
        .inlines(&sel.container)
        .is_some_and(|inlines| mark_active(inlines, sel.to_range(), mark))
}

/// Bold state at the selection start: true inside any strong span, false
/// once the walk up the tree reaches a heading.
pub fn is_bold_active(surface: &EditorSurface, sel: &RichSelection) -> bool {
    let Some((leaf, _)) = leaf_at(surface, &sel.container, sel.start) else {
        return false;
    };
    for node in surface.ancestors(&leaf).into_iter().rev() {
        match node {
            Node::Inline(Inline::Strong(_)) => return true,
            Node::Block(Block::Heading(_)) => return false,
            _ => {}
        }
    }
    false
}

/// The text leaf holding a caret and the caret's offset inside it.
///
/// For a code block container the block itself is the leaf.
pub fn leaf_at(
    surface: &EditorSurface,
    container: &NodePath,
    offset: usize,
) -> Option<(NodePath, usize)> {
    if let Some(Block::CodeBlock(code)) = surface.block(container) {
        return Some((container.clone(), offset.min(code.code.chars().count())));
    }
    let inlines = surface.inlines(container)?;
    let mut pos = 0;
    find_leaf(inlines, container, offset, &mut pos)
}

fn find_leaf(
    inlines: &[Inline],
    path: &NodePath,
    offset: usize,
    pos: &mut usize,
) -> Option<(NodePath, usize)> {
    for (i, inline) in inlines.iter().enumerate() {
        match inline {
            Inline::Text(text) | Inline::Code(text) => {
                let len = text.chars().count();
                if (*pos < offset && offset <= *pos + len) || (offset == 0 && *pos == 0) {
                    return Some((path.child(i), offset - *pos));
                }
                *pos += len;
            }
            Inline::SoftBreak | Inline::HardBreak => *pos += 1,
            other => {
                if let Some(children) = other.children()
                    && let Some(found) = find_leaf(children, &path.child(i), offset, pos)
                {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Insert plain text at the selection start and move the caret after it.
pub fn insert_text(surface: &mut EditorSurface, sel: &mut RichSelection, text: &str) -> bool {
    match leaf_at(surface, &sel.container, sel.start) {
        Some((leaf, local)) => {
            let Some(slot) = surface.text_slot_mut(&leaf) else {
                return false;
            };
            let at = byte_index(slot, local);
            slot.insert_str(at, text);
        }
        None => {
            let Some(inlines) = surface.inlines_mut(&sel.container) else {
                return false;
            };
            inlines.push(Inline::text(text));
        }
    }
    *sel = RichSelection::caret(sel.container.clone(), sel.start + text.chars().count());
    true
}

/// Path of the nearest block at or above `path` matching `pred`.
fn enclosing(
    surface: &EditorSurface,
    path: &NodePath,
    pred: impl Fn(&Block) -> bool,
) -> Option<NodePath> {
    surface
        .ancestors(path)
        .iter()
        .enumerate()
        .rev()
        .find_map(|(depth, node)| match *node {
            Node::Block(block) if pred(block) => {
                Some(NodePath::from(path.indices()[..=depth].to_vec()))
            }
            _ => None,
        })
}

fn nearest_list<'a>(surface: &'a EditorSurface, path: &NodePath) -> Option<&'a List> {
    let list_path = enclosing(surface, path, |b| matches!(b, Block::List(_)))?;
    match surface.block(&list_path)? {
        Block::List(list) => Some(list),
        _ => None,
    }
}

pub fn block_active(surface: &EditorSurface, sel: &RichSelection, format: BlockFormat) -> bool {
    let block = surface.block(&sel.container);
    match format {
        BlockFormat::Paragraph => matches!(block, Some(Block::Paragraph(_))),
        BlockFormat::Heading(level) => {
            matches!(block, Some(Block::Heading(h)) if h.level == level)
        }
        BlockFormat::CodeBlock => matches!(block, Some(Block::CodeBlock(_))),
        BlockFormat::BlockQuote => {
            enclosing(surface, &sel.container, |b| matches!(b, Block::BlockQuote(_))).is_some()
        }
        BlockFormat::BulletList => {
            nearest_list(surface, &sel.container).is_some_and(|list| !list.is_ordered())
        }
        BlockFormat::OrderedList => {
            nearest_list(surface, &sel.container).is_some_and(List::is_ordered)
        }
    }
}

/// Apply a block format to the selection's block, or take it off when it
/// is already applied. The selection follows the block.
pub fn toggle_block(surface: &mut EditorSurface, sel: &mut RichSelection, format: BlockFormat) -> bool {
    let done = match format {
        BlockFormat::Heading(level) => toggle_heading(surface, sel, level),
        BlockFormat::Paragraph => to_paragraph(surface, sel),
        BlockFormat::CodeBlock => toggle_code_block(surface, sel),
        BlockFormat::BlockQuote => toggle_quote(surface, sel),
        BlockFormat::BulletList => toggle_list(surface, sel, None),
        BlockFormat::OrderedList => toggle_list(surface, sel, Some(1)),
    };
    done.is_some()
}

fn toggle_heading(surface: &mut EditorSurface, sel: &RichSelection, level: u8) -> Option<()> {
    let level = level.clamp(1, 6);
    let block = surface.block_mut(&sel.container)?;
    let replacement = match block {
        Block::Heading(heading) if heading.level == level => {
            Block::Paragraph(std::mem::take(&mut heading.content))
        }
        Block::Heading(heading) => {
            heading.level = level;
            return Some(());
        }
        Block::Paragraph(inlines) => {
            let content = std::mem::take(inlines);
            Block::Heading(Heading {
                level,
                anchor: Anchor::derived(&inline_text(&content)),
                content,
            })
        }
        _ => return None,
    };
    *block = replacement;
    Some(())
}

fn to_paragraph(surface: &mut EditorSurface, sel: &mut RichSelection) -> Option<()> {
    match surface.block(&sel.container)? {
        Block::Heading(heading) => {
            let level = heading.level;
            toggle_heading(surface, sel, level)
        }
        Block::CodeBlock(_) => code_to_paragraphs(surface, sel),
        _ => None,
    }
}

fn toggle_code_block(surface: &mut EditorSurface, sel: &mut RichSelection) -> Option<()> {
    if let Block::CodeBlock(_) = surface.block(&sel.container)? {
        return code_to_paragraphs(surface, sel);
    }
    let block = surface.block_mut(&sel.container)?;
    let code = match block {
        Block::Paragraph(inlines) => inline_text(inlines),
        Block::Heading(heading) => inline_text(&heading.content),
        _ => return None,
    };
    *block = Block::CodeBlock(CodeBlock::new("", code));
    Some(())
}

/// One paragraph per non-empty line.
fn code_to_paragraphs(surface: &mut EditorSurface, sel: &mut RichSelection) -> Option<()> {
    let Block::CodeBlock(code) = surface.block(&sel.container)? else {
        return None;
    };
    let mut paragraphs: Vec<Block> = code
        .code
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Block::Paragraph(vec![Inline::text(line)]))
        .collect();
    if paragraphs.is_empty() {
        paragraphs.push(Block::Paragraph(Vec::new()));
    }
    let first_len = match &paragraphs[0] {
        Block::Paragraph(inlines) => inline_text(inlines).chars().count(),
        _ => 0,
    };

    let index = sel.container.last()?;
    let siblings = surface.sibling_blocks_mut(&sel.container)?;
    siblings.splice(index..=index, paragraphs);
    *sel = RichSelection::caret(sel.container.clone(), sel.start.min(first_len));
    Some(())
}

fn toggle_quote(surface: &mut EditorSurface, sel: &mut RichSelection) -> Option<()> {
    if let Some(quote) = enclosing(surface, &sel.container, |b| matches!(b, Block::BlockQuote(_))) {
        let index = quote.last()?;
        let siblings = surface.sibling_blocks_mut(&quote)?;
        let children = match &mut siblings[index] {
            Block::BlockQuote(children) => std::mem::take(children),
            _ => return None,
        };
        siblings.splice(index..=index, children);

        let (&child, tail) = sel.container.indices()[quote.len()..].split_first()?;
        sel.container = quote.parent()?.child(index + child).join(tail);
        return Some(());
    }

    let index = sel.container.last()?;
    let siblings = surface.sibling_blocks_mut(&sel.container)?;
    if index >= siblings.len() {
        return None;
    }
    let block = siblings.remove(index);
    siblings.insert(index, Block::BlockQuote(vec![block]));
    sel.container = sel.container.child(0);
    Some(())
}

fn toggle_list(surface: &mut EditorSurface, sel: &mut RichSelection, start: Option<u64>) -> Option<()> {
    if let Some(list_path) = enclosing(surface, &sel.container, |b| matches!(b, Block::List(_))) {
        let Block::List(list) = surface.block_mut(&list_path)? else {
            return None;
        };
        if list.is_ordered() != start.is_some() {
            list.start = start;
            return Some(());
        }

        let indices = sel.container.indices().to_vec();
        let depth = list_path.len();
        let (item, block) = (*indices.get(depth)?, *indices.get(depth + 1)?);
        let before: usize = list.items.get(..item)?.iter().map(|i| i.blocks.len()).sum();
        let blocks: Vec<Block> = std::mem::take(&mut list.items)
            .into_iter()
            .flat_map(|i| i.blocks)
            .collect();

        let index = list_path.last()?;
        let siblings = surface.sibling_blocks_mut(&list_path)?;
        siblings.splice(index..=index, blocks);
        sel.container = list_path
            .parent()?
            .child(index + before + block)
            .join(&indices[depth + 2..]);
        return Some(());
    }

    let index = sel.container.last()?;
    let siblings = surface.sibling_blocks_mut(&sel.container)?;
    if index >= siblings.len() {
        return None;
    }
    let block = siblings.remove(index);
    siblings.insert(
        index,
        Block::List(List {
            start,
            tight: true,
            items: vec![ListItem {
                checked: None,
                blocks: vec![block],
            }],
        }),
    );
    sel.container = sel.container.child(0).child(0);
    Some(())
}

/// Set a code block's language. Blank input and `text` both clear it, and
/// the block renders as `text` again.
pub fn set_code_language(surface: &mut EditorSurface, path: &NodePath, lang: &str) -> bool {
    let Some(Block::CodeBlock(code)) = surface.block_mut(path) else {
        return false;
    };
    let lang = match lang.trim() {
        "text" => "",
        lang => lang,
    };
    code.lang = lang.into();
    true
}

/// Flip a task item's checkbox. Returns the new state, or `None` when the
/// path is not a task item.
pub fn toggle_task(surface: &mut EditorSurface, item: &NodePath) -> Option<bool> {
    let item = surface.list_item_mut(item)?;
    let checked = !item.checked?;
    item.checked = Some(checked);
    Some(checked)
}

/// Insert blocks after the block holding the selection, or at the end of
/// the document when there is none.
pub fn insert_blocks(surface: &mut EditorSurface, sel: &RichSelection, blocks: Vec<Block>) -> bool {
    let anchor = enclosing(surface, &sel.container, |_| true);
    match anchor {
        Some(path) => {
            let Some(index) = path.last() else {
                return false;
            };
            let Some(siblings) = surface.sibling_blocks_mut(&path) else {
                return false;
            };
            siblings.splice(index + 1..index + 1, blocks);
        }
        None => surface.blocks.extend(blocks),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdbase_markdown::{parse_markdown, to_markdown};

    fn sel(path: &[usize], start: usize, end: usize) -> RichSelection {
        RichSelection::new(NodePath::from(path.to_vec()), start, end)
    }

    #[test]
    fn bold_toggles_on_and_off() {
        let mut surface = parse_markdown("hello world");
        let selection = sel(&[0], 0, 5);
        assert!(toggle_inline(&mut surface, &selection, Marks::STRONG));
        assert_eq!(to_markdown(&surface), "**hello** world");
        assert!(inline_active(&surface, &selection, Marks::STRONG));

        assert!(toggle_inline(&mut surface, &selection, Marks::STRONG));
        assert_eq!(to_markdown(&surface), "hello world");
        assert_eq!(surface, parse_markdown("hello world"));
    }

    #[test]
    fn partial_overlap_extends_mark() {
        let mut surface = parse_markdown("**ab**cd");
        assert!(!inline_active(&surface, &sel(&[0], 1, 3), Marks::STRONG));
        toggle_inline(&mut surface, &sel(&[0], 1, 3), Marks::STRONG);
        assert_eq!(to_markdown(&surface), "**abc**d");
    }

    #[test]
    fn marks_nest_in_fixed_order() {
        let mut surface = parse_markdown("**bold**");
        toggle_inline(&mut surface, &sel(&[0], 0, 4), Marks::EMPHASIS);
        assert_eq!(
            surface.blocks[0],
            Block::Paragraph(vec![Inline::Strong(vec![Inline::Emphasis(vec![
                Inline::text("bold")
            ])])])
        );
    }

    #[test]
    fn collapsed_caret_unwraps_code() {
        let mut surface = parse_markdown("use `cargo` now");
        assert!(inline_active(&surface, &sel(&[0], 6, 6), Marks::CODE));
        assert!(toggle_inline(&mut surface, &sel(&[0], 6, 6), Marks::CODE));
        assert_eq!(to_markdown(&surface), "use cargo now");
        assert!(!toggle_inline(&mut surface, &sel(&[0], 2, 2), Marks::CODE));
    }

    #[test]
    fn links_survive_toggles() {
        let mut surface = parse_markdown("see [docs](https://example.com) now");
        toggle_inline(&mut surface, &sel(&[0], 0, 8), Marks::STRONG);
        assert_eq!(
            to_markdown(&surface),
            "**see [docs](https://example.com)** now"
        );
    }

    #[test]
    fn bold_state_stops_at_headings() {
        let surface = parse_markdown("# **Bold** title\n\nplain **x**");
        assert!(is_bold_active(&surface, &sel(&[0], 2, 2)));
        assert!(!is_bold_active(&surface, &sel(&[0], 7, 7)));
        assert!(is_bold_active(&surface, &sel(&[1], 7, 7)));
        assert!(!is_bold_active(&surface, &sel(&[1], 3, 3)));
    }

    #[test]
    fn heading_toggle_returns_to_paragraph() {
        let mut surface = parse_markdown("Title");
        let mut selection = sel(&[0], 0, 0);
        assert!(toggle_block(&mut surface, &mut selection, BlockFormat::Heading(2)));
        assert!(block_active(&surface, &selection, BlockFormat::Heading(2)));
        assert_eq!(to_markdown(&surface), "## Title");
        assert!(toggle_block(&mut surface, &mut selection, BlockFormat::Heading(2)));
        assert!(block_active(&surface, &selection, BlockFormat::Paragraph));
        assert_eq!(to_markdown(&surface), "Title");
    }

    #[test]
    fn code_block_off_splits_lines() {
        let mut surface = parse_markdown("intro\n\n```\nfirst\n\nsecond\n```");
        let mut selection = sel(&[1], 3, 3);
        assert!(block_active(&surface, &selection, BlockFormat::CodeBlock));
        assert!(toggle_block(&mut surface, &mut selection, BlockFormat::CodeBlock));
        assert_eq!(to_markdown(&surface), "intro\n\nfirst\n\nsecond");
        assert_eq!(selection, sel(&[1], 3, 3));
    }

    #[test]
    fn quote_wraps_and_unwraps() {
        let mut surface = parse_markdown("one\n\ntwo");
        let mut selection = sel(&[1], 1, 1);
        assert!(toggle_block(&mut surface, &mut selection, BlockFormat::BlockQuote));
        assert_eq!(to_markdown(&surface), "one\n\n> two");
        assert_eq!(selection.container, NodePath::from(vec![1, 0]));
        assert!(block_active(&surface, &selection, BlockFormat::BlockQuote));

        assert!(toggle_block(&mut surface, &mut selection, BlockFormat::BlockQuote));
        assert_eq!(to_markdown(&surface), "one\n\ntwo");
        assert_eq!(selection.container, NodePath::from(vec![1]));
    }

    #[test]
    fn list_wraps_flips_and_unwraps() {
        let mut surface = parse_markdown("item");
        let mut selection = sel(&[0], 0, 0);
        toggle_block(&mut surface, &mut selection, BlockFormat::BulletList);
        assert_eq!(to_markdown(&surface), "- item");
        assert_eq!(selection.container, NodePath::from(vec![0, 0, 0]));

        toggle_block(&mut surface, &mut selection, BlockFormat::OrderedList);
        assert!(block_active(&surface, &selection, BlockFormat::OrderedList));
        assert_eq!(to_markdown(&surface), "1. item");

        toggle_block(&mut surface, &mut selection, BlockFormat::OrderedList);
        assert_eq!(to_markdown(&surface), "item");
        assert_eq!(selection.container, NodePath::from(vec![0]));
    }

    #[test]
    fn stale_container_is_left_alone() {
        let mut surface = parse_markdown("one");
        let before = surface.clone();
        for format in [BlockFormat::BlockQuote, BlockFormat::BulletList, BlockFormat::OrderedList] {
            let mut selection = sel(&[2], 0, 0);
            assert!(!toggle_block(&mut surface, &mut selection, format));
            assert_eq!(selection.container, NodePath::from(vec![2]));
        }
        assert_eq!(surface, before);

        let mut surface = parse_markdown("- a");
        let before = surface.clone();
        let mut selection = sel(&[0, 3, 0], 0, 0);
        assert!(!toggle_block(&mut surface, &mut selection, BlockFormat::BulletList));
        assert_eq!(surface, before);
    }

    #[test]
    fn code_language_blank_clears_tag() {
        let mut surface = parse_markdown("```\nx\n```");
        let path = NodePath::from(vec![0]);
        assert!(set_code_language(&mut surface, &path, "  rust "));
        assert_eq!(to_markdown(&surface), "```rust\nx\n```");
        assert!(set_code_language(&mut surface, &path, "   "));
        assert_eq!(to_markdown(&surface), "```\nx\n```");
        assert!(!set_code_language(&mut surface, &NodePath::from(vec![1]), "rust"));
    }

    #[test]
    fn task_checkbox_flips() {
        let mut surface = parse_markdown("- [ ] ship\n- plain");
        assert_eq!(toggle_task(&mut surface, &NodePath::from(vec![0, 0])), Some(true));
        assert_eq!(to_markdown(&surface), "- [x] ship\n- plain");
        assert_eq!(toggle_task(&mut surface, &NodePath::from(vec![0, 1])), None);
    }

    #[test]
    fn text_insertion_moves_caret() {
        let mut surface = parse_markdown("ab **cd**");
        let mut selection = sel(&[0], 4, 4);
        assert!(insert_text(&mut surface, &mut selection, "🎉"));
        assert_eq!(to_markdown(&surface), "ab **c🎉d**");
        assert_eq!(selection, sel(&[0], 5, 5));
    }

    #[test]
    fn blocks_insert_after_current() {
        let mut surface = parse_markdown("one\n\ntwo");
        insert_blocks(&mut surface, &sel(&[0], 0, 0), vec![Block::Rule]);
        assert_eq!(surface.blocks[1], Block::Rule);
        assert_eq!(surface.blocks.len(), 3);
    }
}
