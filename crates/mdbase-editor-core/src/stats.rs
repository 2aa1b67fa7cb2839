//! Word count, reading time and heading outline.

use mdbase_markdown::{Block, EditorSurface, Node, NodePath, inline_text};
use smol_str::SmolStr;

pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStats {
    pub words: usize,
    pub reading_minutes: usize,
}

impl DocumentStats {
    /// Counts whitespace-separated tokens; reading time rounds up.
    pub fn from_text(text: &str, words_per_minute: u32) -> Self {
        let words = text.split_whitespace().count();
        let wpm = words_per_minute.max(1) as usize;
        Self {
            words,
            reading_minutes: words.div_ceil(wpm),
        }
    }

    pub fn of(surface: &EditorSurface, words_per_minute: u32) -> Self {
        Self::from_text(&surface.plain_text(), words_per_minute)
    }
}

/// One heading in the outline panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: u8,
    pub text: String,
    /// Scroll target in the rendered editor.
    pub anchor: SmolStr,
    /// Where the heading lives in the tree.
    pub path: NodePath,
}

const MISSING_HEADING: &str = "Missing heading";

/// Level 1 to 3 headings in document order, nested ones included.
pub fn outline(surface: &EditorSurface) -> Vec<OutlineEntry> {
    let mut entries = Vec::new();
    surface.walk(&mut |path, node| {
        if let Node::Block(Block::Heading(heading)) = node
            && heading.level <= 3
        {
            let text = inline_text(&heading.content);
            let text = if text.is_empty() {
                MISSING_HEADING.to_string()
            } else {
                text
            };
            entries.push(OutlineEntry {
                level: heading.level,
                text,
                anchor: heading.anchor.id.clone(),
                path: path.clone(),
            });
        }
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdbase_markdown::parse_markdown;

    #[test]
    fn counts_words_and_minutes() {
        let stats = DocumentStats::from_text("one two three", DEFAULT_WORDS_PER_MINUTE);
        assert_eq!(stats, DocumentStats { words: 3, reading_minutes: 1 });

        let stats = DocumentStats::from_text("  \n\t ", DEFAULT_WORDS_PER_MINUTE);
        assert_eq!(stats.words, 0);
        assert_eq!(stats.reading_minutes, 0);

        let long = "word ".repeat(401);
        assert_eq!(DocumentStats::from_text(&long, 200).reading_minutes, 3);
    }

    #[test]
    fn outline_keeps_top_three_levels() {
        let surface = parse_markdown("# One\n\n#### Deep\n\n> ## Quoted {#q}\n\n###\n");
        let entries = outline(&surface);
        let summary: Vec<_> = entries
            .iter()
            .map(|e| (e.level, e.text.as_str(), e.anchor.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![(1, "One", "one"), (2, "Quoted", "q"), (3, "Missing heading", "")]
        );
        assert_eq!(entries[1].path, NodePath::from(vec![2, 0]));
    }
}
