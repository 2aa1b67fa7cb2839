//! The Markdown source pane: a rope plus a selection.

use std::ops::Range;

use crate::text::{EditorRope, TextBuffer};
use crate::types::Selection;

#[derive(Debug, Clone, Default)]
pub struct SourceSurface {
    buffer: EditorRope,
    selection: Selection,
    /// Bumped whenever the whole buffer is overwritten.
    revision: u64,
}

impl SourceSurface {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: EditorRope::from_str(text),
            selection: Selection::default(),
            revision: 0,
        }
    }

    pub fn buffer(&self) -> &EditorRope {
        &self.buffer
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn caret(&self) -> usize {
        self.selection.head
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamped(self.buffer.len_chars());
    }

    pub fn set_caret(&mut self, offset: usize) {
        self.set_selection(Selection::collapsed(offset));
    }

    /// How many times the buffer has been overwritten wholesale. Each
    /// overwrite moves the caret, so hosts use this to detect caret resets.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn selected_text(&self) -> String {
        self.buffer
            .slice(self.selection.to_range())
            .map(|s| s.to_string())
            .unwrap_or_default()
    }

    /// Overwrite the whole buffer, keeping the caret where it still fits.
    pub fn set_text(&mut self, text: &str) {
        self.buffer = EditorRope::from_str(text);
        self.selection = self.selection.clamped(self.buffer.len_chars());
        self.revision += 1;
    }

    /// Replace a char range without touching the selection.
    pub fn replace(&mut self, range: Range<usize>, text: &str) {
        self.buffer.replace(range, text);
        self.selection = self.selection.clamped(self.buffer.len_chars());
    }

    /// Replace the selection with `text` and put the caret after it.
    pub fn insert_at_selection(&mut self, text: &str) {
        let range = self.selection.to_range();
        let start = range.start;
        self.buffer.replace(range, text);
        self.set_caret(start + text.chars().count());
    }

    pub fn slice(&self, range: Range<usize>) -> String {
        self.buffer
            .slice(range)
            .map(|s| s.to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_text_clamps_and_counts() {
        let mut source = SourceSurface::new("hello world");
        source.set_selection(Selection::new(6, 11));
        source.set_text("hi");
        assert_eq!(source.selection(), Selection::new(2, 2));
        assert_eq!(source.revision(), 1);
    }

    #[test]
    fn insert_replaces_selection() {
        let mut source = SourceSurface::new("a b c");
        source.set_selection(Selection::new(2, 3));
        source.insert_at_selection("🚀🚀");
        assert_eq!(source.text(), "a 🚀🚀 c");
        assert_eq!(source.caret(), 4);
        assert_eq!(source.revision(), 0);
    }
}
