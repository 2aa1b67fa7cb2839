//! Rope storage behind the Markdown source pane.

use smol_str::{SmolStr, ToSmolStr};
use std::ops::Range;

/// Editable text addressed by char offset.
///
/// Offsets count Unicode scalar values. Out-of-range edits are clamped;
/// out-of-range reads return `None`.
pub trait TextBuffer {
    fn len_chars(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    fn insert(&mut self, char_offset: usize, text: &str);

    fn delete(&mut self, char_range: Range<usize>);

    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.delete(char_range.clone());
        self.insert(char_range.start, text);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    fn char_at(&self, char_offset: usize) -> Option<char>;

    fn to_string(&self) -> String;
}

#[derive(Clone, Debug, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }
}

impl TextBuffer for EditorRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset.min(self.rope.len_chars()), text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        let len = self.rope.len_chars();
        let range = char_range.start.min(len)..char_range.end.min(len);
        if !range.is_empty() {
            self.rope.remove(range);
        }
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.end > self.len_chars() || char_range.start > char_range.end {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn char_at(&self, char_offset: usize) -> Option<char> {
        (char_offset < self.len_chars()).then(|| self.rope.char(char_offset))
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_clamp_to_buffer() {
        let mut rope = EditorRope::from_str("fence");
        rope.insert(99, "```");
        assert_eq!(rope.to_string(), "fence```");
        rope.delete(5..42);
        assert_eq!(rope.to_string(), "fence");
        rope.replace(0..0, "> ");
        assert_eq!(rope.to_string(), "> fence");
    }

    #[test]
    fn reads_count_chars() {
        let rope = EditorRope::from_str("go 🚀 now");
        assert_eq!(rope.len_chars(), 8);
        assert_eq!(rope.char_at(3), Some('🚀'));
        assert_eq!(rope.slice(3..4).as_deref(), Some("🚀"));
        assert_eq!(rope.slice(4..99), None);
        assert_eq!(rope.char_at(8), None);
        assert!(EditorRope::default().is_empty());
    }
}
