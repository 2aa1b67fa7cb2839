//! Selection types shared by both surfaces.

use std::ops::Range;

use mdbase_markdown::NodePath;

/// A selection in the source pane, in char offsets.
///
/// `anchor` stays where the selection began and `head` follows the caret,
/// so either may be the smaller one.
#[derive(Clone, Debug, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn collapsed(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// Both ends pulled back to at most `len`.
    pub fn clamped(self, len: usize) -> Self {
        Self::new(self.anchor.min(len), self.head.min(len))
    }
}

/// A selection inside the rich-text tree.
///
/// `container` addresses the node owning the selected text: a paragraph,
/// heading, table cell, footnote definition or code block. `start` and `end`
/// are char offsets into that node's visible text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RichSelection {
    pub container: NodePath,
    pub start: usize,
    pub end: usize,
}

impl RichSelection {
    pub fn new(container: NodePath, start: usize, end: usize) -> Self {
        Self {
            container,
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn caret(container: NodePath, offset: usize) -> Self {
        Self::new(container, offset, offset)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backwards_selection_orders_range() {
        let sel = Selection::new(10, 5);
        assert_eq!(sel.to_range(), 5..10);
        assert_eq!(sel.clamped(7), Selection::new(7, 5));
        assert!(Selection::collapsed(3).is_collapsed());
    }

    #[test]
    fn rich_selection_orders_bounds() {
        let sel = RichSelection::new(NodePath::from(vec![0]), 4, 1);
        assert_eq!(sel.to_range(), 1..4);
        assert!(!sel.is_collapsed());
    }
}
