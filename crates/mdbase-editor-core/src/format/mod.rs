//! Formatting state and toggles for both surfaces.
//!
//! [`source`] works on Markdown text with marker scans and wrap toggles;
//! [`rich`] works on the tree directly.

pub mod rich;
pub mod source;

/// Inline formatting that can be toggled on a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineFormat {
    Bold,
    Italic,
    Strikethrough,
    Underline,
    Code,
    Subscript,
    Superscript,
}

impl InlineFormat {
    /// Markers the source toolbar wraps a selection in.
    pub fn source_markers(self) -> (&'static str, &'static str) {
        match self {
            InlineFormat::Bold => ("**", "**"),
            InlineFormat::Italic => ("_", "_"),
            InlineFormat::Strikethrough => ("~~", "~~"),
            InlineFormat::Code => ("`", "`"),
            InlineFormat::Underline => ("<ins>", "</ins>"),
            InlineFormat::Subscript => ("<sub>", "</sub>"),
            InlineFormat::Superscript => ("<sup>", "</sup>"),
        }
    }
}

/// Block formatting applied to the block at the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFormat {
    Paragraph,
    Heading(u8),
    BlockQuote,
    CodeBlock,
    BulletList,
    OrderedList,
}

impl BlockFormat {
    /// Line prefix the source toolbar toggles, if this format has one.
    pub fn source_prefix(self) -> Option<&'static str> {
        match self {
            BlockFormat::Heading(1) => Some("# "),
            BlockFormat::Heading(2) => Some("## "),
            BlockFormat::Heading(3) => Some("### "),
            BlockFormat::Heading(4) => Some("#### "),
            BlockFormat::Heading(5) => Some("##### "),
            BlockFormat::Heading(6) => Some("###### "),
            BlockFormat::BlockQuote => Some("> "),
            BlockFormat::BulletList => Some("- "),
            BlockFormat::OrderedList => Some("1. "),
            _ => None,
        }
    }
}
