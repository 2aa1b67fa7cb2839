//! Toolbar commands, dispatched to whichever surface has focus.
//!
//! `execute_command` applies a command and then runs the matching sync
//! direction on the engine. It returns true if anything changed.

use mdbase_markdown::{AlertKind, NodePath, parse_markdown};

use crate::format::rich::{self, Marks};
use crate::format::source::{self as src, FenceOutcome};
use crate::format::{BlockFormat, InlineFormat};
use crate::sync::SyncEngine;
use crate::types::RichSelection;

/// Where toolbar commands go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Focus {
    Editor(RichSelection),
    Source,
}

/// Canned content the insert menu offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snippet {
    Table,
    TaskList,
    Image { alt: String, url: String },
    Rule,
    Quote,
    Alert(AlertKind),
    Emoji(String),
}

impl Snippet {
    /// Markdown inserted into the source pane.
    pub fn markdown(&self) -> String {
        match self {
            Snippet::Table => {
                "\n| Header 1 | Header 2 |\n| --- | --- |\n| Cell 1 | Cell 2 |\n".to_string()
            }
            Snippet::TaskList => "\n- [ ] Task 1\n- [ ] Task 2\n".to_string(),
            Snippet::Image { alt, url } => format!("\n![{alt}]({url})\n"),
            Snippet::Rule => "\n---\n\n".to_string(),
            Snippet::Quote => "\n> Quote here\n".to_string(),
            Snippet::Alert(kind) => {
                format!("\n> [!{}]\n> Write your text here\n", kind.marker())
            }
            Snippet::Emoji(emoji) => emoji.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    ToggleInline(InlineFormat),
    ToggleBlock(BlockFormat),
    /// From the language dialog of a code block.
    SetCodeLanguage { block: NodePath, lang: String },
    /// A task checkbox was clicked.
    ToggleTask { item: NodePath },
    Insert(Snippet),
}

/// Apply a command and propagate the result to the other surface.
pub fn execute_command(engine: &mut SyncEngine, focus: &mut Focus, command: &EditorCommand) -> bool {
    let changed = match (command, &mut *focus) {
        (EditorCommand::SetCodeLanguage { block, lang }, _) => {
            rich::set_code_language(engine.editor_mut(), block, lang)
        }
        (EditorCommand::ToggleTask { item }, _) => {
            rich::toggle_task(engine.editor_mut(), item).is_some()
        }
        (command, Focus::Editor(sel)) => execute_rich(engine, sel, command),
        (command, Focus::Source) => {
            let changed = execute_source(engine, command);
            if changed {
                engine.on_source_changed();
            }
            return changed;
        }
    };
    if changed {
        engine.on_editor_changed();
    } else {
        tracing::trace!(?command, "command changed nothing");
    }
    changed
}

fn execute_rich(engine: &mut SyncEngine, sel: &mut RichSelection, command: &EditorCommand) -> bool {
    let surface = engine.editor_mut();
    match command {
        EditorCommand::ToggleInline(format) => rich::toggle_inline(surface, sel, Marks::from(*format)),
        EditorCommand::ToggleBlock(format) => rich::toggle_block(surface, sel, *format),
        EditorCommand::Insert(Snippet::Emoji(emoji)) => rich::insert_text(surface, sel, emoji),
        EditorCommand::Insert(snippet) => {
            let blocks = parse_markdown(&snippet.markdown()).blocks;
            rich::insert_blocks(surface, sel, blocks)
        }
        EditorCommand::SetCodeLanguage { .. } | EditorCommand::ToggleTask { .. } => false,
    }
}

fn execute_source(engine: &mut SyncEngine, command: &EditorCommand) -> bool {
    let source = engine.source_mut();
    match command {
        EditorCommand::ToggleInline(InlineFormat::Subscript) => {
            src::insert_tag(source, "sub", "x");
            true
        }
        EditorCommand::ToggleInline(InlineFormat::Superscript) => {
            src::insert_tag(source, "sup", "2");
            true
        }
        EditorCommand::ToggleInline(format) => {
            let (before, after) = format.source_markers();
            src::toggle_wrap(source, before, after);
            true
        }
        EditorCommand::ToggleBlock(BlockFormat::CodeBlock) => {
            src::toggle_code_fence(source) != FenceOutcome::Unchanged
        }
        EditorCommand::ToggleBlock(format) => match format.source_prefix() {
            Some(prefix) => {
                src::toggle_line_prefix(source, prefix);
                true
            }
            None => false,
        },
        EditorCommand::Insert(Snippet::Emoji(emoji)) => {
            src::insert_at_caret(source, emoji);
            true
        }
        EditorCommand::Insert(snippet) => {
            source.insert_at_selection(&snippet.markdown());
            true
        }
        EditorCommand::SetCodeLanguage { .. } | EditorCommand::ToggleTask { .. } => false,
    }
}

/// Toolbar highlight state for an inline format on the focused surface.
pub fn inline_active(engine: &SyncEngine, focus: &Focus, format: InlineFormat) -> bool {
    match focus {
        Focus::Editor(sel) if format == InlineFormat::Bold => {
            rich::is_bold_active(engine.editor(), sel)
        }
        Focus::Editor(sel) => rich::inline_active(engine.editor(), sel, Marks::from(format)),
        Focus::Source => match format.source_markers() {
            (open, close) if open == close => src::marker_active(engine.source(), open),
            (open, close) => src::tag_active(engine.source(), open, close),
        },
    }
}

/// Toolbar highlight state for a block format on the focused surface.
pub fn block_active(engine: &SyncEngine, focus: &Focus, format: BlockFormat) -> bool {
    match focus {
        Focus::Editor(sel) => rich::block_active(engine.editor(), sel, format),
        Focus::Source => match (format, format.source_prefix()) {
            (BlockFormat::CodeBlock, _) => src::inside_fence(engine.source()),
            (_, Some(prefix)) => src::line_prefix_active(engine.source(), prefix),
            (_, None) => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{SyncConfig, ViewState};
    use crate::types::Selection;
    use mdbase_markdown::{Block, Inline};

    fn engine(markdown: &str) -> SyncEngine {
        let mut engine = SyncEngine::new(SyncConfig::default(), ViewState::default());
        engine.replace_source_text(markdown);
        if let Some(ticket) = engine.pending_settle() {
            engine.settle(ticket);
        }
        engine
    }

    #[test]
    fn source_bold_reaches_editor() {
        let mut engine = engine("make this bold");
        engine.source_mut().set_selection(Selection::new(5, 9));
        let mut focus = Focus::Source;
        let bold = EditorCommand::ToggleInline(InlineFormat::Bold);

        assert!(execute_command(&mut engine, &mut focus, &bold));
        assert_eq!(engine.source().text(), "make **this** bold");
        assert!(inline_active(&engine, &focus, InlineFormat::Bold));
        assert_eq!(
            engine.editor().blocks[0],
            Block::Paragraph(vec![
                Inline::text("make "),
                Inline::Strong(vec![Inline::text("this")]),
                Inline::text(" bold"),
            ])
        );

        assert!(execute_command(&mut engine, &mut focus, &bold));
        assert_eq!(engine.source().text(), "make this bold");
    }

    #[test]
    fn editor_heading_reaches_source() {
        let mut engine = engine("Title\n\nbody");
        let mut focus = Focus::Editor(RichSelection::caret(NodePath::from(vec![0]), 2));
        let h1 = EditorCommand::ToggleBlock(BlockFormat::Heading(1));

        assert!(execute_command(&mut engine, &mut focus, &h1));
        assert_eq!(engine.source().text(), "# Title\n\nbody");
        assert!(block_active(&engine, &focus, BlockFormat::Heading(1)));
        assert!(!inline_active(&engine, &focus, InlineFormat::Bold));
    }

    #[test]
    fn task_click_is_an_editor_edit() {
        let mut engine = engine("- [ ] one");
        let mut focus = Focus::Source;
        let toggle = EditorCommand::ToggleTask {
            item: NodePath::from(vec![0, 0]),
        };
        assert!(execute_command(&mut engine, &mut focus, &toggle));
        assert_eq!(engine.source().text(), "- [x] one");
    }

    #[test]
    fn alert_snippet_in_both_surfaces() {
        let mut engine = engine("text");
        engine.source_mut().set_caret(4);
        let insert = EditorCommand::Insert(Snippet::Alert(AlertKind::Warning));
        assert!(execute_command(&mut engine, &mut Focus::Source, &insert));
        assert_eq!(
            engine.source().text(),
            "text\n> [!WARNING]\n> Write your text here\n"
        );

        let mut engine = self::engine("text");
        let mut focus = Focus::Editor(RichSelection::caret(NodePath::from(vec![0]), 4));
        assert!(execute_command(&mut engine, &mut focus, &insert));
        assert_eq!(
            engine.source().text(),
            "text\n\n> [!WARNING]\n> Write your text here"
        );
    }

    #[test]
    fn source_block_states() {
        let mut engine = engine("> quoted\n\n```\ncode\n```");
        engine.source_mut().set_caret(3);
        assert!(block_active(&engine, &Focus::Source, BlockFormat::BlockQuote));
        assert!(!block_active(&engine, &Focus::Source, BlockFormat::CodeBlock));
        engine.source_mut().set_caret(15);
        assert!(block_active(&engine, &Focus::Source, BlockFormat::CodeBlock));
    }

    #[test]
    fn paragraph_has_no_source_prefix() {
        let mut engine = engine("plain");
        let para = EditorCommand::ToggleBlock(BlockFormat::Paragraph);
        assert!(!execute_command(&mut engine, &mut Focus::Source, &para));
    }
}
