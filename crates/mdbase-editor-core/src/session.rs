//! An editing session: the sync engine plus the document library it saves to.
//!
//! Every operation that changes content runs the sync first and persists
//! the active document last.

use mdbase_common::document::derive_title;
use mdbase_common::export::{Export, ExportFormat, html_export, markdown_export};
use mdbase_common::{Config, Document, DocumentLibrary, KeyValueStore, MdbaseError};
use mdbase_markdown::{Block, EditorSurface, Node, inline_text, render_markdown, to_markdown};
use web_time::Instant;

use crate::commands::{EditorCommand, Focus, execute_command};
use crate::find::{Match, MatchSet};
use crate::sync::{SourceInput, SyncEngine, SyncOutcome};

/// Optional diagram renderer, set up once when the session opens.
pub trait DiagramRenderer {
    fn initialize(&mut self);
}

/// Where "copy source" puts the Markdown.
pub trait Clipboard {
    fn write_text(&mut self, text: &str);
}

pub struct EditorSession<S> {
    engine: SyncEngine,
    library: DocumentLibrary<S>,
    matches: MatchSet,
}

impl<S: KeyValueStore> EditorSession<S> {
    /// Load the library and show its active document.
    pub fn open(
        store: S,
        config: &Config,
        diagrams: Option<&mut dyn DiagramRenderer>,
    ) -> Result<Self, MdbaseError> {
        let mut library = DocumentLibrary::open(store)?;
        let markup = library.load(render_markdown)?.content.clone();
        let mut engine = SyncEngine::from_config(config);
        engine.load_markup(&markup);
        if let Some(diagrams) = diagrams {
            diagrams.initialize();
        }
        tracing::info!(documents = library.documents().len(), "session opened");
        Ok(Self {
            engine,
            library,
            matches: MatchSet::default(),
        })
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Direct access for hosts that edit the surfaces themselves. Follow an
    /// edit with [`Self::editor_edited`] or [`Self::source_edited`].
    pub fn engine_mut(&mut self) -> &mut SyncEngine {
        &mut self.engine
    }

    pub fn library(&self) -> &DocumentLibrary<S> {
        &self.library
    }

    pub fn active(&self) -> Option<&Document> {
        self.library.active()
    }

    /// Store the editor content and its derived title in the active document.
    pub fn persist(&mut self) -> Result<(), MdbaseError> {
        let title = document_title(self.engine.editor());
        self.library.save_active(&self.engine.markup(), title)
    }

    pub fn editor_edited(&mut self) -> Result<SyncOutcome, MdbaseError> {
        let outcome = self.engine.on_editor_changed();
        self.persist()?;
        Ok(outcome)
    }

    /// A debounced input is persisted when it is flushed by [`Self::tick`].
    pub fn source_edited(&mut self) -> Result<SourceInput, MdbaseError> {
        let input = self.engine.source_input();
        if let SourceInput::Synced(_) = input {
            self.persist()?;
        }
        Ok(input)
    }

    pub fn execute(&mut self, focus: &mut Focus, command: &EditorCommand) -> Result<bool, MdbaseError> {
        let changed = execute_command(&mut self.engine, focus, command);
        if changed {
            self.persist()?;
        }
        Ok(changed)
    }

    /// Run due flushes and settles.
    pub fn tick(&mut self, now: Instant) -> Result<bool, MdbaseError> {
        let flushing = self.engine.pending_flush().is_some_and(|t| now >= t.due());
        let ran = self.engine.tick(now);
        if ran && flushing {
            self.persist()?;
        }
        Ok(ran)
    }

    pub fn new_document(&mut self) -> Result<(), MdbaseError> {
        let outgoing = self.engine.markup();
        let markup = self.library.create(&outgoing)?.content.clone();
        self.show(&markup);
        Ok(())
    }

    pub fn switch_document(&mut self, id: &str) -> Result<(), MdbaseError> {
        let outgoing = self.engine.markup();
        let markup = self.library.switch(id, &outgoing)?.content.clone();
        self.show(&markup);
        Ok(())
    }

    /// Delete a document after `confirm` agrees. Fails with
    /// [`MdbaseError::DeleteDeclined`] otherwise.
    pub fn delete_document(
        &mut self,
        id: &str,
        confirm: impl FnOnce(&Document) -> bool,
    ) -> Result<(), MdbaseError> {
        let outgoing = self.engine.markup();
        self.library.delete(id, &outgoing, confirm, render_markdown)?;
        let markup = self
            .library
            .active()
            .map(|doc| doc.content.clone())
            .unwrap_or_default();
        self.show(&markup);
        Ok(())
    }

    /// Copy the Markdown source as it would be shown in the source pane.
    pub fn copy_source(&self, clipboard: &mut dyn Clipboard) {
        let markdown = if self.engine.view().split_view {
            self.engine.source().text()
        } else {
            to_markdown(self.engine.editor())
        };
        clipboard.write_text(&markdown);
    }

    pub fn export(&self, format: ExportFormat) -> Export {
        let title = self.active().map(Document::display_title).unwrap_or_default();
        match format {
            ExportFormat::Markdown => markdown_export(title, to_markdown(self.engine.editor())),
            ExportFormat::Html => html_export(title, &self.engine.markup()),
        }
    }

    pub fn matches(&self) -> &MatchSet {
        &self.matches
    }

    /// Search the editor. Returns the number of matches.
    pub fn find(&mut self, term: &str) -> usize {
        self.matches = MatchSet::search(self.engine.editor(), term);
        self.matches.len()
    }

    pub fn find_next(&mut self) -> Option<&Match> {
        self.matches.find_next()
    }

    pub fn find_previous(&mut self) -> Option<&Match> {
        self.matches.find_previous()
    }

    pub fn replace_current(&mut self, replacement: &str) -> Result<bool, MdbaseError> {
        let replaced = self
            .matches
            .replace_current(self.engine.editor_mut(), replacement);
        if replaced {
            self.editor_edited()?;
        }
        Ok(replaced)
    }

    pub fn replace_all(&mut self, replacement: &str) -> Result<usize, MdbaseError> {
        let count = self.matches.replace_all(self.engine.editor_mut(), replacement);
        if count > 0 {
            // Emptied leaves go away once no match path points into them.
            self.engine.editor_mut().normalize_text();
            self.editor_edited()?;
        }
        Ok(count)
    }

    fn show(&mut self, markup: &str) {
        self.engine.load_markup(markup);
        self.matches = MatchSet::default();
    }
}

/// First level-one heading anywhere in the document, else the first line.
fn document_title(surface: &EditorSurface) -> String {
    let mut first_h1 = None;
    surface.walk(&mut |_, node| {
        if first_h1.is_none()
            && let Node::Block(Block::Heading(heading)) = node
            && heading.level == 1
        {
            first_h1 = Some(inline_text(&heading.content));
        }
    });
    derive_title(first_h1.as_deref(), &surface.plain_text())
}
