//! Two-way synchronization between the rich-text editor and the Markdown
//! source pane.
//!
//! The engine owns both surfaces and the edit-origin marker. Hosts call
//! [`SyncEngine::on_editor_changed`] or [`SyncEngine::on_source_changed`]
//! after an edit on either side; each call hands back a [`Ticket`] that the
//! host passes to [`SyncEngine::settle`] once the quiet window has elapsed
//! (or lets [`SyncEngine::tick`] do it). Tickets carry a sequence number, so
//! a settle scheduled by an older edit never clears the origin of a newer
//! one.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use mdbase_common::Config;
use mdbase_markdown::{EditorSurface, parse_markdown, read_markup, render_html, to_markdown};
use web_time::Instant;

use crate::source::SourceSurface;
use crate::stats::{DEFAULT_WORDS_PER_MINUTE, DocumentStats, OutlineEntry, outline};

/// Which surface produced the edit currently in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditOrigin {
    #[default]
    None,
    Wysiwyg,
    Source,
}

/// A scheduled follow-up: settle the origin, or flush debounced source input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    due: Instant,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// When the host should act on this ticket.
    pub fn due(&self) -> Instant {
        self.due
    }
}

/// Result of propagating one edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The other surface was rewritten.
    Propagated(Ticket),
    /// The other surface already matched and was left alone.
    Unchanged(Ticket),
    /// The source pane is hidden, so it was not touched.
    Hidden(Ticket),
    /// A push from the other surface is still in flight.
    Suppressed,
    /// The pipeline failed; the other surface keeps its last valid state.
    Failed(Ticket),
}

impl SyncOutcome {
    pub fn ticket(&self) -> Option<Ticket> {
        match self {
            SyncOutcome::Propagated(t)
            | SyncOutcome::Unchanged(t)
            | SyncOutcome::Hidden(t)
            | SyncOutcome::Failed(t) => Some(*t),
            SyncOutcome::Suppressed => None,
        }
    }

    pub fn propagated(&self) -> bool {
        matches!(self, SyncOutcome::Propagated(_))
    }
}

/// Result of feeding source input through the optional debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceInput {
    Synced(SyncOutcome),
    /// Flush with [`SyncEngine::flush_source`] once the ticket is due.
    Pending(Ticket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub quiet_window: Duration,
    /// Zero re-parses on every source input.
    pub source_debounce: Duration,
    pub words_per_minute: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            quiet_window: Duration::from_millis(100),
            source_debounce: Duration::ZERO,
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }
}

impl From<&Config> for SyncConfig {
    fn from(config: &Config) -> Self {
        Self {
            quiet_window: Duration::from_millis(config.quiet_window_ms),
            source_debounce: Duration::from_millis(config.source_debounce_ms),
            words_per_minute: config.words_per_minute,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub split_view: bool,
    pub outline_visible: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            split_view: true,
            outline_visible: false,
        }
    }
}

impl From<&Config> for ViewState {
    fn from(config: &Config) -> Self {
        Self {
            split_view: config.split_view,
            outline_visible: config.outline_visible,
        }
    }
}

#[derive(Debug, Default)]
struct OriginState {
    origin: EditOrigin,
    seq: u64,
    pending: Option<Ticket>,
}

#[derive(Debug, Default)]
struct Debounce {
    seq: u64,
    pending: Option<Ticket>,
}

#[derive(Debug, Default)]
pub struct SyncEngine {
    editor: EditorSurface,
    source: SourceSurface,
    state: OriginState,
    debounce: Debounce,
    view: ViewState,
    config: SyncConfig,
    stats: DocumentStats,
    outline: Vec<OutlineEntry>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig, view: ViewState) -> Self {
        Self {
            config,
            view,
            ..Default::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(SyncConfig::from(config), ViewState::from(config))
    }

    pub fn editor(&self) -> &EditorSurface {
        &self.editor
    }

    /// Mutable editor tree. Call [`Self::on_editor_changed`] after editing.
    pub fn editor_mut(&mut self) -> &mut EditorSurface {
        &mut self.editor
    }

    pub fn source(&self) -> &SourceSurface {
        &self.source
    }

    /// Mutable source pane. Call [`Self::on_source_changed`] or
    /// [`Self::source_input`] after editing.
    pub fn source_mut(&mut self) -> &mut SourceSurface {
        &mut self.source
    }

    pub fn origin(&self) -> EditOrigin {
        self.state.origin
    }

    pub fn pending_settle(&self) -> Option<Ticket> {
        self.state.pending
    }

    pub fn pending_flush(&self) -> Option<Ticket> {
        self.debounce.pending
    }

    pub fn stats(&self) -> DocumentStats {
        self.stats
    }

    pub fn outline(&self) -> &[OutlineEntry] {
        &self.outline
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Editor markup as it would be stored.
    pub fn markup(&self) -> String {
        render_html(&self.editor)
    }

    /// Propagate an edit made in the rich-text editor.
    ///
    /// Suppressed while a source push is in flight. The source pane is only
    /// rewritten when it is visible and its text actually differs, so an
    /// identical serialization never moves the caret.
    pub fn on_editor_changed(&mut self) -> SyncOutcome {
        if self.state.origin == EditOrigin::Source {
            tracing::trace!(seq = self.state.seq, "editor change suppressed");
            return SyncOutcome::Suppressed;
        }
        self.state.origin = EditOrigin::Wysiwyg;
        let ticket = self.next_ticket();
        self.refresh_projection();

        if !self.view.split_view {
            return SyncOutcome::Hidden(ticket);
        }
        match self.write_source() {
            Some(true) => SyncOutcome::Propagated(ticket),
            Some(false) => SyncOutcome::Unchanged(ticket),
            None => SyncOutcome::Failed(ticket),
        }
    }

    /// Propagate an edit made in the source pane.
    ///
    /// The editor is replaced only when the re-rendered markup differs from
    /// what it shows now. The projection is refreshed either way.
    pub fn on_source_changed(&mut self) -> SyncOutcome {
        self.state.origin = EditOrigin::Source;
        let ticket = self.next_ticket();
        let text = self.source.text();

        let parsed = guarded("parse", || {
            let surface = parse_markdown(&text);
            let changed = render_html(&surface) != render_html(&self.editor);
            (surface, changed)
        });
        let outcome = match parsed {
            Some((surface, true)) => {
                self.editor = surface;
                SyncOutcome::Propagated(ticket)
            }
            Some((_, false)) => {
                tracing::trace!(seq = ticket.seq, "editor already matches source");
                SyncOutcome::Unchanged(ticket)
            }
            None => SyncOutcome::Failed(ticket),
        };
        self.refresh_projection();
        outcome
    }

    /// Feed source input through the debounce, if one is configured.
    pub fn source_input(&mut self) -> SourceInput {
        if self.config.source_debounce.is_zero() {
            return SourceInput::Synced(self.on_source_changed());
        }
        self.debounce.seq += 1;
        let ticket = Ticket {
            seq: self.debounce.seq,
            due: Instant::now() + self.config.source_debounce,
        };
        self.debounce.pending = Some(ticket);
        SourceInput::Pending(ticket)
    }

    /// Run a debounced re-parse. Returns `None` for a superseded ticket.
    pub fn flush_source(&mut self, ticket: Ticket) -> Option<SyncOutcome> {
        if self.debounce.pending != Some(ticket) {
            tracing::debug!(seq = ticket.seq, latest = self.debounce.seq, "stale flush ticket");
            return None;
        }
        self.debounce.pending = None;
        Some(self.on_source_changed())
    }

    /// Clear the edit origin if `ticket` belongs to the latest edit.
    pub fn settle(&mut self, ticket: Ticket) -> bool {
        if ticket.seq != self.state.seq {
            tracing::debug!(seq = ticket.seq, latest = self.state.seq, "stale settle ticket");
            return false;
        }
        self.state.origin = EditOrigin::None;
        self.state.pending = None;
        true
    }

    /// Act on whatever is due at `now`: a debounced flush first, then the
    /// origin settle. Returns true if anything ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut ran = false;
        if let Some(ticket) = self.debounce.pending
            && now >= ticket.due
        {
            ran |= self.flush_source(ticket).is_some();
        }
        if let Some(ticket) = self.state.pending
            && now >= ticket.due
        {
            ran |= self.settle(ticket);
        }
        ran
    }

    /// Replace both surfaces with stored markup, dropping any edit in flight.
    pub fn load_markup(&mut self, markup: &str) {
        self.editor = guarded("read markup", || read_markup(markup)).unwrap_or_default();
        self.state.seq += 1;
        self.state.origin = EditOrigin::None;
        self.state.pending = None;
        self.debounce.pending = None;
        if self.view.split_view {
            self.write_source();
        }
        self.refresh_projection();
    }

    /// Replace the whole source buffer and push it to the editor.
    pub fn replace_source_text(&mut self, text: &str) -> SyncOutcome {
        self.source.set_text(text);
        self.on_source_changed()
    }

    /// Showing the split view brings the source pane up to date.
    pub fn set_split_view(&mut self, visible: bool) {
        self.view.split_view = visible;
        if visible {
            self.write_source();
        }
    }

    pub fn set_outline_visible(&mut self, visible: bool) {
        self.view.outline_visible = visible;
        if visible {
            self.outline = outline(&self.editor);
        }
    }

    fn next_ticket(&mut self) -> Ticket {
        self.state.seq += 1;
        let ticket = Ticket {
            seq: self.state.seq,
            due: Instant::now() + self.config.quiet_window,
        };
        self.state.pending = Some(ticket);
        ticket
    }

    /// Serialize the editor into the source pane when the text differs.
    /// `None` when serialization failed.
    fn write_source(&mut self) -> Option<bool> {
        let markdown = guarded("serialize", || to_markdown(&self.editor))?;
        if markdown == self.source.text() {
            return Some(false);
        }
        tracing::trace!(len = markdown.len(), "source pane rewritten");
        self.source.set_text(&markdown);
        Some(true)
    }

    fn refresh_projection(&mut self) {
        self.stats = DocumentStats::of(&self.editor, self.config.words_per_minute);
        if self.view.outline_visible {
            self.outline = outline(&self.editor);
        }
    }
}

/// Run one pipeline stage, logging a panic instead of unwinding into the host.
fn guarded<T>(stage: &'static str, run: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("unknown panic");
            tracing::error!(stage, error = message, "pipeline failed, surface left unchanged");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Selection;

    fn engine() -> SyncEngine {
        SyncEngine::new(SyncConfig::default(), ViewState::default())
    }

    #[test]
    fn panicking_stage_yields_none() {
        assert_eq!(guarded("parse", || 7), Some(7));
        let failed: Option<()> = guarded("parse", || panic!("bad input"));
        assert_eq!(failed, None);
        let failed: Option<u8> = guarded("serialize", || panic!("{} left", 2));
        assert_eq!(failed, None);
    }

    #[test]
    fn source_edit_reaches_editor_once() {
        let mut engine = engine();
        engine.source_mut().set_text("# Hi\n\nthere");
        let outcome = engine.on_source_changed();
        assert!(outcome.propagated());
        assert_eq!(engine.origin(), EditOrigin::Source);
        assert_eq!(engine.stats().words, 2);

        // The editor refresh echoes back; the echo must not bounce.
        let revision = engine.source().revision();
        assert_eq!(engine.on_editor_changed(), SyncOutcome::Suppressed);
        assert_eq!(engine.source().revision(), revision);

        assert!(engine.settle(outcome.ticket().unwrap()));
        assert_eq!(engine.origin(), EditOrigin::None);
    }

    #[test]
    fn identical_serialization_keeps_caret() {
        let mut engine = engine();
        engine.replace_source_text("plain text");
        engine.source_mut().set_selection(Selection::collapsed(3));
        engine.settle(engine.pending_settle().unwrap());

        let revision = engine.source().revision();
        let outcome = engine.on_editor_changed();
        assert!(matches!(outcome, SyncOutcome::Unchanged(_)));
        assert_eq!(engine.source().revision(), revision);
        assert_eq!(engine.source().caret(), 3);
    }

    #[test]
    fn unchanged_markup_leaves_editor() {
        let mut engine = engine();
        engine.replace_source_text("same");
        let before = engine.editor().clone();
        engine.source_mut().set_text("same\n");
        assert!(matches!(engine.on_source_changed(), SyncOutcome::Unchanged(_)));
        assert_eq!(engine.editor(), &before);
    }

    #[test]
    fn stale_ticket_does_not_settle() {
        let mut engine = engine();
        let first = engine.replace_source_text("one").ticket().unwrap();
        let second = engine.replace_source_text("one two").ticket().unwrap();
        assert!(!engine.settle(first));
        assert_eq!(engine.origin(), EditOrigin::Source);
        assert!(engine.settle(second));
    }

    #[test]
    fn hidden_source_is_left_alone() {
        let mut engine = SyncEngine::new(
            SyncConfig::default(),
            ViewState {
                split_view: false,
                outline_visible: false,
            },
        );
        engine.load_markup("<p>hello</p>");
        assert_eq!(engine.source().text(), "");

        engine.editor_mut().blocks.clear();
        assert!(matches!(engine.on_editor_changed(), SyncOutcome::Hidden(_)));
        assert_eq!(engine.source().text(), "");

        engine.load_markup("<p>hello</p>");
        engine.set_split_view(true);
        assert_eq!(engine.source().text(), "hello");
    }

    #[test]
    fn outline_only_while_visible() {
        let mut engine = engine();
        engine.replace_source_text("# One\n\n## Two");
        assert!(engine.outline().is_empty());
        engine.set_outline_visible(true);
        assert_eq!(engine.outline().len(), 2);
    }

    #[test]
    fn debounced_input_flushes_latest_only() {
        let mut engine = SyncEngine::new(
            SyncConfig {
                source_debounce: Duration::from_millis(250),
                ..Default::default()
            },
            ViewState::default(),
        );
        engine.source_mut().set_text("draft");
        let SourceInput::Pending(first) = engine.source_input() else {
            panic!("expected a pending flush");
        };
        engine.source_mut().set_text("draft two");
        let SourceInput::Pending(second) = engine.source_input() else {
            panic!("expected a pending flush");
        };
        assert_eq!(engine.flush_source(first), None);
        assert!(engine.editor().is_empty());

        assert!(engine.tick(second.due() + Duration::from_millis(500)));
        assert_eq!(engine.editor().plain_text(), "draft two");
        // The quiet window elapsed too.
        assert_eq!(engine.origin(), EditOrigin::None);
    }

    #[test]
    fn load_resets_origin_and_syncs_source() {
        let mut engine = engine();
        engine.replace_source_text("old");
        engine.load_markup("<h1>New</h1><p>body</p>");
        assert_eq!(engine.origin(), EditOrigin::None);
        assert_eq!(engine.pending_settle(), None);
        assert_eq!(engine.source().text(), "# New\n\nbody");
        assert_eq!(engine.stats().words, 2);
    }
}
