//! mdbase-editor-core: editor logic shared by every mdbase front end.
//!
//! This crate provides:
//! - `SourceSurface` - ropey-backed Markdown pane with a selection
//! - `SyncEngine` - keeps the rich-text tree and the source pane in step
//! - Formatting toggles and active-state checks for both surfaces
//! - Word count, reading time and heading outline
//! - Find and replace over the rich-text tree
//! - `EditorSession` - the engine wired to the persisted document library

pub mod commands;
pub mod find;
pub mod format;
pub mod session;
pub mod source;
pub mod stats;
pub mod sync;
pub mod text;
pub mod text_helpers;
pub mod types;

pub use commands::{EditorCommand, Focus, Snippet, block_active, execute_command, inline_active};
pub use find::{Match, MatchSet};
pub use format::rich::Marks;
pub use format::{BlockFormat, InlineFormat};
pub use session::{Clipboard, DiagramRenderer, EditorSession};
pub use smol_str::SmolStr;
pub use source::SourceSurface;
pub use stats::{DocumentStats, OutlineEntry, outline};
pub use sync::{EditOrigin, SourceInput, SyncConfig, SyncEngine, SyncOutcome, Ticket, ViewState};
pub use text::{EditorRope, TextBuffer};
pub use types::{RichSelection, Selection};
