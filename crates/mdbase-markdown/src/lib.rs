//! mdbase markdown
//!
//! The Markdown side of the editor: parses source into the rich-text tree,
//! renders that tree to editor markup, and serializes it back to Markdown.
//!
//! ```
//! let surface = mdbase_markdown::parse_markdown("## Setup {#setup}\n\nShip it :rocket:");
//! let html = mdbase_markdown::render_html(&surface);
//! assert!(html.contains(r#"id="setup""#));
//! assert_eq!(mdbase_markdown::to_markdown(&surface), "## Setup {#setup}\n\nShip it 🚀");
//! ```

use std::io;

use markdown_weaver::Parser;
use markdown_weaver_escape::IoWriter;

pub mod builder;
pub mod emoji;
pub mod error;
pub mod footnotes;
pub mod html;
pub mod markup;
pub mod path;
pub mod serialize;
pub mod tree;

pub use builder::TreeBuilder;
pub use error::RenderError;
pub use html::{is_color_literal, render_html, write_html};
pub use markup::read_markup;
pub use path::{Node, NodeMut, NodePath};
pub use serialize::{inlines_to_markdown, to_markdown};
pub use tree::*;

/// Parser options for editor documents.
///
/// Footnotes are handled by the editor's own pass, and alerts by the tree
/// builder, so neither parser extension is enabled.
pub fn default_md_options() -> markdown_weaver::Options {
    markdown_weaver::Options::ENABLE_TABLES
        | markdown_weaver::Options::ENABLE_STRIKETHROUGH
        | markdown_weaver::Options::ENABLE_TASKLISTS
}

/// Parse Markdown source into an editor surface.
///
/// Footnote definitions are collected first and appended as a footnote
/// section; raw HTML blocks holding legacy code markup are repaired.
pub fn parse_markdown(source: &str) -> EditorSurface {
    let pass = footnotes::extract(source);
    let ids = pass.ids();
    let parser = Parser::new_ext(&pass.body, default_md_options()).into_offset_iter();
    let mut surface = TreeBuilder::new(ids.clone()).build_with_source(&pass.body, parser);
    markup::repair_surface(&mut surface);
    if !pass.is_empty() {
        let defs = pass
            .definitions
            .iter()
            .map(|(id, text)| FootnoteDef {
                id: id.clone(),
                content: TreeBuilder::new(ids.clone())
                    .build_inline(Parser::new_ext(text, default_md_options())),
            })
            .collect();
        surface.blocks.push(Block::Footnotes(defs));
    }
    tracing::trace!(blocks = surface.blocks.len(), "parsed markdown");
    surface
}

/// Render Markdown source straight to editor markup.
pub fn render_markdown(source: &str) -> String {
    render_html(&parse_markdown(source))
}

/// Render a surface into an `io::Write` sink.
pub fn write_html_io<W: io::Write>(writer: W, surface: &EditorSurface) -> Result<(), RenderError> {
    write_html(IoWriter(writer), surface)?;
    Ok(())
}
