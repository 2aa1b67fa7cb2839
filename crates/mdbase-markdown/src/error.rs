//! Errors raised while writing editor output.

use miette::Diagnostic;

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum RenderError {
    /// Writing rendered markup to an output sink failed
    #[error("failed to write rendered output")]
    #[diagnostic(code(mdbase::render::io))]
    Io(#[from] std::io::Error),
}
