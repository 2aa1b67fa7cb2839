//! Error types for mdbase

use miette::Diagnostic;

/// Main error type for mdbase operations
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum MdbaseError {
    /// IO error
    #[error(transparent)]
    #[diagnostic(code(mdbase::io))]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error(transparent)]
    #[diagnostic_source]
    Serde(#[from] SerDeError),

    #[error("no document with id {0}")]
    #[diagnostic(code(mdbase::document::not_found))]
    DocumentNotFound(String),

    #[error("deletion of document {0} was not confirmed")]
    #[diagnostic(
        code(mdbase::document::delete_declined),
        help("confirm the deletion to remove the document")
    )]
    DeleteDeclined(String),

    #[error("unsupported configuration format: {0}")]
    #[diagnostic(code(mdbase::config::format), help("use a .json or .toml file"))]
    UnsupportedFormat(String),
}

/// Serialization/deserialization error
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum SerDeError {
    #[error(transparent)]
    #[diagnostic(code(mdbase::serde::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(mdbase::serde::toml_de))]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    #[diagnostic(code(mdbase::serde::toml_ser))]
    TomlSer(#[from] toml::ser::Error),
}

impl From<serde_json::Error> for MdbaseError {
    fn from(e: serde_json::Error) -> Self {
        MdbaseError::Serde(SerDeError::Json(e))
    }
}

impl From<toml::de::Error> for MdbaseError {
    fn from(e: toml::de::Error) -> Self {
        MdbaseError::Serde(SerDeError::TomlDe(e))
    }
}

impl From<toml::ser::Error> for MdbaseError {
    fn from(e: toml::ser::Error) -> Self {
        MdbaseError::Serde(SerDeError::TomlSer(e))
    }
}
