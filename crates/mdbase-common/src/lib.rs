//! Shared plumbing for mdbase: errors, configuration, logging setup, the
//! persisted document library and export formats.

pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod store;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use crate::config::Config;
pub use crate::document::{Document, DocumentLibrary};
pub use crate::error::{MdbaseError, SerDeError};
pub use crate::store::{JsonFileStore, KeyValueStore, MemoryStore};
