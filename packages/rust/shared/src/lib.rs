//! Shared types, error model, and configuration for kbimport.
//!
//! This crate is the foundation depended on by all other kbimport crates.
//! It provides:
//! - [`ImportError`], the unified error type
//! - [`DocumentRecord`] and the file-name sanitizer
//! - Source configuration ([`SourceConfig`], per-type data blocks, credentials)
//! - The [`Extractor`] contract

pub mod config;
pub mod error;
pub mod extract;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    API_KEY_ENV, BASE_URL_ENV, EventsApiSourceConfig, KnowledgeTarget, OpenWebUiConfig,
    RemoteCredentials, RowFilter, SourceConfig, SourceKind, TabularEntryConfig,
    TabularSourceConfig, WebEntryConfig, WebSourceConfig, is_config_file, load_source_config,
};
pub use error::{ImportError, Result};
pub use extract::Extractor;
pub use types::{
    DATE_IMPORTED_KEY, DocumentRecord, Metadata, now_iso, sanitize_filename, unique_file_name,
};
