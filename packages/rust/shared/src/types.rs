//! Core domain types: the document record and file-name helpers.

use std::collections::BTreeMap;

use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata key set on every record at extraction time.
pub const DATE_IMPORTED_KEY: &str = "date_imported";

/// Number of random hex characters appended by [`unique_file_name`].
const UNIQUE_SUFFIX_LEN: usize = 6;

/// Scalar metadata attached to a record.
pub type Metadata = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// DocumentRecord
// ---------------------------------------------------------------------------

/// One normalized unit of extracted content, ready for upload.
///
/// Records are built inside an extractor and not modified afterwards; the
/// file name is sanitized on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    content: String,
    #[serde(rename = "file_config")]
    metadata: Metadata,
    file_name: String,
}

impl DocumentRecord {
    /// Create a record stamped with the current `date_imported`.
    pub fn new(content: impl Into<String>, file_name: &str) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(
            DATE_IMPORTED_KEY.to_string(),
            serde_json::Value::String(now_iso()),
        );

        Self {
            content: content.into(),
            metadata,
            file_name: sanitize_filename(file_name),
        }
    }

    /// Merge an extractor-specific metadata field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Rendered text body.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Metadata fields (always includes `date_imported`).
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Sanitized remote file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// ISO-8601 timestamp of extraction.
    pub fn date_imported(&self) -> Option<&str> {
        self.metadata.get(DATE_IMPORTED_KEY).and_then(|v| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// File names
// ---------------------------------------------------------------------------

/// Make a string safe for use as a remote file name.
///
/// Replaces space, `/`, `\` and `:` with `_`. Total and idempotent.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect()
}

/// Sanitize `base` and append `_` plus six random hex characters.
pub fn unique_file_name(base: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}_{}", sanitize_filename(base), &hex[..UNIQUE_SUFFIX_LEN])
}

/// Local timestamp in the `YYYY-MM-DDTHH:MM:SS.ffffff` form.
pub fn now_iso() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
