//! Error types for kbimport.
//!
//! Library crates use [`ImportError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all import operations.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Bad or missing configuration (unsupported type, extension, filter...).
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to a source or the knowledge store.
    #[error("network error: {0}")]
    Network(String),

    /// The knowledge store answered with a non-success status.
    #[error("remote error: HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// HTML, JSON, or tabular parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty extraction, malformed response...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A single document could not be uploaded after all retries.
    #[error("upload of {file_name} failed: {message}")]
    Upload { file_name: String, message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ImportError>;

impl ImportError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a configuration problem (fatal to a run).
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ImportError::config("unsupported type: rss");
        assert_eq!(err.to_string(), "config error: unsupported type: rss");
        assert!(err.is_config());

        let err = ImportError::Remote {
            status: 401,
            message: "Not authenticated".into(),
        };
        assert_eq!(err.to_string(), "remote error: HTTP 401: Not authenticated");
        assert!(!err.is_config());
    }

    #[test]
    fn upload_error_names_the_file() {
        let err = ImportError::Upload {
            file_name: "report_2024.txt".into(),
            message: "HTTP 500".into(),
        };
        assert!(err.to_string().contains("report_2024.txt"));
    }
}
