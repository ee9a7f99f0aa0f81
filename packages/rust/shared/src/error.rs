//! Error types for bandgraph.
//!
//! Library crates use [`BandGraphError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all bandgraph operations.
#[derive(Debug, thiserror::Error)]
pub enum BandGraphError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a page.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or CSV parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Worker pool failure (pool shut down, task panicked).
    #[error("worker pool error: {0}")]
    Pool(String),

    /// Error while writing scrape output (CSV, graph JSON).
    #[error("output error: {0}")]
    Output(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BandGraphError>;

impl BandGraphError {
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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BandGraphError::config("origin must be an http(s) URL");
        assert_eq!(err.to_string(), "config error: origin must be an http(s) URL");

        let err = BandGraphError::Network("https://example.org/wiki/X: HTTP 404".into());
        assert!(err.to_string().starts_with("network error:"));
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[test]
    fn io_error_keeps_path() {
        let err = BandGraphError::io(
            "pages/abc",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("pages/abc"));
    }
}
