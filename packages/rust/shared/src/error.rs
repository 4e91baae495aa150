//! Error types for blogbook.
//!
//! Library crates use [`BlogbookError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all blogbook operations.
#[derive(Debug, thiserror::Error)]
pub enum BlogbookError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure (connection, TLS, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered, but not with a success status.
    #[error("fetch failed for {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, invalid assembled document, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The blog's seed index page could not be fetched.
    #[error("seed page {url} is unreachable: {reason}")]
    SeedUnreachable { url: String, reason: String },

    /// The seed page was fetched but is not an HTML document.
    #[error("seed page {url} is not HTML (content-type: {content_type})")]
    NotHtml { url: String, content_type: String },

    /// Nothing to put in the document.
    #[error("no posts to convert ({discovered} discovered, {skipped} skipped)")]
    NoPosts { discovered: usize, skipped: usize },

    /// The renderer could not produce the output file.
    #[error("render error: {0}")]
    Render(String),

    /// The run was cancelled before completion.
    #[error("run cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlogbookError>;

impl BlogbookError {
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

    /// Create a render error from any displayable message.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error ends the run when it reaches the pipeline.
    ///
    /// Fetch and parse failures of individual index or post pages are caught
    /// where they happen and never reach this point; they are listed here as
    /// recoverable so callers deciding per-page can ask the same question.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Network(_) | Self::Fetch { .. } | Self::Parse { .. }
        )
    }
}
