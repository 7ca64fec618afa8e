//! Error types for bitrise-cache
//!
//! All modules use `CacheResult<T>` as their return type.

use crate::phase::Phase;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cache step operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur while restoring or saving a cache
#[derive(Error, Debug)]
pub enum CacheError {
    // Configuration errors
    #[error("{0} is required")]
    MissingInput(&'static str),

    #[error("unknown phase: {0} (expected 'restore' or 'save')")]
    UnknownPhase(String),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Cache errors
    #[error("no cache entry found for keys: {keys}")]
    CacheNotFound { keys: String },

    #[error("failed to restore cache entry. Input key: {key}, error: {source}")]
    RestoreFailed {
        key: String,
        #[source]
        source: Box<CacheError>,
    },

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Invalid cache entry {path}: {reason}")]
    EntryInvalid { path: PathBuf, reason: String },

    #[error("None of the paths to cache exist: {0}")]
    NoPathsFound(String),

    // CI platform errors
    #[error("Failed to read repository context: {0}")]
    Context(String),

    #[error("Invalid value for {name}: {reason}")]
    FileCommand { name: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Phase wrapper used for the top-level report
    #[error("{phase} failed: {source}")]
    PhaseFailed {
        phase: Phase,
        #[source]
        source: Box<CacheError>,
    },

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an archive error from any displayable cause
    pub fn archive(context: &str, cause: impl std::fmt::Display) -> Self {
        Self::Archive(format!("{}: {}", context, cause))
    }

    /// Attach the phase that produced this error
    pub fn in_phase(self, phase: Phase) -> Self {
        Self::PhaseFailed {
            phase,
            source: Box::new(self),
        }
    }

    /// Check if error is worth retrying against the provider
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Archive(_))
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PhaseFailed { source, .. } => source.hint(),
            Self::MissingInput("key") => Some("Set `key` in the step's `with:` block"),
            Self::MissingInput("path") => {
                Some("Set `path` in the step's `with:` block, one path per line")
            }
            Self::UnknownPhase(_) => Some("Run with `restore` or `save` as the first argument"),
            Self::RestoreFailed { .. } => {
                Some("Unset `fail-on-cache-miss` to continue the job without a cache")
            }
            _ => None,
        }
    }
}
