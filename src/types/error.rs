//! Unified Error Type System
//!
//! Centralized error types for the whole conversion.
//!
//! ## Severity
//!
//! - **Fatal**: the run cannot continue (missing archive, unreadable TOC,
//!   invalid configuration, naming conflict exhaustion)
//! - **Per-document**: the exporter logs a warning, skips the document and
//!   moves on (unreadable payload, unwritable output path)
//! - **Per-image**: the localizer logs a warning and keeps the remote reference

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LakeError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Archive Errors
    // -------------------------------------------------------------------------
    #[error("Lakebook file not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("Invalid lakebook: {0}")]
    InvalidArchive(String),

    #[error("Invalid metadata: {0}")]
    Metadata(String),

    // -------------------------------------------------------------------------
    // Conversion Errors
    // -------------------------------------------------------------------------
    #[error("Document {url} failed: {reason}")]
    Document { url: String, reason: String },

    #[error("Image download failed for {url}: {reason}")]
    ImageFetch {
        url: String,
        reason: String,
        transient: bool,
    },

    #[error("Naming conflict: no free name for '{name}' after {attempts} attempts")]
    NamingConflict { name: String, attempts: usize },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LakeError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl LakeError {
    /// Create a document error
    pub fn document(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Document {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a permanent image fetch error
    pub fn image(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImageFetch {
            url: url.into(),
            reason: reason.into(),
            transient: false,
        }
    }

    /// Create an image fetch error worth retrying
    pub fn image_transient(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImageFetch {
            url: url.into(),
            reason: reason.into(),
            transient: true,
        }
    }

    /// Check if this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Document { .. } | Self::ImageFetch { .. } => false,
            Self::Io(_) | Self::Json(_) | Self::Yaml(_) => true,
            Self::ArchiveNotFound(_)
            | Self::InvalidArchive(_)
            | Self::Metadata(_)
            | Self::NamingConflict { .. }
            | Self::Config(_) => true,
        }
    }

    /// Check if a failed operation may succeed when retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ImageFetch { transient: true, .. })
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Wrap the error as a document error for `url`
    fn for_document(self, url: &str) -> Result<T>;

    /// Wrap the error as a metadata error with a context prefix
    fn with_metadata_context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn for_document(self, url: &str) -> Result<T> {
        self.map_err(|e| LakeError::document(url, e.to_string()))
    }

    fn with_metadata_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| LakeError::Metadata(format!("{}: {}", context.into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
