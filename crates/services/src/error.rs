//! Shared error types for the services crate.

use narrator_core::ContentError;
use thiserror::Error;

/// Errors reported by platform capabilities (speech, audio, wake lock, media session).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CapabilityError {
    #[error("{0} is not available on this platform")]
    Unavailable(&'static str),

    #[error("{0}")]
    Failed(String),
}

/// Errors emitted by `MaterialLibrary`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LibraryError {
    #[error("subject not found: {0}")]
    SubjectNotFound(String),

    #[error("{file} is not a readable Word document: {reason}")]
    Document { file: String, reason: String },

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
