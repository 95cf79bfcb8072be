use thiserror::Error;

/// Errors raised while assembling a `ContentSet`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("subject must not be empty")]
    EmptySubject,

    #[error("content set has no question/answer items")]
    NoItems,

    #[error("item {index} has an empty question")]
    EmptyQuestion { index: usize },
}

/// Errors raised while validating `PlaybackSettings`.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("speech rate must be a positive number, got {0}")]
    InvalidRate(f32),

    #[error("answer pause factor must be a non-negative number, got {0}")]
    InvalidPauseFactor(f32),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("speech language must not be empty")]
    EmptyLanguage,
}
