use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ContentError;
use crate::model::Part;

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// Session identifier for a content set.
///
/// The subject doubles as the persistence key suffix (`progress_<subject>`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    /// Build a subject from a non-blank name. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::EmptySubject` if the name is blank.
    pub fn parse(name: impl Into<String>) -> Result<Self, ContentError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ContentError::EmptySubject);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which progress for this subject is persisted.
    #[must_use]
    pub fn progress_key(&self) -> String {
        format!("progress_{}", self.0)
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subject({})", self.0)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── BREAK TRACKS ──────────────────────────────────────────────────────────────
//

/// Identifier of a break-music track (a file name inside the songs folder).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackName(String);

impl TrackName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── ITEMS ─────────────────────────────────────────────────────────────────────
//

/// A single question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaItem {
    question: String,
    answer: String,
}

impl QaItem {
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Text narrated for the given part.
    #[must_use]
    pub fn text(&self, part: Part) -> &str {
        match part {
            Part::Question => self.question.trim(),
            Part::Answer => self.answer.trim(),
        }
    }
}

//
// ─── CONTENT SET ───────────────────────────────────────────────────────────────
//

/// Ordered question/answer pairs for one study session, plus break music.
///
/// Immutable once built; guaranteed to hold at least one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSet {
    subject: Subject,
    items: Vec<QaItem>,
    break_tracks: Vec<TrackName>,
}

impl ContentSet {
    /// # Errors
    ///
    /// Returns `ContentError::NoItems` for an empty item list and
    /// `ContentError::EmptyQuestion` if any question is blank.
    pub fn new(
        subject: Subject,
        items: Vec<QaItem>,
        break_tracks: Vec<TrackName>,
    ) -> Result<Self, ContentError> {
        if items.is_empty() {
            return Err(ContentError::NoItems);
        }
        if let Some(index) = items.iter().position(|item| item.question.trim().is_empty()) {
            return Err(ContentError::EmptyQuestion { index });
        }

        Ok(Self {
            subject,
            items,
            break_tracks,
        })
    }

    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    #[must_use]
    pub fn items(&self) -> &[QaItem] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, index: usize) -> Option<&QaItem> {
        self.items.get(index)
    }

    /// Number of items; never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn break_tracks(&self) -> &[TrackName] {
        &self.break_tracks
    }

    #[must_use]
    pub fn text_for(&self, index: usize, part: Part) -> Option<&str> {
        self.item(index).map(|item| item.text(part))
    }
}
