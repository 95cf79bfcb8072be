use serde::{Deserialize, Serialize};

use crate::model::PersistedProgress;

/// Which half of the current item is being narrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Part {
    #[default]
    Question,
    Answer,
}

impl Part {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Part::Question => "question",
            Part::Answer => "answer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Studying,
    OnBreak,
}

/// Externally visible state of the playback machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NarrationState {
    Idle,
    NarratingQuestion,
    NarratingAnswer,
    OnBreak,
}

/// Session state owned by the playback machine.
///
/// Invariant: `current_index < item_count` of the content set it was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    current_index: usize,
    current_part: Part,
    is_playing: bool,
    mode: Mode,
    study_elapsed_secs: u64,
    break_countdown_secs: i64,
    break_remaining_secs: i64,
}

impl PlaybackState {
    /// Fresh state at the first question with a full break countdown.
    #[must_use]
    pub fn new(break_threshold_secs: u32) -> Self {
        Self {
            current_index: 0,
            current_part: Part::Question,
            is_playing: false,
            mode: Mode::Studying,
            study_elapsed_secs: 0,
            break_countdown_secs: i64::from(break_threshold_secs),
            break_remaining_secs: 0,
        }
    }

    /// Seed state from persisted progress.
    ///
    /// Returns `None` when the saved index no longer fits the content set.
    #[must_use]
    pub fn from_progress(
        progress: PersistedProgress,
        item_count: usize,
        break_threshold_secs: u32,
    ) -> Option<Self> {
        if progress.index >= item_count {
            return None;
        }
        let mut state = Self::new(break_threshold_secs);
        state.current_index = progress.index;
        state.current_part = progress.part;
        state.study_elapsed_secs = progress.study_time;
        Some(state)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_part(&self) -> Part {
        self.current_part
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn is_on_break(&self) -> bool {
        self.mode == Mode::OnBreak
    }

    #[must_use]
    pub fn study_elapsed_secs(&self) -> u64 {
        self.study_elapsed_secs
    }

    #[must_use]
    pub fn break_countdown_secs(&self) -> i64 {
        self.break_countdown_secs
    }

    /// Only meaningful while on break.
    #[must_use]
    pub fn break_remaining_secs(&self) -> i64 {
        self.break_remaining_secs
    }

    /// Seconds shown on the break timer: the countdown while studying, the
    /// remaining break time while on break.
    #[must_use]
    pub fn break_display_secs(&self) -> i64 {
        match self.mode {
            Mode::Studying => self.break_countdown_secs,
            Mode::OnBreak => self.break_remaining_secs,
        }
    }

    #[must_use]
    pub fn narration_state(&self) -> NarrationState {
        match (self.mode, self.is_playing, self.current_part) {
            (Mode::OnBreak, _, _) => NarrationState::OnBreak,
            (Mode::Studying, false, _) => NarrationState::Idle,
            (Mode::Studying, true, Part::Question) => NarrationState::NarratingQuestion,
            (Mode::Studying, true, Part::Answer) => NarrationState::NarratingAnswer,
        }
    }

    /// Linear position through the whole sequence, as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self, item_count: usize) -> f64 {
        if item_count == 0 {
            return 0.0;
        }
        let count = item_count as f64;
        let base = (self.current_index as f64 / count) * 100.0;
        match self.current_part {
            Part::Question => base,
            Part::Answer => base + 50.0 / count,
        }
    }

    #[must_use]
    pub fn to_progress(&self) -> PersistedProgress {
        PersistedProgress {
            index: self.current_index,
            part: self.current_part,
            study_time: self.study_elapsed_secs,
        }
    }

    pub(crate) fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
    }

    pub(crate) fn set_position(&mut self, index: usize, part: Part) {
        self.current_index = index;
        self.current_part = part;
    }

    /// One logical step forward: question → answer → next question (circular).
    pub(crate) fn advance(&mut self, item_count: usize) {
        match self.current_part {
            Part::Question => self.current_part = Part::Answer,
            Part::Answer => {
                self.current_index = (self.current_index + 1) % item_count.max(1);
                self.current_part = Part::Question;
            }
        }
    }

    /// One logical step back: answer → its question, question → previous question.
    pub(crate) fn step_back(&mut self, item_count: usize) {
        match self.current_part {
            Part::Answer => self.current_part = Part::Question,
            Part::Question => {
                let count = item_count.max(1);
                self.current_index = (self.current_index + count - 1) % count;
            }
        }
    }

    pub(crate) fn tick_study(&mut self) {
        self.study_elapsed_secs = self.study_elapsed_secs.saturating_add(1);
        self.break_countdown_secs -= 1;
    }

    pub(crate) fn begin_break(&mut self, duration_secs: u32) {
        self.mode = Mode::OnBreak;
        self.break_remaining_secs = i64::from(duration_secs);
    }

    pub(crate) fn tick_break(&mut self) {
        self.break_remaining_secs -= 1;
    }

    pub(crate) fn finish_break(&mut self, threshold_secs: u32) {
        self.mode = Mode::Studying;
        self.break_remaining_secs = 0;
        self.break_countdown_secs = i64::from(threshold_secs);
    }
}
