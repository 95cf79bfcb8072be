mod content;
mod playback;
mod progress;
mod settings;

pub use content::{ContentSet, QaItem, Subject, TrackName};
pub use playback::{Mode, NarrationState, Part, PlaybackState};
pub use progress::PersistedProgress;
pub use settings::{
    DEFAULT_BREAK_DURATION_SECS, DEFAULT_BREAK_THRESHOLD_SECS, DEFAULT_LANG,
    DEFAULT_PAUSE_AFTER_QUESTION, DEFAULT_PAUSE_FACTOR, MAX_RATE, MIN_RATE, PlaybackSettings,
    PlaybackSettingsDraft, clamp_rate,
};
