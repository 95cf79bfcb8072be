//! Platform capabilities the controller and bridge drive.
//!
//! Each trait is the narrow seam to one host facility. Hosts supply real
//! adapters; tests supply recording fakes.

use std::time::Duration;

use narrator_core::model::{Mode, Part, TrackName};
use narrator_core::{NowPlaying, ResumeToken, SpeechOutcome, TickKind};

use crate::error::CapabilityError;

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub rate: f32,
    pub lang: String,
}

/// Invoked exactly once when an accepted utterance ends or fails.
pub type SpeechCallback = Box<dyn FnOnce(SpeechOutcome) + Send>;

/// Text-to-speech.
pub trait SpeechEngine: Send {
    fn is_available(&self) -> bool {
        true
    }

    /// Start narrating `request`, implicitly cancelling any in-flight utterance.
    ///
    /// Completion is reported through `on_done`, asynchronously.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError` if the request is refused outright; `on_done`
    /// is then dropped without being called.
    fn speak(&mut self, request: SpeechRequest, on_done: SpeechCallback)
    -> Result<(), CapabilityError>;

    fn cancel_all(&mut self);
}

/// Break-music playback.
pub trait BreakAudio: Send {
    /// # Errors
    ///
    /// Returns `CapabilityError` if the track cannot be loaded.
    fn load(&mut self, track: &TrackName) -> Result<(), CapabilityError>;

    /// # Errors
    ///
    /// Returns `CapabilityError` if playback cannot start.
    fn play(&mut self) -> Result<(), CapabilityError>;

    fn pause(&mut self);

    /// Rewind to the start of the loaded track.
    fn reset(&mut self);
}

/// Periodic ticks and one-shot resume timers.
///
/// Implementations post `StudyTick`, `BreakTick` and `PauseElapsed` events
/// back to the controller.
pub trait TimerScheduler: Send {
    /// Start the ticker of `kind`, replacing a running one of the same kind.
    fn start_ticker(&mut self, kind: TickKind);

    fn stop_ticker(&mut self, kind: TickKind);

    /// Fire `PauseElapsed(token)` after `delay`, replacing any pending resume.
    fn schedule_resume(&mut self, token: ResumeToken, delay: Duration);

    fn cancel_resume(&mut self);
}

/// UI consumption surface. All methods default to no-ops.
pub trait PlaybackObserver: Send + Sync {
    fn on_items_changed(&self, _index: usize, _part: Part) {}

    fn on_timers_changed(&self, _study_secs: u64, _break_secs: i64) {}

    fn on_mode_changed(&self, _mode: Mode) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PlaybackObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportAction {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportState {
    None,
    Paused,
    Playing,
}

pub type ActionHandler = Box<dyn Fn() + Send + Sync>;

/// OS media-transport integration ("now playing" + media keys).
pub trait MediaSession: Send {
    fn is_available(&self) -> bool;

    fn set_metadata(&mut self, now_playing: &NowPlaying);

    fn set_playback_state(&mut self, state: TransportState);

    /// Register `handler` for `action`, replacing any previous handler.
    fn set_action_handler(&mut self, action: TransportAction, handler: ActionHandler);
}

/// Keeps the display awake while narrating.
pub trait WakeLock: Send {
    /// # Errors
    ///
    /// Returns `CapabilityError::Unavailable` when unsupported, or
    /// `CapabilityError::Failed` when the platform refuses the lock.
    fn request(&mut self) -> Result<(), CapabilityError>;

    fn release(&mut self);
}
