#![forbid(unsafe_code)]

pub mod bridge;
pub mod capabilities;
pub mod controller;
pub mod document;
pub mod error;
pub mod library;
pub mod runtime;
pub mod scheduler;

pub use bridge::{BackgroundBridge, spawn_bridge};
pub use capabilities::{
    ActionHandler, BreakAudio, MediaSession, NoopObserver, PlaybackObserver, SpeechCallback,
    SpeechEngine, SpeechRequest, TimerScheduler, TransportAction, TransportState, WakeLock,
};
pub use controller::{Capabilities, PlaybackController};
pub use error::{CapabilityError, LibraryError};
pub use library::{ContentExport, MaterialLibrary, QaPair, SubjectEntry};
pub use runtime::{EventSender, run_controller};
pub use scheduler::TokioScheduler;
