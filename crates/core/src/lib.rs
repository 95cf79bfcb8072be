#![forbid(unsafe_code)]

pub mod error;
pub mod machine;
pub mod messages;
pub mod model;
pub mod parse;
pub mod time;

pub use error::{ContentError, SettingsError};
pub use machine::{
    Effect, PlaybackEvent, PlaybackMachine, ResumeToken, SpeechOutcome, TickKind, UtteranceId,
};
pub use messages::{Artwork, BridgeMessage, NowPlaying, TransportCommand, Visibility};
pub use time::Clock;
