//! Device-backed capability adapters.
//!
//! Each opener falls back to its console counterpart when the host has no
//! usable device, so a session always starts.

use std::path::Path;

use services::{BreakAudio, MediaSession, SpeechEngine};
use tracing::{info, warn};

use crate::console::{ConsoleAudio, ConsoleSpeech, HeadlessMediaSession};

#[cfg(feature = "sound")]
mod audio;
#[cfg(feature = "media-controls")]
mod media;
mod speech;

pub struct Devices {
    pub speech: Box<dyn SpeechEngine>,
    pub audio: Box<dyn BreakAudio>,
    pub media: Box<dyn MediaSession>,
}

impl Devices {
    pub fn open(songs_dir: &Path) -> Self {
        Self {
            speech: speech_engine(),
            audio: break_audio(songs_dir),
            media: media_session(),
        }
    }

    /// Terminal-only adapters, no devices touched.
    pub fn console(songs_dir: &Path) -> Self {
        Self {
            speech: Box::new(ConsoleSpeech::default()),
            audio: Box::new(ConsoleAudio::new(songs_dir)),
            media: Box::new(HeadlessMediaSession),
        }
    }
}

fn speech_engine() -> Box<dyn SpeechEngine> {
    match speech::SystemSpeech::open() {
        Ok(engine) => {
            info!("speaking through the system speech engine");
            Box::new(engine)
        }
        Err(err) => {
            warn!(%err, "system speech unavailable; printing narration instead");
            Box::new(ConsoleSpeech::default())
        }
    }
}

#[cfg(feature = "sound")]
fn break_audio(songs_dir: &Path) -> Box<dyn BreakAudio> {
    match audio::RodioAudio::open(songs_dir) {
        Ok(audio) => Box::new(audio),
        Err(err) => {
            warn!(%err, "no audio output; break music will only be logged");
            Box::new(ConsoleAudio::new(songs_dir))
        }
    }
}

#[cfg(not(feature = "sound"))]
fn break_audio(songs_dir: &Path) -> Box<dyn BreakAudio> {
    Box::new(ConsoleAudio::new(songs_dir))
}

#[cfg(feature = "media-controls")]
fn media_session() -> Box<dyn MediaSession> {
    match media::SouvlakiSession::open() {
        Ok(session) => {
            info!("media keys attached");
            Box::new(session)
        }
        Err(err) => {
            warn!(%err, "no system media session");
            Box::new(HeadlessMediaSession)
        }
    }
}

#[cfg(not(feature = "media-controls"))]
fn media_session() -> Box<dyn MediaSession> {
    Box::new(HeadlessMediaSession)
}
