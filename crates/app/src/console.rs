//! Terminal adapters for the playback capabilities.
//!
//! Used with `--console` and whenever a device adapter cannot open. Narration
//! is printed instead of synthesized; each utterance "lasts" as long as it
//! would take to read it aloud at the current rate. The headless media
//! session and wake lock report themselves unavailable.

use std::path::PathBuf;
use std::time::Duration;

use narrator_core::model::{Mode, Part, TrackName};
use narrator_core::time::format_clock;
use narrator_core::{NowPlaying, PlaybackEvent, SpeechOutcome, Visibility};
use services::{
    ActionHandler, BreakAudio, CapabilityError, MediaSession, PlaybackObserver, SpeechCallback,
    SpeechEngine, SpeechRequest, TransportAction, TransportState, WakeLock,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const WORDS_PER_SECOND: f32 = 2.5;
const MIN_UTTERANCE: Duration = Duration::from_millis(400);

pub(crate) fn speaking_time(text: &str, rate: f32) -> Duration {
    let words = text.split_whitespace().count().max(1) as f32;
    Duration::from_secs_f32(words / (WORDS_PER_SECOND * rate.max(0.1))).max(MIN_UTTERANCE)
}

#[derive(Default)]
pub struct ConsoleSpeech {
    current: Option<JoinHandle<()>>,
}

impl SpeechEngine for ConsoleSpeech {
    fn speak(
        &mut self,
        request: SpeechRequest,
        on_done: SpeechCallback,
    ) -> Result<(), CapabilityError> {
        self.cancel_all();
        println!("  {}", request.text);
        let duration = speaking_time(&request.text, request.rate);
        self.current = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            on_done(SpeechOutcome::Finished);
        }));
        Ok(())
    }

    fn cancel_all(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.abort();
        }
    }
}

/// Logs break music instead of playing it.
pub struct ConsoleAudio {
    songs_dir: PathBuf,
    track: Option<TrackName>,
}

impl ConsoleAudio {
    pub fn new(songs_dir: impl Into<PathBuf>) -> Self {
        Self {
            songs_dir: songs_dir.into(),
            track: None,
        }
    }
}

impl BreakAudio for ConsoleAudio {
    fn load(&mut self, track: &TrackName) -> Result<(), CapabilityError> {
        let path = self.songs_dir.join(track.as_str());
        if !path.is_file() {
            return Err(CapabilityError::Failed(format!(
                "{} does not exist",
                path.display()
            )));
        }
        debug!(path = %path.display(), "break track loaded");
        self.track = Some(track.clone());
        Ok(())
    }

    fn play(&mut self) -> Result<(), CapabilityError> {
        let track = self
            .track
            .as_ref()
            .ok_or(CapabilityError::Failed("no track loaded".into()))?;
        info!(%track, "break music playing");
        Ok(())
    }

    fn pause(&mut self) {
        debug!("break music paused");
    }

    fn reset(&mut self) {}
}

pub struct HeadlessMediaSession;

impl MediaSession for HeadlessMediaSession {
    fn is_available(&self) -> bool {
        false
    }

    fn set_metadata(&mut self, _now_playing: &NowPlaying) {}

    fn set_playback_state(&mut self, _state: TransportState) {}

    fn set_action_handler(&mut self, _action: TransportAction, _handler: ActionHandler) {}
}

pub struct HeadlessWakeLock;

impl WakeLock for HeadlessWakeLock {
    fn request(&mut self) -> Result<(), CapabilityError> {
        Err(CapabilityError::Unavailable("screen wake lock"))
    }

    fn release(&mut self) {}
}

/// Prints position and mode changes as they happen.
pub struct ConsoleObserver {
    total: usize,
}

impl ConsoleObserver {
    pub fn new(total: usize) -> Self {
        Self { total }
    }
}

impl PlaybackObserver for ConsoleObserver {
    fn on_items_changed(&self, index: usize, part: Part) {
        println!("[{}/{}] {}", index + 1, self.total, part.as_str());
    }

    fn on_timers_changed(&self, study_secs: u64, break_secs: i64) {
        let study = i64::try_from(study_secs).unwrap_or(i64::MAX);
        debug!(
            study = %format_clock(study),
            countdown = %format_clock(break_secs),
            "timers"
        );
    }

    fn on_mode_changed(&self, mode: Mode) {
        match mode {
            Mode::OnBreak => println!("-- break time --"),
            Mode::Studying => println!("-- studying --"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Event(PlaybackEvent),
    Quit,
    Help,
}

pub const HELP: &str = "p play/pause | n next | b back | <number> jump to item | r <rate> speed | h hide | s show | q quit";

/// Parse one line typed at the prompt. Item numbers are 1-based.
pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    let (head, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(head, rest)| (head, rest.trim()));

    let command = match head {
        "p" => ConsoleCommand::Event(PlaybackEvent::TogglePlayPause),
        "n" => ConsoleCommand::Event(PlaybackEvent::Skip),
        "b" => ConsoleCommand::Event(PlaybackEvent::Previous),
        "h" => ConsoleCommand::Event(PlaybackEvent::VisibilityChanged(Visibility::Hidden)),
        "s" => ConsoleCommand::Event(PlaybackEvent::VisibilityChanged(Visibility::Visible)),
        "r" => ConsoleCommand::Event(PlaybackEvent::SetRate(rest.parse().ok()?)),
        "q" => ConsoleCommand::Quit,
        "?" | "help" => ConsoleCommand::Help,
        number => {
            let item: usize = number.parse().ok()?;
            ConsoleCommand::Event(PlaybackEvent::Select(item.checked_sub(1)?))
        }
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prompt_commands() {
        assert_eq!(
            parse_command(" p "),
            Some(ConsoleCommand::Event(PlaybackEvent::TogglePlayPause))
        );
        assert_eq!(
            parse_command("3"),
            Some(ConsoleCommand::Event(PlaybackEvent::Select(2)))
        );
        assert_eq!(
            parse_command("r 1.5"),
            Some(ConsoleCommand::Event(PlaybackEvent::SetRate(1.5)))
        );
        assert_eq!(parse_command("q"), Some(ConsoleCommand::Quit));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_command("0"), None);
        assert_eq!(parse_command("r fast"), None);
        assert_eq!(parse_command("jump"), None);
    }

    #[test]
    fn speaking_time_scales_with_rate() {
        let text = "one two three four five six seven eight nine ten";
        assert_eq!(speaking_time(text, 1.0), Duration::from_secs(4));
        assert_eq!(speaking_time(text, 2.0), Duration::from_secs(2));
        assert_eq!(speaking_time("hi", 2.0), MIN_UTTERANCE);
    }

    #[test]
    fn missing_track_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut audio = ConsoleAudio::new(dir.path());
        assert!(audio.load(&TrackName::new("absent.mp3")).is_err());

        std::fs::write(dir.path().join("calm.mp3"), b"").unwrap();
        audio.load(&TrackName::new("calm.mp3")).unwrap();
        assert!(audio.play().is_ok());
    }
}
