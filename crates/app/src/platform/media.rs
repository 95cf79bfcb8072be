//! OS "now playing" integration through souvlaki: MPRIS on Linux, SMTC on
//! Windows and the now-playing center on macOS.
//!
//! `MediaControls` is not `Send` on every platform, so it lives on its own
//! thread and is driven through a command channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use narrator_core::NowPlaying;
use services::{ActionHandler, CapabilityError, MediaSession, TransportAction, TransportState};
use souvlaki::{MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, PlatformConfig};
use tracing::debug;

const DBUS_NAME: &str = "study_narrator";
const DISPLAY_NAME: &str = "Study Narrator";

/// Resolve an OS media event to a transport action. `Toggle` flips the last
/// published state.
pub fn action_for(event: &MediaControlEvent, state: TransportState) -> Option<TransportAction> {
    match event {
        MediaControlEvent::Play => Some(TransportAction::Play),
        MediaControlEvent::Pause | MediaControlEvent::Stop => Some(TransportAction::Pause),
        MediaControlEvent::Toggle if state == TransportState::Playing => {
            Some(TransportAction::Pause)
        }
        MediaControlEvent::Toggle => Some(TransportAction::Play),
        MediaControlEvent::Next => Some(TransportAction::NextTrack),
        MediaControlEvent::Previous => Some(TransportAction::PreviousTrack),
        _ => None,
    }
}

fn playback(state: TransportState) -> MediaPlayback {
    match state {
        TransportState::Playing => MediaPlayback::Playing { progress: None },
        TransportState::Paused => MediaPlayback::Paused { progress: None },
        TransportState::None => MediaPlayback::Stopped,
    }
}

/// Routes OS events to whichever handlers the bridge registered.
#[derive(Clone)]
struct EventRouter {
    handlers: Arc<Mutex<HashMap<TransportAction, ActionHandler>>>,
    state: Arc<Mutex<TransportState>>,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self {
            handlers: Arc::default(),
            state: Arc::new(Mutex::new(TransportState::None)),
        }
    }
}

impl EventRouter {
    fn dispatch(&self, event: &MediaControlEvent) {
        let state = self
            .state
            .lock()
            .map_or(TransportState::None, |state| *state);
        let Some(action) = action_for(event, state) else {
            debug!(?event, "media event ignored");
            return;
        };
        match self.handlers.lock() {
            Ok(handlers) => match handlers.get(&action) {
                Some(handler) => handler(),
                None => debug!(?action, "no handler registered"),
            },
            Err(_) => debug!(?action, "media handlers unavailable"),
        }
    }

    fn register(&self, action: TransportAction, handler: ActionHandler) {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.insert(action, handler);
        }
    }

    fn publish(&self, state: TransportState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }
}

enum SessionCommand {
    Metadata(NowPlaying),
    Playback(TransportState),
}

fn start_controls(router: EventRouter) -> Result<MediaControls, String> {
    let config = PlatformConfig {
        dbus_name: DBUS_NAME,
        display_name: DISPLAY_NAME,
        hwnd: None,
    };
    let mut controls = MediaControls::new(config).map_err(|err| format!("{err:?}"))?;
    controls
        .attach(move |event: MediaControlEvent| router.dispatch(&event))
        .map_err(|err| format!("{err:?}"))?;
    Ok(controls)
}

fn apply(controls: &mut MediaControls, command: SessionCommand) {
    let result = match command {
        SessionCommand::Metadata(now_playing) => controls.set_metadata(MediaMetadata {
            title: Some(now_playing.title.as_str()),
            artist: Some(now_playing.subject.as_str()),
            album: Some(now_playing.album.as_str()),
            ..MediaMetadata::default()
        }),
        SessionCommand::Playback(state) => controls.set_playback(playback(state)),
    };
    if let Err(err) = result {
        debug!(?err, "media session update failed");
    }
}

/// System media session backed by souvlaki.
pub struct SouvlakiSession {
    commands: mpsc::Sender<SessionCommand>,
    router: EventRouter,
}

impl SouvlakiSession {
    /// # Errors
    ///
    /// Returns `CapabilityError::Failed` when the platform refuses to publish
    /// a media session (no session bus, no window handle on Windows).
    pub fn open() -> Result<Self, CapabilityError> {
        let router = EventRouter::default();
        let (commands, inbox) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let events = router.clone();

        thread::Builder::new()
            .name("media-session".into())
            .spawn(move || {
                let mut controls = match start_controls(events) {
                    Ok(controls) => controls,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() {
                    return;
                }
                for command in inbox {
                    apply(&mut controls, command);
                }
                debug!("media session closed");
            })
            .map_err(|err| CapabilityError::Failed(err.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| CapabilityError::Failed("media session thread exited".into()))?
            .map_err(|err| CapabilityError::Failed(format!("media session: {err}")))?;
        Ok(Self { commands, router })
    }

    fn send(&self, command: SessionCommand) {
        if self.commands.send(command).is_err() {
            debug!("media session thread is gone");
        }
    }
}

impl MediaSession for SouvlakiSession {
    fn is_available(&self) -> bool {
        true
    }

    fn set_metadata(&mut self, now_playing: &NowPlaying) {
        self.send(SessionCommand::Metadata(now_playing.clone()));
    }

    fn set_playback_state(&mut self, state: TransportState) {
        self.router.publish(state);
        self.send(SessionCommand::Playback(state));
    }

    fn set_action_handler(&mut self, action: TransportAction, handler: ActionHandler) {
        self.router.register(action, handler);
    }
}
