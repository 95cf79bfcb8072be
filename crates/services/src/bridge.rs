//! Background control bridge.
//!
//! Runs beside the controller and owns the OS media session and wake lock.
//! It only talks to the controller through messages: `BridgeMessage` in,
//! `TransportCommand` out.

use narrator_core::{BridgeMessage, TransportCommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::capabilities::{
    ActionHandler, MediaSession, TransportAction, TransportState, WakeLock,
};
use crate::error::CapabilityError;

pub struct BackgroundBridge {
    media: Box<dyn MediaSession>,
    wake_lock: Box<dyn WakeLock>,
    transport: mpsc::UnboundedSender<TransportCommand>,
    media_session_active: bool,
}

impl BackgroundBridge {
    #[must_use]
    pub fn new(
        media: Box<dyn MediaSession>,
        wake_lock: Box<dyn WakeLock>,
        transport: mpsc::UnboundedSender<TransportCommand>,
    ) -> Self {
        Self {
            media,
            wake_lock,
            transport,
            media_session_active: false,
        }
    }

    #[must_use]
    pub fn media_session_active(&self) -> bool {
        self.media_session_active
    }

    /// Apply one controller message to the platform.
    pub fn handle(&mut self, message: BridgeMessage) {
        match message {
            BridgeMessage::PlayAudio(now_playing) => {
                if !self.media.is_available() {
                    debug!("media session unavailable; PLAY_AUDIO ignored");
                    return;
                }
                self.media.set_metadata(&now_playing);
                self.media.set_playback_state(TransportState::Playing);
                if !self.media_session_active {
                    self.register_handlers();
                }
                self.media_session_active = true;
            }
            BridgeMessage::PauseAudio => {
                if self.media_session_active {
                    self.media.set_playback_state(TransportState::Paused);
                }
            }
            BridgeMessage::StopAudio => {
                if self.media_session_active {
                    self.media.set_playback_state(TransportState::None);
                    self.media_session_active = false;
                }
                self.wake_lock.release();
            }
            BridgeMessage::VisibilityChanged { visible } => {
                if visible {
                    self.acquire_wake_lock();
                }
            }
        }
    }

    /// Acquire the wake lock, then apply messages until the controller
    /// side hangs up.
    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<BridgeMessage>) {
        self.acquire_wake_lock();
        while let Some(message) = inbox.recv().await {
            self.handle(message);
        }
        self.wake_lock.release();
        debug!("background bridge stopped");
    }

    fn acquire_wake_lock(&mut self) {
        match self.wake_lock.request() {
            Ok(()) => info!("wake lock acquired"),
            Err(CapabilityError::Unavailable(what)) => warn!(what, "wake lock not supported"),
            Err(err) => warn!(%err, "wake lock request failed"),
        }
    }

    fn register_handlers(&mut self) {
        let actions = [
            (TransportAction::Play, TransportCommand::Play),
            (TransportAction::Pause, TransportCommand::Pause),
            (TransportAction::NextTrack, TransportCommand::Next),
            (TransportAction::PreviousTrack, TransportCommand::Previous),
        ];
        for (action, command) in actions {
            let transport = self.transport.clone();
            let handler: ActionHandler = Box::new(move || {
                if transport.send(command).is_err() {
                    debug!(?command, "controller is gone; transport command dropped");
                }
            });
            self.media.set_action_handler(action, handler);
        }
    }
}

/// Spawn a bridge task. Returns the sender the controller posts to and the
/// task handle; dropping every sender stops the bridge.
pub fn spawn_bridge(
    media: Box<dyn MediaSession>,
    wake_lock: Box<dyn WakeLock>,
    transport: mpsc::UnboundedSender<TransportCommand>,
) -> (mpsc::UnboundedSender<BridgeMessage>, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let bridge = BackgroundBridge::new(media, wake_lock, transport);
    (tx, tokio::spawn(bridge.run(rx)))
}
