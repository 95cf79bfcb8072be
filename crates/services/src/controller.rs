use std::sync::Arc;

use narrator_core::model::{ContentSet, PlaybackSettings, PlaybackState, Subject, TrackName};
use narrator_core::{
    BridgeMessage, Effect, PlaybackEvent, PlaybackMachine, SpeechOutcome, TransportCommand,
    UtteranceId,
};
use rand::rng;
use rand::seq::IndexedRandom;
use storage::ProgressStore;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::capabilities::{
    BreakAudio, PlaybackObserver, SpeechCallback, SpeechEngine, SpeechRequest, TimerScheduler,
};
use crate::runtime::EventSender;

/// Host facilities handed to a controller at creation.
pub struct Capabilities {
    pub speech: Box<dyn SpeechEngine>,
    pub audio: Box<dyn BreakAudio>,
    pub scheduler: Box<dyn TimerScheduler>,
    pub observer: Arc<dyn PlaybackObserver>,
}

/// Owns the playback machine and carries out its effects.
///
/// Speech completions are posted back through `events`, so every transition
/// runs to completion on the caller's task before the next one starts.
pub struct PlaybackController {
    machine: PlaybackMachine,
    subject: Subject,
    speech: Box<dyn SpeechEngine>,
    audio: Box<dyn BreakAudio>,
    scheduler: Box<dyn TimerScheduler>,
    observer: Arc<dyn PlaybackObserver>,
    progress: ProgressStore,
    events: EventSender,
    bridge: Option<mpsc::UnboundedSender<BridgeMessage>>,
    break_track: Option<TrackName>,
}

impl PlaybackController {
    /// Build a controller, seeding its state from saved progress.
    ///
    /// A failed progress read is logged and treated as "no saved progress".
    pub async fn create(
        content: ContentSet,
        settings: PlaybackSettings,
        capabilities: Capabilities,
        progress: ProgressStore,
        events: EventSender,
    ) -> Self {
        let subject = content.subject().clone();
        let restored = match progress.load(&subject).await {
            Ok(restored) => restored,
            Err(err) => {
                warn!(%subject, %err, "could not read saved progress; starting fresh");
                None
            }
        };

        let speech_available = capabilities.speech.is_available();
        if !speech_available {
            warn!("speech synthesis not supported; narration is disabled");
        }

        let machine = PlaybackMachine::new(content, settings, restored)
            .with_speech_available(speech_available);
        info!(
            %subject,
            items = machine.content().len(),
            index = machine.state().current_index(),
            part = machine.state().current_part().as_str(),
            "playback controller created"
        );

        Self {
            machine,
            subject,
            speech: capabilities.speech,
            audio: capabilities.audio,
            scheduler: capabilities.scheduler,
            observer: capabilities.observer,
            progress,
            events,
            bridge: None,
            break_track: None,
        }
    }

    /// Mirror transport state to a background bridge.
    #[must_use]
    pub fn with_bridge(mut self, bridge: mpsc::UnboundedSender<BridgeMessage>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Pick and load the break track, then publish the initial state.
    pub fn start(&mut self) {
        self.break_track = self.machine.content().break_tracks().choose(&mut rng()).cloned();
        match &self.break_track {
            Some(track) => {
                if let Err(err) = self.audio.load(track) {
                    warn!(%track, %err, "could not load break track");
                }
            }
            None => debug!("no break tracks; breaks will be silent"),
        }

        for effect in self.machine.initial_effects() {
            self.notify(&effect);
        }
    }

    /// Run one transition and apply its effects in order.
    pub async fn handle_event(&mut self, event: PlaybackEvent) {
        debug!(?event, "playback event");
        let effects = self.machine.handle(event);
        self.apply(effects).await;
    }

    /// Relay an OS transport command.
    pub async fn handle_transport(&mut self, command: TransportCommand) {
        let event = match command {
            TransportCommand::Play => PlaybackEvent::Play,
            TransportCommand::Pause => PlaybackEvent::Pause,
            TransportCommand::Next => PlaybackEvent::Skip,
            TransportCommand::Previous => PlaybackEvent::Previous,
        };
        self.handle_event(event).await;
    }

    /// Stop speech, timers and music, save progress and release the bridge.
    pub async fn dispose(&mut self) {
        let effects = self.machine.shutdown();
        self.apply(effects).await;
        info!(subject = %self.subject, "playback controller disposed");
    }

    #[must_use]
    pub fn state(&self) -> &PlaybackState {
        self.machine.state()
    }

    #[must_use]
    pub fn machine(&self) -> &PlaybackMachine {
        &self.machine
    }

    #[must_use]
    pub fn break_track(&self) -> Option<&TrackName> {
        self.break_track.as_ref()
    }

    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        self.machine
            .state()
            .progress_percent(self.machine.content().len())
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Speak {
                    utterance,
                    text,
                    rate,
                    lang,
                } => self.speak(utterance, SpeechRequest { text, rate, lang }),
                Effect::CancelSpeech => self.speech.cancel_all(),
                Effect::StartTicker(kind) => self.scheduler.start_ticker(kind),
                Effect::StopTicker(kind) => self.scheduler.stop_ticker(kind),
                Effect::ScheduleResume { token, delay } => {
                    self.scheduler.schedule_resume(token, delay);
                }
                Effect::CancelResume => self.scheduler.cancel_resume(),
                Effect::PlayBreakAudio => self.play_break_audio(),
                Effect::StopBreakAudio => {
                    self.audio.pause();
                    self.audio.reset();
                }
                Effect::PersistProgress(progress) => {
                    if let Err(err) = self.progress.save(&self.subject, &progress).await {
                        error!(subject = %self.subject, %err, "failed to save progress");
                    }
                }
                Effect::Bridge(message) => self.post_bridge(message),
                notification => self.notify(&notification),
            }
        }
    }

    fn speak(&mut self, utterance: UtteranceId, request: SpeechRequest) {
        let sink = self.events.clone();
        let on_done: SpeechCallback = Box::new(move |outcome| {
            // The controller may already be gone; nothing to report to then.
            let _ = sink.send(PlaybackEvent::SpeechFinished { utterance, outcome });
        });

        if let Err(err) = self.speech.speak(request, on_done) {
            warn!(utterance = utterance.value(), %err, "speech request refused");
            let _ = self.events.send(PlaybackEvent::SpeechFinished {
                utterance,
                outcome: SpeechOutcome::Failed(err.to_string()),
            });
        }
    }

    fn play_break_audio(&mut self) {
        if self.break_track.is_none() {
            info!("break started without music");
            return;
        }
        if let Err(err) = self.audio.play() {
            error!(%err, "error playing break audio");
        }
    }

    fn post_bridge(&self, message: BridgeMessage) {
        let Some(bridge) = &self.bridge else {
            return;
        };
        if bridge.send(message).is_err() {
            debug!("background bridge is gone; message dropped");
        }
    }

    fn notify(&self, effect: &Effect) {
        match effect {
            Effect::ItemsChanged { index, part } => self.observer.on_items_changed(*index, *part),
            Effect::TimersChanged {
                study_secs,
                break_secs,
            } => self.observer.on_timers_changed(*study_secs, *break_secs),
            Effect::ModeChanged(mode) => self.observer.on_mode_changed(*mode),
            _ => {}
        }
    }
}
