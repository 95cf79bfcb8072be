//! The playback state machine.
//!
//! `PlaybackMachine` owns all session state and never performs I/O. Every
//! input (user action, timer tick, speech completion, transport command) is a
//! `PlaybackEvent`; `handle` applies one transition and returns the ordered
//! list of `Effect`s the host must carry out against its capabilities.

use std::time::Duration;

use tracing::{debug, warn};

use crate::messages::{BridgeMessage, NowPlaying, Visibility};
use crate::model::{
    ContentSet, Mode, Part, PersistedProgress, PlaybackSettings, PlaybackState, clamp_rate,
};

/// Identifies one requested utterance so late completions can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(u64);

impl UtteranceId {
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Identifies one scheduled inter-part pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResumeToken(u64);

impl ResumeToken {
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickKind {
    Study,
    Break,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Finished,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    TogglePlayPause,
    Play,
    Pause,
    Skip,
    Previous,
    Select(usize),
    SpeechFinished {
        utterance: UtteranceId,
        outcome: SpeechOutcome,
    },
    PauseElapsed(ResumeToken),
    StudyTick,
    BreakTick,
    SetRate(f32),
    VisibilityChanged(Visibility),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Speak {
        utterance: UtteranceId,
        text: String,
        rate: f32,
        lang: String,
    },
    CancelSpeech,
    StartTicker(TickKind),
    StopTicker(TickKind),
    ScheduleResume {
        token: ResumeToken,
        delay: Duration,
    },
    CancelResume,
    PlayBreakAudio,
    StopBreakAudio,
    PersistProgress(PersistedProgress),
    Bridge(BridgeMessage),
    ItemsChanged {
        index: usize,
        part: Part,
    },
    TimersChanged {
        study_secs: u64,
        break_secs: i64,
    },
    ModeChanged(Mode),
}

#[derive(Debug, Clone)]
struct ActiveUtterance {
    id: UtteranceId,
    text: String,
}

pub struct PlaybackMachine {
    content: ContentSet,
    settings: PlaybackSettings,
    state: PlaybackState,
    rate: f32,
    speech_available: bool,
    utterance: Option<ActiveUtterance>,
    pending_resume: Option<ResumeToken>,
    active_ticker: Option<TickKind>,
    next_id: u64,
}

impl PlaybackMachine {
    /// Build a machine, seeding position and elapsed time from `restored`
    /// when it fits the content set.
    #[must_use]
    pub fn new(
        content: ContentSet,
        settings: PlaybackSettings,
        restored: Option<PersistedProgress>,
    ) -> Self {
        let threshold = settings.break_threshold_secs();
        let state = match restored {
            Some(progress) => PlaybackState::from_progress(progress, content.len(), threshold)
                .unwrap_or_else(|| {
                    warn!(
                        subject = %content.subject(),
                        index = progress.index,
                        items = content.len(),
                        "saved progress does not fit content; starting from the beginning"
                    );
                    PlaybackState::new(threshold)
                }),
            None => PlaybackState::new(threshold),
        };

        Self {
            rate: settings.speech_rate(),
            content,
            settings,
            state,
            speech_available: true,
            utterance: None,
            pending_resume: None,
            active_ticker: None,
            next_id: 0,
        }
    }

    /// Mark whether a speech capability exists. Without one, narration
    /// requests are dropped and the rest of the machine keeps working.
    #[must_use]
    pub fn with_speech_available(mut self, available: bool) -> Self {
        self.speech_available = available;
        self
    }

    #[must_use]
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    #[must_use]
    pub fn content(&self) -> &ContentSet {
        &self.content
    }

    #[must_use]
    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    #[must_use]
    pub fn rate(&self) -> f32 {
        self.rate
    }

    #[must_use]
    pub fn active_ticker(&self) -> Option<TickKind> {
        self.active_ticker
    }

    #[must_use]
    pub fn current_utterance(&self) -> Option<UtteranceId> {
        self.utterance.as_ref().map(|u| u.id)
    }

    #[must_use]
    pub fn pending_resume(&self) -> Option<ResumeToken> {
        self.pending_resume
    }

    #[must_use]
    pub fn progress(&self) -> PersistedProgress {
        self.state.to_progress()
    }

    /// Notifications describing the initial state, for the presentation layer.
    #[must_use]
    pub fn initial_effects(&self) -> Vec<Effect> {
        vec![
            self.items_changed(),
            self.timers_changed(),
            Effect::ModeChanged(self.state.mode()),
        ]
    }

    pub fn handle(&mut self, event: PlaybackEvent) -> Vec<Effect> {
        let mut fx = Vec::new();
        match event {
            PlaybackEvent::TogglePlayPause => {
                if self.state.is_on_break() {
                    self.end_break(&mut fx);
                } else if self.state.is_playing() {
                    self.pause(&mut fx);
                } else {
                    self.play(&mut fx);
                }
            }
            PlaybackEvent::Play => {
                if self.state.is_on_break() {
                    self.end_break(&mut fx);
                } else if !self.state.is_playing() {
                    self.play(&mut fx);
                }
            }
            PlaybackEvent::Pause => {
                if self.state.is_on_break() {
                    self.end_break(&mut fx);
                } else if self.state.is_playing() {
                    self.pause(&mut fx);
                }
            }
            PlaybackEvent::Skip => self.step(&mut fx, true),
            PlaybackEvent::Previous => self.step(&mut fx, false),
            PlaybackEvent::Select(index) => self.select(&mut fx, index),
            PlaybackEvent::SpeechFinished { utterance, outcome } => {
                self.speech_finished(&mut fx, utterance, outcome);
            }
            PlaybackEvent::PauseElapsed(token) => self.pause_elapsed(&mut fx, token),
            PlaybackEvent::StudyTick => self.study_tick(&mut fx),
            PlaybackEvent::BreakTick => self.break_tick(&mut fx),
            PlaybackEvent::SetRate(rate) => self.set_rate(&mut fx, rate),
            PlaybackEvent::VisibilityChanged(visibility) => {
                fx.push(Effect::Bridge(BridgeMessage::VisibilityChanged {
                    visible: visibility == Visibility::Visible,
                }));
                if visibility == Visibility::Hidden
                    && self.state.is_playing()
                    && !self.state.is_on_break()
                {
                    fx.push(Effect::PersistProgress(self.progress()));
                }
            }
        }
        fx
    }

    /// Quiesce everything: no speech, no tickers, no pending pause, no music.
    pub fn shutdown(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.cancel_speech(&mut fx);
        if let Some(kind) = self.active_ticker.take() {
            fx.push(Effect::StopTicker(kind));
        }
        if self.state.is_on_break() {
            fx.push(Effect::StopBreakAudio);
        }
        fx.push(Effect::PersistProgress(self.progress()));
        fx.push(Effect::Bridge(BridgeMessage::StopAudio));
        fx
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    fn play(&mut self, fx: &mut Vec<Effect>) {
        self.state.set_playing(true);
        self.speak_current(fx);
        self.start_ticker(fx, TickKind::Study);
        fx.push(Effect::Bridge(BridgeMessage::PlayAudio(
            NowPlaying::for_subject(self.content.subject()),
        )));
    }

    fn pause(&mut self, fx: &mut Vec<Effect>) {
        self.state.set_playing(false);
        self.cancel_speech(fx);
        self.stop_ticker(fx, TickKind::Study);
        fx.push(Effect::Bridge(BridgeMessage::PauseAudio));
    }

    fn step(&mut self, fx: &mut Vec<Effect>, forward: bool) {
        if self.state.is_on_break() {
            debug!(forward, "step ignored while on break");
            return;
        }
        self.cancel_speech(fx);
        if forward {
            self.state.advance(self.content.len());
        } else {
            self.state.step_back(self.content.len());
        }
        fx.push(self.items_changed());
        if self.state.is_playing() {
            self.speak_current(fx);
        }
    }

    fn select(&mut self, fx: &mut Vec<Effect>, index: usize) {
        if index >= self.content.len() {
            warn!(index, items = self.content.len(), "selection out of range ignored");
            return;
        }
        self.cancel_speech(fx);
        self.state.set_position(index, Part::Question);
        fx.push(self.items_changed());
        if self.state.is_playing() && !self.state.is_on_break() {
            self.speak_current(fx);
        }
    }

    fn speech_finished(
        &mut self,
        fx: &mut Vec<Effect>,
        utterance: UtteranceId,
        outcome: SpeechOutcome,
    ) {
        if self.current_utterance() != Some(utterance) {
            debug!(utterance = utterance.value(), "stale speech completion ignored");
            return;
        }
        self.utterance = None;

        if let SpeechOutcome::Failed(reason) = &outcome {
            warn!(utterance = utterance.value(), %reason, "speech failed; continuing as finished");
        }
        if self.state.is_on_break() {
            return;
        }

        let delay = match self.state.current_part() {
            Part::Question => self.settings.pause_after_question(),
            Part::Answer => self.settings.pause_after_answer(),
        };
        self.state.advance(self.content.len());
        fx.push(self.items_changed());

        let token = ResumeToken(self.bump_id());
        self.pending_resume = Some(token);
        fx.push(Effect::ScheduleResume { token, delay });
    }

    fn pause_elapsed(&mut self, fx: &mut Vec<Effect>, token: ResumeToken) {
        if self.pending_resume != Some(token) {
            debug!(token = token.value(), "stale resume ignored");
            return;
        }
        self.pending_resume = None;
        if self.state.is_playing() && !self.state.is_on_break() {
            self.speak_current(fx);
        }
    }

    fn study_tick(&mut self, fx: &mut Vec<Effect>) {
        if self.active_ticker != Some(TickKind::Study)
            || self.state.is_on_break()
            || !self.state.is_playing()
        {
            debug!("study tick ignored; study ticker is not active");
            return;
        }
        self.state.tick_study();
        fx.push(self.timers_changed());
        fx.push(Effect::PersistProgress(self.progress()));

        if self.state.break_countdown_secs() <= 0 {
            self.start_break(fx);
        }
    }

    fn break_tick(&mut self, fx: &mut Vec<Effect>) {
        if self.active_ticker != Some(TickKind::Break) || !self.state.is_on_break() {
            debug!("break tick ignored; break ticker is not active");
            return;
        }
        self.state.tick_break();
        fx.push(self.timers_changed());

        if self.state.break_remaining_secs() <= 0 {
            self.end_break(fx);
        }
    }

    fn start_break(&mut self, fx: &mut Vec<Effect>) {
        self.cancel_speech(fx);
        self.stop_ticker(fx, TickKind::Study);
        self.state.begin_break(self.settings.break_duration_secs());
        fx.push(Effect::ModeChanged(Mode::OnBreak));
        fx.push(self.timers_changed());
        fx.push(Effect::PlayBreakAudio);
        self.start_ticker(fx, TickKind::Break);
    }

    fn end_break(&mut self, fx: &mut Vec<Effect>) {
        self.stop_ticker(fx, TickKind::Break);
        fx.push(Effect::StopBreakAudio);
        self.state.finish_break(self.settings.break_threshold_secs());
        fx.push(Effect::ModeChanged(Mode::Studying));
        fx.push(self.timers_changed());

        if self.state.is_playing() {
            self.speak_current(fx);
            self.start_ticker(fx, TickKind::Study);
        }
    }

    fn set_rate(&mut self, fx: &mut Vec<Effect>, rate: f32) {
        self.rate = clamp_rate(rate);
        let Some(active) = self.utterance.take() else {
            return;
        };
        fx.push(Effect::CancelSpeech);
        self.request_speech(fx, active.text);
    }

    //
    // ─── HELPERS ───────────────────────────────────────────────────────────────
    //

    fn speak_current(&mut self, fx: &mut Vec<Effect>) {
        if self.pending_resume.take().is_some() {
            fx.push(Effect::CancelResume);
        }
        if !self.speech_available {
            debug!("speech capability unavailable; narration skipped");
            return;
        }
        let text = self
            .content
            .text_for(self.state.current_index(), self.state.current_part())
            .unwrap_or_default()
            .to_string();
        self.request_speech(fx, text);
    }

    fn request_speech(&mut self, fx: &mut Vec<Effect>, text: String) {
        let id = UtteranceId(self.bump_id());
        self.utterance = Some(ActiveUtterance {
            id,
            text: text.clone(),
        });
        fx.push(Effect::Speak {
            utterance: id,
            text,
            rate: self.rate,
            lang: self.settings.lang().to_string(),
        });
    }

    fn cancel_speech(&mut self, fx: &mut Vec<Effect>) {
        self.utterance = None;
        if self.pending_resume.take().is_some() {
            fx.push(Effect::CancelResume);
        }
        fx.push(Effect::CancelSpeech);
    }

    fn start_ticker(&mut self, fx: &mut Vec<Effect>, kind: TickKind) {
        match self.active_ticker {
            Some(active) if active == kind => return,
            Some(other) => fx.push(Effect::StopTicker(other)),
            None => {}
        }
        self.active_ticker = Some(kind);
        fx.push(Effect::StartTicker(kind));
    }

    fn stop_ticker(&mut self, fx: &mut Vec<Effect>, kind: TickKind) {
        if self.active_ticker == Some(kind) {
            self.active_ticker = None;
            fx.push(Effect::StopTicker(kind));
        }
    }

    fn items_changed(&self) -> Effect {
        Effect::ItemsChanged {
            index: self.state.current_index(),
            part: self.state.current_part(),
        }
    }

    fn timers_changed(&self) -> Effect {
        Effect::TimersChanged {
            study_secs: self.state.study_elapsed_secs(),
            break_secs: self.state.break_display_secs(),
        }
    }

    fn bump_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}
