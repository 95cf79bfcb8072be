use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use narrator_core::model::{
    ContentSet, Mode, Part, PersistedProgress, PlaybackSettings, QaItem, Subject, TrackName,
};
use narrator_core::{
    BridgeMessage, PlaybackEvent, ResumeToken, SpeechOutcome, TickKind, TransportCommand,
};
use services::{
    BreakAudio, Capabilities, CapabilityError, PlaybackController, PlaybackObserver,
    SpeechCallback, SpeechEngine, SpeechRequest, TimerScheduler,
};
use storage::{InMemoryStore, KeyValueStore, ProgressStore, StorageError};
use tokio::sync::mpsc;

#[derive(Default)]
struct SpeechLog {
    spoken: Vec<SpeechRequest>,
    pending: Option<SpeechCallback>,
    cancels: usize,
}

#[derive(Clone, Default)]
struct FakeSpeech {
    log: Arc<Mutex<SpeechLog>>,
    refuse: bool,
}

impl FakeSpeech {
    fn finish(&self, outcome: SpeechOutcome) {
        let callback = self.log.lock().unwrap().pending.take();
        if let Some(callback) = callback {
            callback(outcome);
        }
    }

    fn spoken(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .spoken
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }
}

impl SpeechEngine for FakeSpeech {
    fn speak(
        &mut self,
        request: SpeechRequest,
        on_done: SpeechCallback,
    ) -> Result<(), CapabilityError> {
        let mut log = self.log.lock().unwrap();
        log.spoken.push(request);
        if self.refuse {
            return Err(CapabilityError::Failed("voice missing".into()));
        }
        log.pending = Some(on_done);
        Ok(())
    }

    fn cancel_all(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.pending = None;
        log.cancels += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TimerCall {
    Start(TickKind),
    Stop(TickKind),
    Resume(ResumeToken, Duration),
    CancelResume,
}

#[derive(Clone, Default)]
struct RecordingScheduler {
    calls: Arc<Mutex<Vec<TimerCall>>>,
}

impl RecordingScheduler {
    fn last_resume(&self) -> Option<(ResumeToken, Duration)> {
        self.calls.lock().unwrap().iter().rev().find_map(|call| match call {
            TimerCall::Resume(token, delay) => Some((*token, *delay)),
            _ => None,
        })
    }

    fn calls(&self) -> Vec<TimerCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl TimerScheduler for RecordingScheduler {
    fn start_ticker(&mut self, kind: TickKind) {
        self.calls.lock().unwrap().push(TimerCall::Start(kind));
    }

    fn stop_ticker(&mut self, kind: TickKind) {
        self.calls.lock().unwrap().push(TimerCall::Stop(kind));
    }

    fn schedule_resume(&mut self, token: ResumeToken, delay: Duration) {
        self.calls
            .lock()
            .unwrap()
            .push(TimerCall::Resume(token, delay));
    }

    fn cancel_resume(&mut self) {
        self.calls.lock().unwrap().push(TimerCall::CancelResume);
    }
}

#[derive(Clone, Default)]
struct FakeAudio {
    loaded: Arc<Mutex<Vec<String>>>,
    playing: Arc<Mutex<bool>>,
}

impl BreakAudio for FakeAudio {
    fn load(&mut self, track: &TrackName) -> Result<(), CapabilityError> {
        self.loaded.lock().unwrap().push(track.as_str().to_string());
        Ok(())
    }

    fn play(&mut self) -> Result<(), CapabilityError> {
        *self.playing.lock().unwrap() = true;
        Ok(())
    }

    fn pause(&mut self) {
        *self.playing.lock().unwrap() = false;
    }

    fn reset(&mut self) {}
}

#[derive(Default)]
struct RecordingObserver {
    items: Mutex<Vec<(usize, Part)>>,
    modes: Mutex<Vec<Mode>>,
}

impl PlaybackObserver for RecordingObserver {
    fn on_items_changed(&self, index: usize, part: Part) {
        self.items.lock().unwrap().push((index, part));
    }

    fn on_mode_changed(&self, mode: Mode) {
        self.modes.lock().unwrap().push(mode);
    }
}

struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Connection("disk unplugged".into()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk unplugged".into()))
    }
}

struct Harness {
    controller: PlaybackController,
    events: mpsc::UnboundedReceiver<PlaybackEvent>,
    speech: FakeSpeech,
    scheduler: RecordingScheduler,
    audio: FakeAudio,
    observer: Arc<RecordingObserver>,
}

impl Harness {
    async fn new(items: usize, kv: Arc<dyn KeyValueStore>, speech: FakeSpeech) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = RecordingScheduler::default();
        let audio = FakeAudio::default();
        let observer = Arc::new(RecordingObserver::default());

        let mut controller = PlaybackController::create(
            content(items),
            PlaybackSettings::default(),
            Capabilities {
                speech: Box::new(speech.clone()),
                audio: Box::new(audio.clone()),
                scheduler: Box::new(scheduler.clone()),
                observer: observer.clone(),
            },
            ProgressStore::new(kv),
            tx,
        )
        .await;
        controller.start();

        Self {
            controller,
            events: rx,
            speech,
            scheduler,
            audio,
            observer,
        }
    }

    /// Feed every queued event (speech completions) back into the controller.
    async fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.controller.handle_event(event).await;
        }
    }

    /// Finish the current utterance and let the inter-part pause elapse.
    async fn complete_utterance(&mut self) {
        self.speech.finish(SpeechOutcome::Finished);
        self.pump().await;
        let (token, _) = self.scheduler.last_resume().expect("resume scheduled");
        self.controller
            .handle_event(PlaybackEvent::PauseElapsed(token))
            .await;
    }
}

fn content(items: usize) -> ContentSet {
    ContentSet::new(
        Subject::parse("astronomy").unwrap(),
        (0..items)
            .map(|i| QaItem::new(format!("Question {i}?"), format!("Answer {i}.")))
            .collect(),
        vec![TrackName::new("calm.mp3")],
    )
    .unwrap()
}

fn subject() -> Subject {
    Subject::parse("astronomy").unwrap()
}

#[tokio::test]
async fn narration_alternates_question_and_answer() {
    let mut h = Harness::new(5, Arc::new(InMemoryStore::new()), FakeSpeech::default()).await;

    h.controller.handle_event(PlaybackEvent::Play).await;
    for _ in 0..4 {
        h.complete_utterance().await;
    }

    assert_eq!(
        h.speech.spoken(),
        vec!["Question 0?", "Answer 0.", "Question 1?", "Answer 1.", "Question 2?"]
    );
    let items = h.observer.items.lock().unwrap().clone();
    assert_eq!(
        &items[items.len() - 4..],
        &[
            (0, Part::Answer),
            (1, Part::Question),
            (1, Part::Answer),
            (2, Part::Question)
        ]
    );
    assert_eq!(h.audio.loaded.lock().unwrap().as_slice(), ["calm.mp3"]);
}

#[tokio::test]
async fn pauses_between_parts_follow_settings() {
    let mut h = Harness::new(3, Arc::new(InMemoryStore::new()), FakeSpeech::default()).await;
    h.controller.handle_event(PlaybackEvent::Play).await;

    h.speech.finish(SpeechOutcome::Finished);
    h.pump().await;
    assert_eq!(
        h.scheduler.last_resume().map(|(_, d)| d),
        Some(Duration::from_millis(1000))
    );

    let (token, _) = h.scheduler.last_resume().unwrap();
    h.controller
        .handle_event(PlaybackEvent::PauseElapsed(token))
        .await;
    h.speech.finish(SpeechOutcome::Finished);
    h.pump().await;
    assert_eq!(
        h.scheduler.last_resume().map(|(_, d)| d),
        Some(Duration::from_millis(1500))
    );
}

#[tokio::test]
async fn speech_error_advances_like_completion() {
    let mut h = Harness::new(3, Arc::new(InMemoryStore::new()), FakeSpeech::default()).await;
    h.controller.handle_event(PlaybackEvent::Play).await;

    h.speech.finish(SpeechOutcome::Failed("synthesis-failed".into()));
    h.pump().await;

    assert_eq!(h.controller.state().current_part(), Part::Answer);
    assert!(h.scheduler.last_resume().is_some());
}

#[tokio::test]
async fn refused_speech_still_advances() {
    let speech = FakeSpeech {
        refuse: true,
        ..FakeSpeech::default()
    };
    let mut h = Harness::new(3, Arc::new(InMemoryStore::new()), speech).await;
    h.controller.handle_event(PlaybackEvent::Play).await;
    h.pump().await;

    assert_eq!(h.controller.state().current_index(), 0);
    assert_eq!(h.controller.state().current_part(), Part::Answer);
}

#[tokio::test]
async fn break_starts_after_threshold_and_plays_music() {
    let mut h = Harness::new(3, Arc::new(InMemoryStore::new()), FakeSpeech::default()).await;
    h.controller.handle_event(PlaybackEvent::Play).await;

    for _ in 0..599 {
        h.controller.handle_event(PlaybackEvent::StudyTick).await;
    }
    assert!(!h.controller.state().is_on_break());

    h.controller.handle_event(PlaybackEvent::StudyTick).await;
    assert!(h.controller.state().is_on_break());
    assert!(*h.audio.playing.lock().unwrap());
    assert_eq!(h.controller.machine().active_ticker(), Some(TickKind::Break));
    assert_eq!(h.observer.modes.lock().unwrap().last(), Some(&Mode::OnBreak));

    let calls = h.scheduler.calls();
    let stop_study = calls
        .iter()
        .rposition(|c| *c == TimerCall::Stop(TickKind::Study))
        .unwrap();
    let start_break = calls
        .iter()
        .rposition(|c| *c == TimerCall::Start(TickKind::Break))
        .unwrap();
    assert!(stop_study < start_break);

    for _ in 0..300 {
        h.controller.handle_event(PlaybackEvent::BreakTick).await;
    }
    assert!(!h.controller.state().is_on_break());
    assert!(!*h.audio.playing.lock().unwrap());
    assert_eq!(h.controller.machine().active_ticker(), Some(TickKind::Study));
}

#[tokio::test]
async fn progress_is_saved_and_restored() {
    let kv = InMemoryStore::new();
    let mut h = Harness::new(5, Arc::new(kv.clone()), FakeSpeech::default()).await;
    h.controller.handle_event(PlaybackEvent::Play).await;
    h.complete_utterance().await;
    h.complete_utterance().await;
    for _ in 0..42 {
        h.controller.handle_event(PlaybackEvent::StudyTick).await;
    }
    h.controller.dispose().await;

    let saved = ProgressStore::new(Arc::new(kv.clone()))
        .load(&subject())
        .await
        .unwrap();
    assert_eq!(
        saved,
        Some(PersistedProgress {
            index: 1,
            part: Part::Question,
            study_time: 42,
        })
    );

    let restored = Harness::new(5, Arc::new(kv), FakeSpeech::default()).await;
    let state = restored.controller.state();
    assert_eq!(state.current_index(), 1);
    assert_eq!(state.current_part(), Part::Question);
    assert_eq!(state.study_elapsed_secs(), 42);
    assert!(!state.is_playing());
}

#[tokio::test]
async fn storage_failures_do_not_stop_playback() {
    let mut h = Harness::new(3, Arc::new(FailingStore), FakeSpeech::default()).await;
    h.controller.handle_event(PlaybackEvent::Play).await;
    h.controller.handle_event(PlaybackEvent::StudyTick).await;
    h.complete_utterance().await;

    assert_eq!(h.controller.state().study_elapsed_secs(), 1);
    assert_eq!(h.speech.spoken(), vec!["Question 0?", "Answer 0."]);
}

#[tokio::test]
async fn transport_commands_map_to_playback_events() {
    let mut h = Harness::new(5, Arc::new(InMemoryStore::new()), FakeSpeech::default()).await;

    h.controller.handle_transport(TransportCommand::Play).await;
    assert!(h.controller.state().is_playing());

    h.controller.handle_transport(TransportCommand::Next).await;
    assert_eq!(h.controller.state().current_part(), Part::Answer);

    h.controller.handle_transport(TransportCommand::Previous).await;
    assert_eq!(h.controller.state().current_part(), Part::Question);
    assert_eq!(h.controller.state().current_index(), 0);

    h.controller.handle_transport(TransportCommand::Pause).await;
    assert!(!h.controller.state().is_playing());
    assert_eq!(h.controller.machine().active_ticker(), None);
}

#[tokio::test]
async fn bridge_receives_play_pause_stop() {
    let (bridge_tx, mut bridge_rx) = mpsc::unbounded_channel();
    let h = Harness::new(2, Arc::new(InMemoryStore::new()), FakeSpeech::default()).await;
    let mut controller = h.controller.with_bridge(bridge_tx);

    controller.handle_event(PlaybackEvent::Play).await;
    controller.handle_event(PlaybackEvent::Pause).await;
    controller.dispose().await;

    let mut kinds = Vec::new();
    while let Ok(message) = bridge_rx.try_recv() {
        kinds.push(match message {
            BridgeMessage::PlayAudio(now_playing) => {
                assert_eq!(now_playing.subject, "astronomy");
                "play"
            }
            BridgeMessage::PauseAudio => "pause",
            BridgeMessage::StopAudio => "stop",
            BridgeMessage::VisibilityChanged { .. } => "visibility",
        });
    }
    assert_eq!(kinds, vec!["play", "pause", "stop"]);
}
