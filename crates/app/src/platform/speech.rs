//! System text-to-speech.
//!
//! Linux shells out to `espeak`; other platforms drive the native engine
//! through `tts`. Both route utterance ends through an `UtteranceSlot` so a
//! cancelled utterance can never complete the one that replaced it.

use std::sync::{Arc, Mutex};

use narrator_core::SpeechOutcome;
use services::SpeechCallback;

#[cfg(target_os = "linux")]
pub use espeak::EspeakSpeech as SystemSpeech;
#[cfg(not(target_os = "linux"))]
pub use native::TtsSpeech as SystemSpeech;

/// Holds the completion callback of the utterance being spoken.
///
/// An end reported before its id was armed is remembered, so the callback
/// still fires when `arm` catches up.
pub struct UtteranceSlot<Id> {
    current: Option<(Id, SpeechCallback)>,
    early_end: Option<Id>,
}

impl<Id: PartialEq> UtteranceSlot<Id> {
    pub fn new() -> Self {
        Self {
            current: None,
            early_end: None,
        }
    }

    /// Returns `on_done` back when `id` has already ended.
    pub fn arm(&mut self, id: Id, on_done: SpeechCallback) -> Option<SpeechCallback> {
        if self.early_end.take().is_some_and(|ended| ended == id) {
            self.current = None;
            return Some(on_done);
        }
        self.current = Some((id, on_done));
        None
    }

    pub fn finish(&mut self, id: Id) -> Option<SpeechCallback> {
        match self.current.take() {
            Some((current, on_done)) if current == id => Some(on_done),
            other => {
                self.current = other;
                self.early_end = Some(id);
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.early_end = None;
    }
}

type SharedSlot<Id> = Arc<Mutex<UtteranceSlot<Id>>>;

fn shared_slot<Id: PartialEq>() -> SharedSlot<Id> {
    Arc::new(Mutex::new(UtteranceSlot::new()))
}

fn arm<Id: PartialEq>(slot: &SharedSlot<Id>, id: Id, on_done: SpeechCallback) {
    let ready = match slot.lock() {
        Ok(mut slot) => slot.arm(id, on_done),
        Err(_) => None,
    };
    if let Some(on_done) = ready {
        on_done(SpeechOutcome::Finished);
    }
}

fn complete<Id: PartialEq>(slot: &SharedSlot<Id>, id: Id, outcome: SpeechOutcome) {
    let on_done = match slot.lock() {
        Ok(mut slot) => slot.finish(id),
        Err(_) => None,
    };
    if let Some(on_done) = on_done {
        on_done(outcome);
    }
}

fn clear<Id: PartialEq>(slot: &SharedSlot<Id>) {
    if let Ok(mut slot) = slot.lock() {
        slot.clear();
    }
}

#[cfg(target_os = "linux")]
mod espeak {
    use std::process::Stdio;

    use narrator_core::SpeechOutcome;
    use services::{CapabilityError, SpeechCallback, SpeechEngine, SpeechRequest};
    use tokio::process::Command;
    use tokio::task::JoinHandle;
    use tracing::debug;

    use super::{SharedSlot, arm, clear, complete, shared_slot};

    const NORMAL_WORDS_PER_MINUTE: f32 = 175.0;

    pub(crate) fn espeak_args(request: &SpeechRequest) -> Vec<String> {
        let words_per_minute = (NORMAL_WORDS_PER_MINUTE * request.rate).round() as u32;
        vec![
            "-s".to_string(),
            words_per_minute.to_string(),
            "-v".to_string(),
            request.lang.to_ascii_lowercase(),
            request.text.clone(),
        ]
    }

    /// Speaks through an `espeak` child process per utterance.
    pub struct EspeakSpeech {
        slot: SharedSlot<u64>,
        next_id: u64,
        current: Option<JoinHandle<()>>,
    }

    impl EspeakSpeech {
        /// # Errors
        ///
        /// Returns `CapabilityError::Unavailable` when `espeak` is not installed.
        pub fn open() -> Result<Self, CapabilityError> {
            let installed = std::process::Command::new("espeak")
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_ok_and(|status| status.success());
            if !installed {
                return Err(CapabilityError::Unavailable("espeak"));
            }
            Ok(Self {
                slot: shared_slot(),
                next_id: 0,
                current: None,
            })
        }
    }

    impl SpeechEngine for EspeakSpeech {
        fn speak(
            &mut self,
            request: SpeechRequest,
            on_done: SpeechCallback,
        ) -> Result<(), CapabilityError> {
            self.cancel_all();
            let mut child = Command::new("espeak")
                .args(espeak_args(&request))
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(|err| CapabilityError::Failed(format!("espeak: {err}")))?;

            self.next_id += 1;
            let id = self.next_id;
            arm(&self.slot, id, on_done);
            let slot = self.slot.clone();
            self.current = Some(tokio::spawn(async move {
                let outcome = match child.wait().await {
                    Ok(status) if status.success() => SpeechOutcome::Finished,
                    Ok(status) => SpeechOutcome::Failed(format!("espeak exited with {status}")),
                    Err(err) => SpeechOutcome::Failed(err.to_string()),
                };
                complete(&slot, id, outcome);
            }));
            Ok(())
        }

        fn cancel_all(&mut self) {
            clear(&self.slot);
            if let Some(handle) = self.current.take() {
                handle.abort();
                debug!("espeak utterance cancelled");
            }
        }
    }

}

#[cfg(not(target_os = "linux"))]
mod native {
    use narrator_core::SpeechOutcome;
    use services::{CapabilityError, SpeechCallback, SpeechEngine, SpeechRequest};
    use tokio::task::JoinHandle;
    use tracing::debug;
    use tts::{Tts, UtteranceId};

    use super::{SharedSlot, arm, clear, complete, shared_slot};
    use crate::console::speaking_time;

    /// Scale the engine's normal rate by the narration multiplier.
    pub(crate) fn engine_rate(normal: f32, min: f32, max: f32, rate: f32) -> f32 {
        if min > max {
            return normal;
        }
        (normal * rate).clamp(min, max)
    }

    /// The platform speech engine (SAPI/WinRT, AVSpeechSynthesizer).
    pub struct TtsSpeech {
        engine: Tts,
        slot: SharedSlot<UtteranceId>,
        callbacks: bool,
        timed: Option<JoinHandle<()>>,
    }

    impl TtsSpeech {
        /// # Errors
        ///
        /// Returns `CapabilityError::Failed` when no engine can be created.
        pub fn open() -> Result<Self, CapabilityError> {
            let engine = Tts::default()
                .map_err(|err| CapabilityError::Failed(format!("speech engine: {err}")))?;
            let slot = shared_slot();
            let callbacks = engine.supported_features().utterance_callbacks;
            if callbacks {
                let ended = slot.clone();
                let on_end: Box<dyn FnMut(UtteranceId)> = Box::new(move |id| {
                    complete(&ended, id, SpeechOutcome::Finished);
                });
                engine
                    .on_utterance_end(Some(on_end))
                    .map_err(|err| CapabilityError::Failed(err.to_string()))?;
            }
            Ok(Self {
                engine,
                slot,
                callbacks,
                timed: None,
            })
        }

        fn apply_rate(&mut self, rate: f32) {
            if !self.engine.supported_features().rate {
                return;
            }
            let rate = engine_rate(
                self.engine.normal_rate(),
                self.engine.min_rate(),
                self.engine.max_rate(),
                rate,
            );
            if let Err(err) = self.engine.set_rate(rate) {
                debug!(%err, "speech rate not applied");
            }
        }
    }

    impl SpeechEngine for TtsSpeech {
        fn speak(
            &mut self,
            request: SpeechRequest,
            on_done: SpeechCallback,
        ) -> Result<(), CapabilityError> {
            self.cancel_all();
            self.apply_rate(request.rate);
            let duration = speaking_time(&request.text, request.rate);
            let utterance = self
                .engine
                .speak(request.text, true)
                .map_err(|err| CapabilityError::Failed(err.to_string()))?;

            match utterance {
                Some(id) if self.callbacks => arm(&self.slot, id, on_done),
                // No end notification from this engine: assume a reading pace.
                _ => {
                    self.timed = Some(tokio::spawn(async move {
                        tokio::time::sleep(duration).await;
                        on_done(SpeechOutcome::Finished);
                    }));
                }
            }
            Ok(())
        }

        fn cancel_all(&mut self) {
            clear(&self.slot);
            if let Some(handle) = self.timed.take() {
                handle.abort();
            }
            if let Err(err) = self.engine.stop() {
                debug!(%err, "stopping speech failed");
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn engine_rate_scales_and_clamps() {
            assert_eq!(engine_rate(0.5, 0.1, 1.0, 1.0), 0.5);
            assert_eq!(engine_rate(0.5, 0.1, 1.0, 1.5), 0.75);
            assert_eq!(engine_rate(0.5, 0.1, 0.6, 2.0), 0.6);
            assert_eq!(engine_rate(1.0, 2.0, 0.5, 1.5), 1.0);
        }
    }
}
