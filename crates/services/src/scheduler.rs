use std::time::Duration;

use narrator_core::{PlaybackEvent, ResumeToken, TickKind};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};

use crate::capabilities::TimerScheduler;
use crate::runtime::EventSender;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// `TimerScheduler` backed by tokio tasks.
///
/// Each ticker is a task posting one event per period; stopping aborts the
/// task so no orphaned interval survives a mode change. Must be used from
/// within a tokio runtime.
pub struct TokioScheduler {
    events: EventSender,
    period: Duration,
    study: Option<JoinHandle<()>>,
    break_ticker: Option<JoinHandle<()>>,
    resume: Option<JoinHandle<()>>,
}

impl TokioScheduler {
    #[must_use]
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            period: TICK_PERIOD,
            study: None,
            break_ticker: None,
            resume: None,
        }
    }

    /// Override the tick period (tests, accelerated demos).
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    fn slot(&mut self, kind: TickKind) -> &mut Option<JoinHandle<()>> {
        match kind {
            TickKind::Study => &mut self.study,
            TickKind::Break => &mut self.break_ticker,
        }
    }
}

fn abort(slot: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = slot.take() {
        handle.abort();
    }
}

impl TimerScheduler for TokioScheduler {
    fn start_ticker(&mut self, kind: TickKind) {
        let event = match kind {
            TickKind::Study => PlaybackEvent::StudyTick,
            TickKind::Break => PlaybackEvent::BreakTick,
        };
        let events = self.events.clone();
        let period = self.period;

        let slot = self.slot(kind);
        abort(slot);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(event.clone()).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop_ticker(&mut self, kind: TickKind) {
        abort(self.slot(kind));
    }

    fn schedule_resume(&mut self, token: ResumeToken, delay: Duration) {
        abort(&mut self.resume);
        let events = self.events.clone();
        self.resume = Some(tokio::spawn(async move {
            sleep(delay).await;
            let _ = events.send(PlaybackEvent::PauseElapsed(token));
        }));
    }

    fn cancel_resume(&mut self) {
        abort(&mut self.resume);
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        abort(&mut self.study);
        abort(&mut self.break_ticker);
        abort(&mut self.resume);
    }
}
