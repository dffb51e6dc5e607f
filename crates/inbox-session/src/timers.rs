use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// The timers a session owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    SearchDebounce,
    MessageArrival,
    BannerHide,
    LabelRefresh,
}

/// Delivered to the session loop when a timer elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

/// A cancellable timer that reports into the session's channel.
///
/// Arming always cancels the previous arm, so a slot never has more than one
/// live task. Each arm bumps the generation; a firing that was already queued
/// when the slot was cancelled or re-armed carries a stale generation and is
/// rejected by [`accepts`](Self::accepts).
pub struct TimerSlot {
    kind: TimerKind,
    generation: u64,
    token: Option<CancellationToken>,
}

impl TimerSlot {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            generation: 0,
            token: None,
        }
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn is_armed(&self) -> bool {
        self.token.is_some()
    }

    /// Fire once after `delay`.
    pub fn arm_once(&mut self, delay: Duration, tx: &mpsc::UnboundedSender<TimerFired>) {
        let (token, fired) = self.rearm();
        let tx = tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(fired);
                }
            }
        });
    }

    /// Fire every `period`, first one `period` from now.
    pub fn arm_repeating(&mut self, period: Duration, tx: &mpsc::UnboundedSender<TimerFired>) {
        let (token, fired) = self.rearm();
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if tx.send(fired).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            trace!(timer = ?self.kind, generation = self.generation, "Timer cancelled");
            token.cancel();
        }
    }

    /// Whether `fired` belongs to the current arm of this slot.
    pub fn accepts(&self, fired: &TimerFired) -> bool {
        fired.kind == self.kind && fired.generation == self.generation && self.is_armed()
    }

    /// Mark a one-shot arm as spent after its firing was accepted.
    pub fn finish(&mut self) {
        self.token = None;
    }

    fn rearm(&mut self) -> (CancellationToken, TimerFired) {
        self.cancel();
        self.generation += 1;
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        let fired = TimerFired {
            kind: self.kind,
            generation: self.generation,
        };
        (token, fired)
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
