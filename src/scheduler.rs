//! Single-shot timers keyed by [`TimerToken`].
//!
//! Restarting a timer is an explicit `cancel_pending` followed by
//! `schedule`. Expiries travel through a channel back to the event loop,
//! which must run them through [`TokioScheduler::accept`] so that a firing
//! already queued before its timer was cancelled is dropped.

use std::{collections::HashMap, time::Duration};

use log::debug;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerToken {
    /// No key pressed for the configured hibernate time.
    Inactivity,
    /// Manual or forced toggles are allowed again.
    HibernateCooldown,
    /// The secret sequence accepts its next key.
    SecretSequence,
    /// Chart sizes fall back to their start size.
    SizeReset,
}

pub trait Scheduler {
    /// Arms `token` to fire once after `after`.
    fn schedule(&mut self, after: Duration, token: TimerToken);

    /// Drops the pending firing of `token`, if any.
    fn cancel_pending(&mut self, token: TimerToken);

    fn restart(&mut self, after: Duration, token: TimerToken) {
        self.cancel_pending(token);
        self.schedule(after, token);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub token: TimerToken,
    generation: u64,
}

struct PendingTimer {
    generation: u64,
    cancel: CancellationToken,
}

pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<Expiry>,
    pending: HashMap<TimerToken, PendingTimer>,
    next_generation: u64,
}

impl TokioScheduler {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Expiry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            pending: HashMap::new(),
            next_generation: 0,
        };
        (scheduler, rx)
    }

    /// Consumes `expiry` if it belongs to the timer currently armed for its
    /// token. Returns false for firings that were cancelled or superseded.
    pub fn accept(&mut self, expiry: &Expiry) -> bool {
        match self.pending.get(&expiry.token) {
            Some(timer) if timer.generation == expiry.generation => {
                self.pending.remove(&expiry.token);
                true
            }
            _ => {
                debug!("Dropping stale {:?} expiry", expiry.token);
                false
            }
        }
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.contains_key(&token)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, after: Duration, token: TimerToken) {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(after) => {
                    let _ = tx.send(Expiry { token, generation });
                }
                _ = cancelled.cancelled() => {}
            }
        });

        if let Some(previous) = self.pending.insert(token, PendingTimer { generation, cancel }) {
            previous.cancel.cancel();
        }
    }

    fn cancel_pending(&mut self, token: TimerToken) {
        if let Some(timer) = self.pending.remove(&token) {
            timer.cancel.cancel();
        }
    }
}

/// Scheduler that only records what was armed; tests fire timers by hand.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ManualScheduler {
    pending: HashMap<TimerToken, Duration>,
    pub(crate) scheduled: Vec<(TimerToken, Duration)>,
    pub(crate) cancelled: Vec<TimerToken>,
}

#[cfg(test)]
impl ManualScheduler {
    pub(crate) fn delay(&self, token: TimerToken) -> Option<Duration> {
        self.pending.get(&token).copied()
    }

    pub(crate) fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.contains_key(&token)
    }

    /// Simulates the timer firing; false if it was not armed.
    pub(crate) fn fire(&mut self, token: TimerToken) -> bool {
        self.pending.remove(&token).is_some()
    }
}

#[cfg(test)]
impl Scheduler for ManualScheduler {
    fn schedule(&mut self, after: Duration, token: TimerToken) {
        self.pending.insert(token, after);
        self.scheduled.push((token, after));
    }

    fn cancel_pending(&mut self, token: TimerToken) {
        self.pending.remove(&token);
        self.cancelled.push(token);
    }
}
