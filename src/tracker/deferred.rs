use embassy_time::{Duration, Instant};
use heapless::Vec;

use super::types::DeferredAction;

pub const DEFERRED_QUEUE_CAPACITY: usize = 8;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Scheduled {
    pub due: Instant,
    pub action: DeferredAction,
}

/// Pending pulse-clears and walking checks, fired by the owner's tick.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    entries: Vec<Scheduled, DEFERRED_QUEUE_CAPACITY>,
}

impl DeferredQueue {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.entries.iter().map(|entry| entry.due).min()
    }

    pub fn schedule(&mut self, now: Instant, delay_ms: u64, action: DeferredAction) {
        let due = now
            .checked_add(Duration::from_millis(delay_ms))
            .unwrap_or(Instant::MAX);

        // An older walking check can only be stale once a newer one exists.
        if matches!(action, DeferredAction::WalkingTimeout { .. }) {
            self.entries
                .retain(|entry| !matches!(entry.action, DeferredAction::WalkingTimeout { .. }));
        }

        if self.entries.push(Scheduled { due, action }).is_err() {
            // Only pulse clears can fill the queue; an earlier pending clear still
            // lowers the pulse, so dropping this one is harmless.
            log::debug!("step_fusion: deferred_queue_full dropped={:?}", action);
        }
    }

    /// Removes and returns every entry due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<Scheduled, DEFERRED_QUEUE_CAPACITY> {
        let mut due: Vec<Scheduled, DEFERRED_QUEUE_CAPACITY> = Vec::new();
        let mut idx = 0usize;
        while idx < self.entries.len() {
            if self.entries[idx].due <= now {
                let entry = self.entries.swap_remove(idx);
                let _ = due.push(entry);
            } else {
                idx += 1;
            }
        }
        due.sort_unstable_by_key(|entry| entry.due);
        due
    }
}
