use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use embassy_time::Instant;
use thiserror::Error;

use super::types::{SensorKind, SourceSet};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscribeError {
    #[error("{0} sensor is not present on this device")]
    Unavailable(SensorKind),
    #[error("{kind} sensor registration rejected: {reason}")]
    Rejected { kind: SensorKind, reason: String },
}

/// Host sensor subsystem: availability queries and listener registration.
pub trait SensorPlatform {
    fn is_available(&self, kind: SensorKind) -> bool;
    fn subscribe(&mut self, kind: SensorKind) -> Result<(), SubscribeError>;
    /// Must be safe to call when nothing is subscribed.
    fn unsubscribe_all(&mut self);
}

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Simulated clock; clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set_ms(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::Relaxed);
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.now_ms())
    }
}

/// Platform double with fixed availability and optional registration failures.
#[derive(Clone, Debug, Default)]
pub struct ScriptedPlatform {
    available: SourceSet,
    failing: SourceSet,
    subscribed: SourceSet,
    unsubscribe_calls: u32,
}

impl ScriptedPlatform {
    pub fn new(available: SourceSet) -> Self {
        Self {
            available,
            ..Self::default()
        }
    }

    pub fn failing(mut self, kind: SensorKind) -> Self {
        self.failing = self.failing.with(kind);
        self
    }

    pub fn subscribed(&self) -> SourceSet {
        self.subscribed
    }

    pub fn unsubscribe_calls(&self) -> u32 {
        self.unsubscribe_calls
    }
}

impl SensorPlatform for ScriptedPlatform {
    fn is_available(&self, kind: SensorKind) -> bool {
        self.available.contains(kind)
    }

    fn subscribe(&mut self, kind: SensorKind) -> Result<(), SubscribeError> {
        if !self.available.contains(kind) {
            return Err(SubscribeError::Unavailable(kind));
        }
        if self.failing.contains(kind) {
            return Err(SubscribeError::Rejected {
                kind,
                reason: "scripted failure".into(),
            });
        }
        self.subscribed = self.subscribed.with(kind);
        Ok(())
    }

    fn unsubscribe_all(&mut self) {
        self.subscribed = SourceSet::none();
        self.unsubscribe_calls += 1;
    }
}
