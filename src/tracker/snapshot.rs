use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::SensorMode;

/// The four observable values plus the tracking flag.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TrackerSnapshot {
    pub tracking: bool,
    pub session_steps: u32,
    pub walking: bool,
    pub step_pulse: bool,
    pub mode: SensorMode,
}

impl Default for TrackerSnapshot {
    fn default() -> Self {
        Self::default_const()
    }
}

impl TrackerSnapshot {
    pub const fn default_const() -> Self {
        Self {
            tracking: false,
            session_steps: 0,
            walking: false,
            step_pulse: false,
            mode: SensorMode::NoSensor,
        }
    }

    pub fn status(&self) -> &'static str {
        self.mode.label()
    }

    const TRACKING_SHIFT: u32 = 32;
    const WALKING_SHIFT: u32 = 33;
    const PULSE_SHIFT: u32 = 34;
    const MODE_SHIFT: u32 = 35;

    pub const fn packed(self) -> u64 {
        (self.session_steps as u64)
            | ((self.tracking as u64) << Self::TRACKING_SHIFT)
            | ((self.walking as u64) << Self::WALKING_SHIFT)
            | ((self.step_pulse as u64) << Self::PULSE_SHIFT)
            | ((self.mode.as_u8() as u64) << Self::MODE_SHIFT)
    }

    pub fn from_packed(raw: u64) -> Self {
        let mode = SensorMode::from_u8(((raw >> Self::MODE_SHIFT) & 0b11) as u8)
            .unwrap_or(SensorMode::NoSensor);
        Self {
            tracking: (raw >> Self::TRACKING_SHIFT) & 1 != 0,
            session_steps: (raw & u64::from(u32::MAX)) as u32,
            walking: (raw >> Self::WALKING_SHIFT) & 1 != 0,
            step_pulse: (raw >> Self::PULSE_SHIFT) & 1 != 0,
            mode,
        }
    }
}

/// Lock-free latest-value cell, readable from any thread while the tracker is busy.
#[derive(Clone, Debug)]
pub struct SnapshotCell {
    raw: Arc<AtomicU64>,
}

impl SnapshotCell {
    pub fn new(initial: TrackerSnapshot) -> Self {
        Self {
            raw: Arc::new(AtomicU64::new(initial.packed())),
        }
    }

    pub fn publish(&self, snapshot: TrackerSnapshot) {
        self.raw.store(snapshot.packed(), Ordering::Relaxed);
    }

    pub fn read(&self) -> TrackerSnapshot {
        TrackerSnapshot::from_packed(self.raw.load(Ordering::Relaxed))
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new(TrackerSnapshot::default())
    }
}

/// Receives every changed snapshot synchronously, inside the tracker's dispatch.
pub trait SnapshotObserver: Send {
    fn on_snapshot(&mut self, before: &TrackerSnapshot, after: &TrackerSnapshot);
}

impl<F> SnapshotObserver for F
where
    F: FnMut(&TrackerSnapshot, &TrackerSnapshot) + Send,
{
    fn on_snapshot(&mut self, before: &TrackerSnapshot, after: &TrackerSnapshot) {
        self(before, after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_roundtrip_keeps_every_field() {
        let snapshot = TrackerSnapshot {
            tracking: true,
            session_steps: u32::MAX,
            walking: true,
            step_pulse: false,
            mode: SensorMode::CounterOnly,
        };
        assert_eq!(TrackerSnapshot::from_packed(snapshot.packed()), snapshot);
    }

    #[test]
    fn cell_clones_share_the_latest_value() {
        let cell = SnapshotCell::default();
        let reader = cell.clone();
        cell.publish(TrackerSnapshot {
            session_steps: 12,
            ..TrackerSnapshot::default()
        });
        assert_eq!(reader.read().session_steps, 12);
        assert_eq!(reader.read().status(), "none");
    }
}
