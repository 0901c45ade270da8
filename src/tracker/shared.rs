use core::cell::RefCell;

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    signal::Signal,
};
use embassy_time::Instant;

use super::{
    hsm::{StartOutcome, StepFusionTracker, TrackerApplyResult, TrackerError},
    platform::{Clock, SensorPlatform},
    snapshot::{SnapshotCell, TrackerSnapshot},
    types::RawSensorSample,
};

/// Serializes sensor callbacks, deferred ticks and UI calls onto one tracker.
///
/// On host builds `CriticalSectionRawMutex` is backed by one process-wide lock,
/// so every `SharedTracker` and `MemoryStepLog` contends on it. Critical
/// sections here are a single dispatch and never block.
pub struct SharedTracker<P: SensorPlatform, C: Clock> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<StepFusionTracker<P, C>>>,
    cell: SnapshotCell,
    rescheduled: Signal<CriticalSectionRawMutex, ()>,
}

impl<P: SensorPlatform, C: Clock> SharedTracker<P, C> {
    pub fn new(tracker: StepFusionTracker<P, C>) -> Self {
        let cell = tracker.snapshot_cell();
        Self {
            inner: Mutex::new(RefCell::new(tracker)),
            cell,
            rescheduled: Signal::new(),
        }
    }

    /// Runs `f` under the lock and wakes the deferred driver afterwards, since
    /// `f` may have scheduled an earlier deadline.
    pub fn with<R>(&self, f: impl FnOnce(&mut StepFusionTracker<P, C>) -> R) -> R {
        let result = self.inner.lock(|tracker| f(&mut tracker.borrow_mut()));
        self.rescheduled.signal(());
        result
    }

    pub fn ingest(&self, sample: RawSensorSample) -> TrackerApplyResult {
        self.with(|tracker| tracker.ingest(sample))
    }

    pub fn tick(&self) -> TrackerApplyResult {
        self.with(|tracker| tracker.tick())
    }

    pub fn start(&self) -> Result<StartOutcome, TrackerError> {
        self.with(|tracker| tracker.start())
    }

    pub fn stop(&self) -> TrackerApplyResult {
        self.with(|tracker| tracker.stop())
    }

    pub fn reset(&self) -> TrackerApplyResult {
        self.with(|tracker| tracker.reset())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner
            .lock(|tracker| tracker.borrow().next_deadline())
    }

    pub(crate) async fn wait_rescheduled(&self) {
        self.rescheduled.wait().await;
    }

    /// Reads the last published snapshot without taking the lock.
    pub fn snapshot(&self) -> TrackerSnapshot {
        self.cell.read()
    }

    pub fn into_inner(self) -> StepFusionTracker<P, C> {
        self.inner.into_inner().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::config::TrackerConfig;
    use crate::tracker::{
        platform::{ManualClock, ScriptedPlatform},
        types::SourceSet,
    };

    #[test]
    fn concurrent_detector_callbacks_are_all_counted() {
        let clock = ManualClock::new(0);
        let tracker = StepFusionTracker::new(
            ScriptedPlatform::new(SourceSet::both()),
            clock,
            TrackerConfig::default(),
        )
        .expect("valid tracker config");
        let shared = Arc::new(SharedTracker::new(tracker));
        assert!(shared.start().is_ok());

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for _ in 0..25 {
                        let _ = shared.ingest(RawSensorSample::Detector);
                    }
                })
            })
            .collect();
        for worker in workers {
            assert!(worker.join().is_ok());
        }

        assert_eq!(shared.snapshot().session_steps, 100);
        assert!(shared.snapshot().walking);
    }

    #[test]
    fn separate_trackers_recording_into_one_log_do_not_deadlock() {
        use chrono::NaiveDate;

        use crate::daily::{DailyStepRecorder, MemoryStepLog};

        fn first_day() -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date")
        }
        fn second_day() -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 6, 2).expect("valid date")
        }

        let log = MemoryStepLog::new();
        let trackers: Vec<_> = [first_day as fn() -> NaiveDate, second_day]
            .into_iter()
            .map(|date_source| {
                let mut tracker = StepFusionTracker::new(
                    ScriptedPlatform::new(SourceSet::both()),
                    ManualClock::new(0),
                    TrackerConfig::default(),
                )
                .expect("valid tracker config");
                tracker.add_observer(DailyStepRecorder::with_date_source(log.clone(), date_source));
                let shared = Arc::new(SharedTracker::new(tracker));
                assert!(shared.start().is_ok());
                shared
            })
            .collect();

        let workers: Vec<_> = trackers
            .iter()
            .map(|shared| {
                let shared = Arc::clone(shared);
                thread::spawn(move || {
                    for _ in 0..30 {
                        let _ = shared.ingest(RawSensorSample::Detector);
                    }
                })
            })
            .collect();
        for worker in workers {
            assert!(worker.join().is_ok());
        }

        assert_eq!(log.steps_on(first_day()), 30);
        assert_eq!(log.steps_on(second_day()), 30);
    }
}
