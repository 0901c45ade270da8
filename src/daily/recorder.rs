use chrono::NaiveDate;

use crate::tracker::{SnapshotObserver, TrackerSnapshot};

use super::{date_key, today, StorageError};

/// Persistence collaborator receiving the session total keyed by calendar date.
pub trait DailyStepSink: Send {
    fn upsert_steps(&mut self, date: NaiveDate, steps: u32) -> Result<(), StorageError>;
}

/// Forwards every positive change of the session total to a [`DailyStepSink`].
///
/// Writes are best-effort: sink failures are logged and the next change retries
/// with the newer total.
pub struct DailyStepRecorder<S: DailyStepSink> {
    sink: S,
    date_source: Box<dyn Fn() -> NaiveDate + Send>,
}

impl<S: DailyStepSink> DailyStepRecorder<S> {
    pub fn new(sink: S) -> Self {
        Self::with_date_source(sink, today)
    }

    pub fn with_date_source<F>(sink: S, date_source: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + 'static,
    {
        Self {
            sink,
            date_source: Box::new(date_source),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn record(&mut self, steps: u32) {
        let date = (self.date_source)();
        match self.sink.upsert_steps(date, steps) {
            Ok(()) => log::debug!("daily: upsert date={} steps={}", date_key(date), steps),
            Err(err) => log::warn!(
                "daily: upsert failed date={} steps={} err={}",
                date_key(date),
                steps,
                err
            ),
        }
    }
}

impl<S: DailyStepSink> SnapshotObserver for DailyStepRecorder<S> {
    fn on_snapshot(&mut self, before: &TrackerSnapshot, after: &TrackerSnapshot) {
        if before.session_steps == after.session_steps || after.session_steps == 0 {
            return;
        }
        self.record(after.session_steps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daily::MemoryStepLog;

    struct FailingSink {
        attempts: u32,
    }

    impl DailyStepSink for FailingSink {
        fn upsert_steps(&mut self, _date: NaiveDate, _steps: u32) -> Result<(), StorageError> {
            self.attempts += 1;
            Err(StorageError::SinkUnavailable("disk full".into()))
        }
    }

    fn fixed_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 12).expect("valid date")
    }

    fn snapshot(steps: u32) -> TrackerSnapshot {
        TrackerSnapshot {
            session_steps: steps,
            ..TrackerSnapshot::default()
        }
    }

    #[test]
    fn writes_only_positive_changes() {
        let log = MemoryStepLog::new();
        let mut recorder = DailyStepRecorder::with_date_source(log.clone(), fixed_day);

        recorder.on_snapshot(&snapshot(0), &snapshot(0));
        recorder.on_snapshot(&snapshot(3), &snapshot(0));
        assert!(log.is_empty());

        recorder.on_snapshot(&snapshot(0), &snapshot(5));
        assert_eq!(log.steps_on(fixed_day()), 5);
    }

    #[test]
    fn sink_errors_are_swallowed() {
        let mut recorder =
            DailyStepRecorder::with_date_source(FailingSink { attempts: 0 }, fixed_day);
        recorder.on_snapshot(&snapshot(1), &snapshot(2));
        recorder.on_snapshot(&snapshot(2), &snapshot(3));
        assert_eq!(recorder.sink().attempts, 2);
    }
}
