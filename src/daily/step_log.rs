use core::cell::RefCell;
use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use serde::Serialize;

use super::{recorder::DailyStepSink, StorageError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub date: NaiveDate,
    pub steps: u32,
    pub updated_at: DateTime<Utc>,
}

type Records = BTreeMap<NaiveDate, StepRecord>;

/// One row per calendar date; writes replace the day's total. Clones share storage.
#[derive(Clone)]
pub struct MemoryStepLog {
    records: Arc<Mutex<CriticalSectionRawMutex, RefCell<Records>>>,
}

impl Default for MemoryStepLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStepLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(RefCell::new(BTreeMap::new()))),
        }
    }

    pub fn upsert(&self, date: NaiveDate, steps: u32) {
        self.records.lock(|records| {
            records.borrow_mut().insert(
                date,
                StepRecord {
                    date,
                    steps,
                    updated_at: Utc::now(),
                },
            );
        });
    }

    pub fn record_on(&self, date: NaiveDate) -> Option<StepRecord> {
        self.records
            .lock(|records| records.borrow().get(&date).copied())
    }

    pub fn steps_on(&self, date: NaiveDate) -> u32 {
        self.record_on(date).map_or(0, |record| record.steps)
    }

    /// Newest dates first.
    pub fn recent_days(&self, limit: usize) -> Vec<StepRecord> {
        self.records.lock(|records| {
            records
                .borrow()
                .values()
                .rev()
                .take(limit)
                .copied()
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.records.lock(|records| records.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DailyStepSink for MemoryStepLog {
    fn upsert_steps(&mut self, date: NaiveDate, steps: u32) -> Result<(), StorageError> {
        self.upsert(date, steps);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date")
    }

    #[test]
    fn upsert_replaces_existing_day() {
        let log = MemoryStepLog::new();
        log.upsert(day(1), 120);
        log.upsert(day(1), 450);
        assert_eq!(log.len(), 1);
        assert_eq!(log.steps_on(day(1)), 450);
        assert_eq!(log.steps_on(day(2)), 0);
    }

    #[test]
    fn recent_days_lists_newest_first_and_limits() {
        let log = MemoryStepLog::new();
        for d in 1..=9 {
            log.upsert(day(d), d * 100);
        }
        let recent = log.recent_days(7);
        assert_eq!(recent.len(), 7);
        assert_eq!(recent[0].date, day(9));
        assert_eq!(recent[6].date, day(3));
    }

    #[test]
    fn clones_share_records() {
        let log = MemoryStepLog::new();
        let mut writer = log.clone();
        writer.upsert_steps(day(4), 77).expect("memory sink never fails");
        assert_eq!(log.steps_on(day(4)), 77);
    }
}
