use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{activity::goal_progress, daily::StorageError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WaterEntry {
    pub id: u64,
    pub date: NaiveDate,
    pub amount_ml: u32,
    pub logged_at: DateTime<Utc>,
}

/// Water intake entries, many per day.
#[derive(Debug, Default)]
pub struct WaterIntakeLog {
    entries: Vec<WaterEntry>,
    next_id: u64,
}

impl WaterIntakeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, date: NaiveDate, amount_ml: u32) -> Result<WaterEntry, StorageError> {
        self.add_at(date, amount_ml, Utc::now())
    }

    pub fn add_at(
        &mut self,
        date: NaiveDate,
        amount_ml: u32,
        logged_at: DateTime<Utc>,
    ) -> Result<WaterEntry, StorageError> {
        if amount_ml == 0 {
            return Err(StorageError::InvalidAmount);
        }
        self.next_id += 1;
        let entry = WaterEntry {
            id: self.next_id,
            date,
            amount_ml,
            logged_at,
        };
        self.entries.push(entry);
        log::debug!("hydration: add id={} date={} ml={}", entry.id, date, amount_ml);
        Ok(entry)
    }

    pub fn remove(&mut self, id: u64) -> Result<WaterEntry, StorageError> {
        let idx = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(StorageError::UnknownRecord(id))?;
        Ok(self.entries.remove(idx))
    }

    /// Newest first.
    pub fn entries_on(&self, date: NaiveDate) -> Vec<WaterEntry> {
        let mut day: Vec<WaterEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.date == date)
            .copied()
            .collect();
        day.sort_by(|a, b| b.logged_at.cmp(&a.logged_at).then(b.id.cmp(&a.id)));
        day
    }

    pub fn total_on(&self, date: NaiveDate) -> u32 {
        self.entries
            .iter()
            .filter(|entry| entry.date == date)
            .fold(0u32, |acc, entry| acc.saturating_add(entry.amount_ml))
    }

    /// Daily totals for the `days` most recent dates with entries, newest first.
    pub fn recent(&self, days: usize) -> Vec<(NaiveDate, u32)> {
        let mut dates: Vec<NaiveDate> = self.entries.iter().map(|entry| entry.date).collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        dates
            .into_iter()
            .take(days)
            .map(|date| (date, self.total_on(date)))
            .collect()
    }

    pub fn progress_on(&self, date: NaiveDate, goal_ml: u32) -> f32 {
        goal_progress(self.total_on(date), goal_ml)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).expect("valid date")
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_720_000_000 + secs, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn zero_amount_is_rejected() {
        let mut log = WaterIntakeLog::new();
        assert_eq!(log.add(day(1), 0), Err(StorageError::InvalidAmount));
        assert_eq!(log.total_on(day(1)), 0);
    }

    #[test]
    fn totals_and_progress_per_day() {
        let mut log = WaterIntakeLog::new();
        log.add_at(day(1), 250, at(0)).expect("add");
        log.add_at(day(1), 500, at(60)).expect("add");
        log.add_at(day(2), 300, at(90_000)).expect("add");

        assert_eq!(log.total_on(day(1)), 750);
        assert_eq!(log.progress_on(day(1), 1_500), 0.5);
        assert_eq!(log.progress_on(day(1), 500), 1.0);

        let entries = log.entries_on(day(1));
        assert_eq!(entries[0].amount_ml, 500);
        assert_eq!(entries[1].amount_ml, 250);

        assert_eq!(log.recent(7), vec![(day(2), 300), (day(1), 750)]);
    }

    #[test]
    fn remove_deletes_one_entry() {
        let mut log = WaterIntakeLog::new();
        let first = log.add_at(day(3), 200, at(0)).expect("add");
        log.add_at(day(3), 400, at(10)).expect("add");

        let removed = log.remove(first.id).expect("remove");
        assert_eq!(removed.amount_ml, 200);
        assert_eq!(log.total_on(day(3)), 400);
        assert_eq!(log.remove(first.id), Err(StorageError::UnknownRecord(first.id)));
    }
}
