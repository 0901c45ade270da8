pub mod recorder;
pub mod step_log;

use chrono::{Local, NaiveDate};
use thiserror::Error;

pub use recorder::{DailyStepRecorder, DailyStepSink};
pub use step_log::{MemoryStepLog, StepRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("step sink unavailable: {0}")]
    SinkUnavailable(String),
    #[error("water amount must be > 0 ml")]
    InvalidAmount,
    #[error("no record with id {0}")]
    UnknownRecord(u64),
}

/// Calendar date used as the daily record key.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `YYYY-MM-DD`, the key format of the daily tables.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_key_is_zero_padded_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).expect("valid date");
        assert_eq!(date_key(date), "2024-03-07");
    }
}
