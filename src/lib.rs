//! Step and hydration tracking core.
//!
//! [`tracker::StepFusionTracker`] fuses a per-step detector stream with a
//! cumulative step counter into one session count plus a walking flag. The
//! remaining modules derive daily records, calories and goal progress from it.

pub mod activity;
pub mod config;
pub mod daily;
pub mod hydration;
pub mod tracker;

pub use config::{load_config, parse_config_str, ConfigError, Goals, StepdrinkConfig, TrackerConfig};
pub use tracker::{
    run_deferred, RawSensorSample, SensorKind, SensorMode, SharedTracker, SnapshotObserver, SourceSet,
    StepFusionTracker, TrackerError, TrackerSnapshot,
};
