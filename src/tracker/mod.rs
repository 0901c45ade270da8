pub mod deferred;
pub mod driver;
pub mod fusion;
pub mod hsm;
pub mod platform;
pub mod shared;
pub mod snapshot;
pub mod trace;
pub mod types;

pub use driver::run_deferred;
pub use fusion::SessionState;
pub use hsm::{StartOutcome, StepFusionTracker, TrackerApplyResult, TrackerError};
pub use platform::{
    Clock, ManualClock, ScriptedPlatform, SensorPlatform, SubscribeError, SystemClock,
};
pub use shared::SharedTracker;
pub use snapshot::{SnapshotCell, SnapshotObserver, TrackerSnapshot};
pub use trace::TrackerTrace;
pub use types::{
    IgnoreReason, RawSensorSample, SensorAccuracy, SensorKind, SensorMode, SourceSet, StepSource,
    TrackerStateId,
};
