use super::types::{IgnoreReason, SensorKind, StepSource, TrackerStateId};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TrackerTrace {
    pub now_ms: u64,
    pub state_id: TrackerStateId,
    pub sample: Option<SensorKind>,
    pub baseline: Option<u32>,
    pub detector_steps: u32,
    pub counter_candidate: Option<u32>,
    pub source: StepSource,
    pub ignored: IgnoreReason,
}
