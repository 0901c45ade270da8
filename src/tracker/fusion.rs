use embassy_time::Instant;

use super::types::StepSource;

/// Per-session counters owned by one tracker instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SessionState {
    pub baseline: Option<u32>,
    pub detector_steps: u32,
    pub session_steps: u32,
    /// `None` until the first detector pulse of the session.
    pub last_step_at: Option<Instant>,
    /// Bumped on every pulse and every reset; walking checks compare against it.
    pub step_generation: u64,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CounterOutcome {
    pub baseline_set: bool,
    /// `cumulative - baseline`, absent on the sample that sets the baseline.
    pub candidate: Option<u32>,
    pub source: StepSource,
    pub counter_regressed: bool,
}

impl SessionState {
    pub fn reset(&mut self) {
        let generation = self.step_generation.wrapping_add(1);
        *self = Self {
            step_generation: generation,
            ..Self::default()
        };
    }

    fn detector_has_fired(&self, detector_available: bool) -> bool {
        detector_available && self.detector_steps > 0
    }

    pub fn apply_counter(&mut self, cumulative: u32, detector_available: bool) -> CounterOutcome {
        let Some(baseline) = self.baseline else {
            self.baseline = Some(cumulative);
            // The first reading may carry a stale baseline from a previous boot.
            let source = if self.detector_has_fired(detector_available) {
                self.session_steps = self.detector_steps;
                StepSource::Detector
            } else {
                self.session_steps = 0;
                StepSource::Counter
            };
            return CounterOutcome {
                baseline_set: true,
                candidate: None,
                source,
                counter_regressed: false,
            };
        };

        let counter_regressed = cumulative < baseline;
        let candidate = cumulative.saturating_sub(baseline);
        let source = if self.detector_has_fired(detector_available) {
            self.session_steps = self.detector_steps;
            StepSource::Detector
        } else {
            self.session_steps = candidate;
            StepSource::Counter
        };

        CounterOutcome {
            baseline_set: false,
            candidate: Some(candidate),
            source,
            counter_regressed,
        }
    }

    /// Returns the generation the pulse's walking check must match.
    pub fn apply_detector(&mut self, now: Instant) -> u64 {
        self.detector_steps = self.detector_steps.saturating_add(1);
        self.session_steps = self.detector_steps;
        self.last_step_at = Some(now);
        self.step_generation = self.step_generation.wrapping_add(1);
        self.step_generation
    }

    pub fn walking_expired(&self, generation: u64, now: Instant, timeout_ms: u64) -> bool {
        if generation != self.step_generation {
            return false;
        }
        let Some(last) = self.last_step_at else {
            return false;
        };
        now.saturating_duration_since(last).as_millis() >= timeout_ms
    }
}
