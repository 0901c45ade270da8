use embassy_time::Instant;
use statig::prelude::*;

use crate::config::TrackerConfig;

use super::{
    fusion::SessionState,
    snapshot::TrackerSnapshot,
    trace::TrackerTrace,
    types::{
        ActionBuffer, DeferredAction, IgnoreReason, RawSensorSample, SensorKind, SensorMode,
        SourceSet, StepSource, TrackerAction, TrackerStateId,
    },
};

mod engine;

pub use engine::{StartOutcome, StepFusionTracker, TrackerApplyResult, TrackerError};

#[derive(Clone, Copy, Debug)]
enum TrackerEvent {
    Start { subscribed: SourceSet, now: Instant },
    Stop { now: Instant },
    Reset { now: Instant },
    Sample { sample: RawSensorSample, now: Instant },
    Deferred { action: DeferredAction, now: Instant },
}

#[derive(Default)]
struct DispatchContext {
    actions: ActionBuffer,
}

struct TrackerHsm {
    config: TrackerConfig,
    available: SourceSet,
    active: SourceSet,
    session: SessionState,
    step_pulse: bool,
    state_id: TrackerStateId,
    last_trace: TrackerTrace,
}

impl TrackerHsm {
    fn new(config: TrackerConfig, available: SourceSet) -> Self {
        Self {
            config,
            available,
            active: SourceSet::none(),
            session: SessionState::default(),
            step_pulse: false,
            state_id: TrackerStateId::Idle,
            last_trace: TrackerTrace::default(),
        }
    }

    fn is_tracking(&self) -> bool {
        !matches!(self.state_id, TrackerStateId::Idle)
    }

    /// Subscribed sources while tracking, detected sources otherwise.
    fn mode(&self) -> SensorMode {
        if self.is_tracking() {
            SensorMode::from_sources(self.active)
        } else {
            SensorMode::from_sources(self.available)
        }
    }

    fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            tracking: self.is_tracking(),
            session_steps: self.session.session_steps,
            walking: matches!(self.state_id, TrackerStateId::Walking),
            step_pulse: self.step_pulse,
            mode: self.mode(),
        }
    }

    fn record_trace(
        &mut self,
        now: Instant,
        sample: Option<SensorKind>,
        counter_candidate: Option<u32>,
        source: StepSource,
        ignored: IgnoreReason,
    ) {
        self.last_trace = TrackerTrace {
            now_ms: now.as_millis(),
            state_id: self.state_id,
            sample,
            baseline: self.session.baseline,
            detector_steps: self.session.detector_steps,
            counter_candidate,
            source,
            ignored,
        };
    }

    fn ignore(&mut self, now: Instant, sample: Option<SensorKind>, reason: IgnoreReason) {
        self.record_trace(now, sample, None, StepSource::None, reason);
    }

    fn reset_session(&mut self, now: Instant) {
        self.session.reset();
        log::info!("step_fusion: reset");
        self.record_trace(now, None, None, StepSource::None, IgnoreReason::None);
    }

    fn clear_step_pulse(&mut self, now: Instant) {
        self.step_pulse = false;
        self.record_trace(now, None, None, StepSource::None, IgnoreReason::None);
    }

    fn on_detector(&mut self, context: &mut DispatchContext, now: Instant) {
        let generation = self.session.apply_detector(now);
        self.step_pulse = true;
        context.actions.push(TrackerAction::Schedule {
            delay_ms: self.config.step_pulse_ms,
            action: DeferredAction::ClearStepPulse,
        });
        context.actions.push(TrackerAction::Schedule {
            delay_ms: self.config.walking_timeout_ms,
            action: DeferredAction::WalkingTimeout { generation },
        });
        log::debug!(
            "step_fusion: detector step={}",
            self.session.detector_steps
        );
    }

    fn on_counter(&mut self, cumulative: u32, now: Instant) {
        let detector_available = self.available.contains(SensorKind::Detector);
        let outcome = self.session.apply_counter(cumulative, detector_available);
        if outcome.baseline_set {
            log::info!(
                "step_fusion: baseline_set raw={} session={}",
                cumulative,
                self.session.session_steps
            );
        } else {
            log::debug!(
                "step_fusion: counter raw={} candidate={:?} source={:?} session={}",
                cumulative,
                outcome.candidate,
                outcome.source,
                self.session.session_steps
            );
        }
        if outcome.counter_regressed {
            log::warn!(
                "step_fusion: counter_regressed raw={} baseline={:?}",
                cumulative,
                self.session.baseline
            );
        }
        self.record_trace(
            now,
            Some(SensorKind::Counter),
            outcome.candidate,
            outcome.source,
            IgnoreReason::None,
        );
    }
}

#[state_machine(initial = "State::idle()")]
impl TrackerHsm {
    #[state]
    fn idle(&mut self, context: &mut DispatchContext, event: &TrackerEvent) -> Outcome<State> {
        let _ = context;
        match event {
            TrackerEvent::Start { subscribed, now } => {
                self.active = *subscribed;
                self.state_id = TrackerStateId::Still;
                self.record_trace(*now, None, None, StepSource::None, IgnoreReason::None);
                Transition(State::still())
            }
            TrackerEvent::Stop { .. } => Handled,
            TrackerEvent::Reset { now } => {
                self.reset_session(*now);
                Handled
            }
            TrackerEvent::Sample { sample, now } => {
                self.ignore(*now, Some(sample.kind()), IgnoreReason::NotTracking);
                Handled
            }
            TrackerEvent::Deferred { action, now } => {
                match action {
                    DeferredAction::ClearStepPulse => self.clear_step_pulse(*now),
                    DeferredAction::WalkingTimeout { .. } => {
                        self.ignore(*now, None, IgnoreReason::StaleTimeout)
                    }
                }
                Handled
            }
        }
    }

    #[state(superstate = "tracking")]
    fn still(&mut self, context: &mut DispatchContext, event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Sample {
                sample: RawSensorSample::Detector,
                now,
            } => {
                self.on_detector(context, *now);
                self.state_id = TrackerStateId::Walking;
                self.record_trace(
                    *now,
                    Some(SensorKind::Detector),
                    None,
                    StepSource::Detector,
                    IgnoreReason::None,
                );
                Transition(State::walking())
            }
            _ => Super,
        }
    }

    #[state(superstate = "tracking")]
    fn walking(&mut self, context: &mut DispatchContext, event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Sample {
                sample: RawSensorSample::Detector,
                now,
            } => {
                self.on_detector(context, *now);
                self.record_trace(
                    *now,
                    Some(SensorKind::Detector),
                    None,
                    StepSource::Detector,
                    IgnoreReason::None,
                );
                Handled
            }
            TrackerEvent::Deferred {
                action: DeferredAction::WalkingTimeout { generation },
                now,
            } => {
                if !self.session.walking_expired(
                    *generation,
                    *now,
                    self.config.walking_timeout_ms,
                ) {
                    self.ignore(*now, None, IgnoreReason::StaleTimeout);
                    return Handled;
                }
                log::debug!("step_fusion: walking_stopped");
                self.state_id = TrackerStateId::Still;
                self.record_trace(*now, None, None, StepSource::None, IgnoreReason::None);
                Transition(State::still())
            }
            TrackerEvent::Reset { now } => {
                self.state_id = TrackerStateId::Still;
                self.reset_session(*now);
                Transition(State::still())
            }
            _ => Super,
        }
    }

    #[superstate]
    fn tracking(&mut self, context: &mut DispatchContext, event: &TrackerEvent) -> Outcome<State> {
        let _ = context;
        match event {
            TrackerEvent::Start { now, .. } => {
                self.ignore(*now, None, IgnoreReason::AlreadyTracking);
                Handled
            }
            TrackerEvent::Stop { now } => {
                self.active = SourceSet::none();
                self.state_id = TrackerStateId::Idle;
                self.record_trace(*now, None, None, StepSource::None, IgnoreReason::None);
                Transition(State::idle())
            }
            TrackerEvent::Reset { now } => {
                self.reset_session(*now);
                Handled
            }
            TrackerEvent::Sample {
                sample: RawSensorSample::Counter { cumulative },
                now,
            } => {
                self.on_counter(*cumulative, *now);
                Handled
            }
            TrackerEvent::Sample { .. } => Handled,
            TrackerEvent::Deferred { action, now } => {
                match action {
                    DeferredAction::ClearStepPulse => self.clear_step_pulse(*now),
                    DeferredAction::WalkingTimeout { .. } => {
                        self.ignore(*now, None, IgnoreReason::StaleTimeout)
                    }
                }
                Handled
            }
        }
    }
}
