use embassy_time::Instant;
use statig::blocking::IntoStateMachineExt as _;
use thiserror::Error;

use crate::config::{ConfigError, TrackerConfig};
use crate::tracker::{
    deferred::DeferredQueue,
    platform::{Clock, SensorPlatform, SubscribeError, SystemClock},
    snapshot::{SnapshotCell, SnapshotObserver, TrackerSnapshot},
    trace::TrackerTrace,
    types::{RawSensorSample, SensorAccuracy, SensorKind, SensorMode, SourceSet, TrackerAction},
};

use super::{DispatchContext, TrackerEvent, TrackerHsm};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid tracker config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("no step sensor could be subscribed (available: {available})")]
    NoSourceSubscribed {
        available: SourceSet,
        failures: Vec<SubscribeError>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StartOutcome {
    Started { subscribed: SourceSet },
    AlreadyTracking,
}

#[derive(Clone, Copy, Debug)]
pub struct TrackerApplyResult {
    pub before: TrackerSnapshot,
    pub after: TrackerSnapshot,
    pub trace: TrackerTrace,
}

impl TrackerApplyResult {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }

    pub fn steps_changed(&self) -> bool {
        self.before.session_steps != self.after.session_steps
    }

    pub fn walking_changed(&self) -> bool {
        self.before.walking != self.after.walking
    }
}

/// Fuses the step detector and the cumulative step counter into one session count.
///
/// Owns exactly one tracking session. All calls must be serialized; wrap the
/// tracker in [`SharedTracker`](crate::tracker::SharedTracker) when sensor
/// callbacks can arrive on several threads.
///
/// The step pulse and the walking flag fall back only when deferred actions
/// fire. Something must call [`tick`](Self::tick) once [`next_deadline`](Self::next_deadline)
/// has passed; [`run_deferred`](crate::tracker::run_deferred) does this for a
/// `SharedTracker` on the system clock.
pub struct StepFusionTracker<P: SensorPlatform, C: Clock = SystemClock> {
    platform: P,
    clock: C,
    available: SourceSet,
    machine: statig::blocking::StateMachine<TrackerHsm>,
    deferred: DeferredQueue,
    cell: SnapshotCell,
    observers: Vec<Box<dyn SnapshotObserver>>,
}

impl<P: SensorPlatform> StepFusionTracker<P, SystemClock> {
    pub fn with_system_clock(platform: P, config: TrackerConfig) -> Result<Self, TrackerError> {
        Self::new(platform, SystemClock, config)
    }
}

impl<P: SensorPlatform, C: Clock> StepFusionTracker<P, C> {
    /// Queries sensor availability once; absence is treated as permanent.
    pub fn new(platform: P, clock: C, config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;

        let mut available = SourceSet::none();
        for kind in SensorKind::ALL {
            let present = platform.is_available(kind);
            log::info!("step_fusion: sensor_check kind={} available={}", kind, present);
            if present {
                available = available.with(kind);
            }
        }
        if available.is_empty() {
            log::warn!("step_fusion: no step sensor on this device");
        }

        let hsm = TrackerHsm::new(config, available);
        let cell = SnapshotCell::new(hsm.snapshot());
        Ok(Self {
            platform,
            clock,
            available,
            machine: hsm.state_machine(),
            deferred: DeferredQueue::new(),
            cell,
            observers: Vec::new(),
        })
    }

    pub fn is_sensor_available(&self) -> bool {
        !self.available.is_empty()
    }

    pub fn available_sources(&self) -> SourceSet {
        self.available
    }

    pub fn is_tracking(&self) -> bool {
        self.machine.inner().is_tracking()
    }

    pub fn mode(&self) -> SensorMode {
        self.machine.inner().mode()
    }

    pub fn status(&self) -> &'static str {
        self.mode().label()
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.machine.inner().snapshot()
    }

    pub fn snapshot_cell(&self) -> SnapshotCell {
        self.cell.clone()
    }

    pub fn last_trace(&self) -> TrackerTrace {
        self.machine.inner().last_trace
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deferred.next_due()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn add_observer<O>(&mut self, observer: O)
    where
        O: SnapshotObserver + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn start(&mut self) -> Result<StartOutcome, TrackerError> {
        if self.is_tracking() {
            log::warn!("step_fusion: already_tracking");
            return Ok(StartOutcome::AlreadyTracking);
        }

        let mut subscribed = SourceSet::none();
        let mut failures = Vec::new();
        // Detector first for responsiveness, then the counter for long-run accuracy.
        for kind in [SensorKind::Detector, SensorKind::Counter] {
            if !self.available.contains(kind) {
                continue;
            }
            match self.platform.subscribe(kind) {
                Ok(()) => {
                    log::info!("step_fusion: subscribe kind={} ok", kind);
                    subscribed = subscribed.with(kind);
                }
                Err(err) => {
                    log::warn!("step_fusion: subscribe kind={} failed err={}", kind, err);
                    failures.push(err);
                }
            }
        }

        if subscribed.is_empty() {
            log::error!("step_fusion: start failed available={}", self.available);
            return Err(TrackerError::NoSourceSubscribed {
                available: self.available,
                failures,
            });
        }

        let now = self.clock.now();
        log::info!("step_fusion: start subscribed={}", subscribed);
        self.dispatch(TrackerEvent::Start { subscribed, now }, now);
        Ok(StartOutcome::Started { subscribed })
    }

    pub fn stop(&mut self) -> TrackerApplyResult {
        self.platform.unsubscribe_all();
        let now = self.clock.now();
        if self.is_tracking() {
            log::info!("step_fusion: stop");
        }
        self.dispatch(TrackerEvent::Stop { now }, now)
    }

    pub fn reset(&mut self) -> TrackerApplyResult {
        let now = self.clock.now();
        self.dispatch(TrackerEvent::Reset { now }, now)
    }

    /// Single entry point for both sensor streams.
    pub fn ingest(&mut self, sample: RawSensorSample) -> TrackerApplyResult {
        let now = self.clock.now();
        let before = self.snapshot();
        self.fire_due(now);
        let result = self.dispatch(TrackerEvent::Sample { sample, now }, now);
        TrackerApplyResult { before, ..result }
    }

    /// Fires deferred pulse-clears and walking checks that are due.
    pub fn tick(&mut self) -> TrackerApplyResult {
        let now = self.clock.now();
        let before = self.snapshot();
        self.fire_due(now);
        TrackerApplyResult {
            before,
            after: self.snapshot(),
            trace: self.last_trace(),
        }
    }

    pub fn report_accuracy(&self, kind: SensorKind, accuracy: SensorAccuracy) {
        log::info!(
            "step_fusion: accuracy kind={} value={}",
            kind,
            accuracy.label()
        );
    }

    pub fn debug_info(&self) -> String {
        let inner = self.machine.inner();
        let snapshot = inner.snapshot();
        let baseline = inner
            .session
            .baseline
            .map_or_else(|| "unset".to_string(), |raw| raw.to_string());
        format!(
            "Sensor Status: {}\nTracking: {}\nTotal Steps: {}\nDetector Count: {}\nCounter Baseline: {}\nWalking: {}",
            snapshot.mode.description(),
            snapshot.tracking,
            snapshot.session_steps,
            inner.session.detector_steps,
            baseline,
            snapshot.walking,
        )
    }

    fn fire_due(&mut self, now: Instant) {
        for entry in self.deferred.take_due(now) {
            self.dispatch(
                TrackerEvent::Deferred {
                    action: entry.action,
                    now,
                },
                now,
            );
        }
    }

    fn dispatch(&mut self, event: TrackerEvent, now: Instant) -> TrackerApplyResult {
        let before = self.snapshot();
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);

        for action in context.actions.iter() {
            match *action {
                TrackerAction::Schedule { delay_ms, action } => {
                    self.deferred.schedule(now, delay_ms, action)
                }
            }
        }

        let after = self.snapshot();
        if before != after {
            self.cell.publish(after);
            for observer in self.observers.iter_mut() {
                observer.on_snapshot(&before, &after);
            }
        }

        TrackerApplyResult {
            before,
            after,
            trace: self.last_trace(),
        }
    }
}
