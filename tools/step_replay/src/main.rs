use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use stepdrink::{
    config::{load_config, TrackerConfig},
    tracker::{ManualClock, ScriptedPlatform, StepFusionTracker, TrackerSnapshot},
    RawSensorSample, SensorKind, SourceSet,
};

mod logging;
mod trace;

use trace::{parse_trace, ReplayOp, ReplayStep};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Sources {
    Both,
    Detector,
    Counter,
    None,
}

impl Sources {
    fn set(self) -> SourceSet {
        match self {
            Self::Both => SourceSet::both(),
            Self::Detector => SourceSet::none().with(SensorKind::Detector),
            Self::Counter => SourceSet::none().with(SensorKind::Counter),
            Self::None => SourceSet::none(),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FailKind {
    Detector,
    Counter,
}

impl From<FailKind> for SensorKind {
    fn from(kind: FailKind) -> Self {
        match kind {
            FailKind::Detector => SensorKind::Detector,
            FailKind::Counter => SensorKind::Counter,
        }
    }
}

/// Replays a recorded sensor trace through the step fusion tracker.
#[derive(Debug, Parser)]
#[command(name = "step_replay")]
struct Cli {
    trace: PathBuf,
    #[arg(long, value_enum, default_value_t = Sources::Both)]
    sources: Sources,
    /// Sensor whose registration is rejected; repeatable.
    #[arg(long, value_enum)]
    fail: Vec<FailKind>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    expect_steps: Option<u32>,
    #[arg(long)]
    expect_walking: Option<bool>,
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::Logger::from_env(cli.log_level)?.install()?;

    let tracker_config = match &cli.config {
        Some(path) => load_config(path)?.tracker,
        None => TrackerConfig::default(),
    };
    let steps = parse_trace(&cli.trace)?;

    let mut platform = ScriptedPlatform::new(cli.sources.set());
    for kind in &cli.fail {
        platform = platform.failing((*kind).into());
    }

    println!("snapshot,ms,steps,walking,pulse,mode");
    let last = replay(&steps, platform, tracker_config, |ms, snapshot| {
        println!(
            "snapshot,{},{},{},{},{}",
            ms,
            snapshot.session_steps,
            snapshot.walking,
            snapshot.step_pulse,
            snapshot.status()
        );
    })?;

    if let Some(expected) = cli.expect_steps {
        if last.session_steps != expected {
            bail!(
                "step count mismatch: expected {expected}, got {}",
                last.session_steps
            );
        }
    }
    if let Some(expected) = cli.expect_walking {
        if last.walking != expected {
            bail!("walking mismatch: expected {expected}, got {}", last.walking);
        }
    }
    Ok(())
}

/// Feeds every step at its timestamp and reports each snapshot change.
fn replay(
    steps: &[ReplayStep],
    platform: ScriptedPlatform,
    config: TrackerConfig,
    mut on_change: impl FnMut(u64, &TrackerSnapshot),
) -> Result<TrackerSnapshot> {
    let clock = ManualClock::new(0);
    let mut tracker = StepFusionTracker::new(platform, clock.clone(), config)?;
    let mut last = tracker.snapshot();

    for step in steps {
        clock.set_ms(step.ms);
        match step.op {
            ReplayOp::Start => {
                if let Err(err) = tracker.start() {
                    log::error!("replay: start failed at ms={} err={}", step.ms, err);
                }
            }
            ReplayOp::Stop => {
                tracker.stop();
            }
            ReplayOp::Reset => {
                tracker.reset();
            }
            ReplayOp::Tick => {
                tracker.tick();
            }
            ReplayOp::Detector => {
                tracker.ingest(RawSensorSample::Detector);
            }
            ReplayOp::Counter(cumulative) => {
                tracker.ingest(RawSensorSample::Counter { cumulative });
            }
        }

        let current = tracker.snapshot();
        if current != last {
            on_change(step.ms, &current);
            last = current;
        }
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn run(raw: &str, sources: SourceSet) -> (TrackerSnapshot, Vec<u64>) {
        let steps = trace::parse_lines(Cursor::new(raw), "inline").expect("trace");
        let mut changes = Vec::new();
        let last = replay(
            &steps,
            ScriptedPlatform::new(sources),
            TrackerConfig::default(),
            |ms, _| changes.push(ms),
        )
        .expect("replay");
        (last, changes)
    }

    #[test]
    fn bundled_trace_ends_still_and_stopped() {
        let steps = parse_trace(&PathBuf::from(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/traces/walk_then_stop.csv"
        )))
        .expect("bundled trace");
        let last = replay(
            &steps,
            ScriptedPlatform::new(SourceSet::both()),
            TrackerConfig::default(),
            |_, _| {},
        )
        .expect("replay");
        assert_eq!(last.session_steps, 3);
        assert!(!last.walking);
        assert!(!last.tracking);
    }

    #[test]
    fn counter_only_trace_uses_baseline_delta() {
        let (last, _) = run(
            "step_trace,0,start\nstep_trace,1,counter,5000\nstep_trace,2,counter,5040\n",
            SourceSet::none().with(SensorKind::Counter),
        );
        assert_eq!(last.session_steps, 40);
        assert_eq!(last.status(), "counter-only");
    }

    #[test]
    fn invalid_tracker_config_is_rejected() {
        let config = TrackerConfig {
            walking_timeout_ms: 100,
            step_pulse_ms: 100,
        };
        let err = replay(&[], ScriptedPlatform::new(SourceSet::both()), config, |_, _| {})
            .expect_err("pulse window must be shorter than the walking timeout");
        assert!(err.to_string().contains("invalid tracker config"));
    }

    #[test]
    fn trace_without_sensors_never_tracks() {
        let (last, changes) = run(
            "step_trace,0,start\nstep_trace,5,detector\n",
            SourceSet::none(),
        );
        assert!(!last.tracking);
        assert_eq!(last.session_steps, 0);
        assert!(changes.is_empty());
    }
}
