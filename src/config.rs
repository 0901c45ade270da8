use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

pub const WALKING_TIMEOUT_MS: u64 = 2_000;
pub const STEP_PULSE_MS: u64 = 200;
pub const DEFAULT_DAILY_STEPS: u32 = 10_000;
pub const DEFAULT_DAILY_WATER_ML: u32 = 2_000;
pub const DEFAULT_WEIGHT_KG: u32 = 70;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    pub walking_timeout_ms: u64,
    pub step_pulse_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            walking_timeout_ms: WALKING_TIMEOUT_MS,
            step_pulse_ms: STEP_PULSE_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Goals {
    pub daily_steps: u32,
    pub daily_water_ml: u32,
    pub weight_kg: u32,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            daily_steps: DEFAULT_DAILY_STEPS,
            daily_water_ml: DEFAULT_DAILY_WATER_ML,
            weight_kg: DEFAULT_WEIGHT_KG,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepdrinkConfig {
    pub tracker: TrackerConfig,
    pub goals: Goals,
}

pub fn parse_config_str(raw: &str) -> Result<StepdrinkConfig, ConfigError> {
    let config: StepdrinkConfig = toml::from_str(raw)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<StepdrinkConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config_str(&raw)?;
    log::info!(
        "config: loaded path={} walking_timeout_ms={} step_pulse_ms={}",
        path.display(),
        config.tracker.walking_timeout_ms,
        config.tracker.step_pulse_ms
    );
    Ok(config)
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.walking_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "tracker.walking_timeout_ms must be > 0",
            ));
        }
        if self.step_pulse_ms == 0 {
            return Err(ConfigError::Invalid("tracker.step_pulse_ms must be > 0"));
        }
        if self.step_pulse_ms >= self.walking_timeout_ms {
            return Err(ConfigError::Invalid(
                "tracker.step_pulse_ms must be < tracker.walking_timeout_ms",
            ));
        }
        Ok(())
    }
}

pub fn validate_config(config: &StepdrinkConfig) -> Result<(), ConfigError> {
    config.tracker.validate()?;

    let goals = &config.goals;
    if goals.daily_steps == 0 {
        return Err(ConfigError::Invalid("goals.daily_steps must be > 0"));
    }
    if goals.daily_water_ml == 0 {
        return Err(ConfigError::Invalid("goals.daily_water_ml must be > 0"));
    }
    if goals.weight_kg == 0 {
        return Err(ConfigError::Invalid("goals.weight_kg must be > 0"));
    }
    Ok(())
}
