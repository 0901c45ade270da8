//! Derived activity figures shown next to the step count.

/// 0.57 kcal per 1000 steps per kilogram, kept as a fixed-point ratio so the
/// result floors exactly.
const KCAL_NUMERATOR: u128 = 57;
const KCAL_DENOMINATOR: u128 = 100_000;

/// Whole kilocalories, rounded down.
pub fn calories_burned(steps: u32, weight_kg: u32) -> u32 {
    let kcal = u128::from(steps) * u128::from(weight_kg) * KCAL_NUMERATOR / KCAL_DENOMINATOR;
    u32::try_from(kcal).unwrap_or(u32::MAX)
}

/// Fraction of `goal` reached, clamped to `0.0..=1.0`. A zero goal reports no progress.
pub fn goal_progress(value: u32, goal: u32) -> f32 {
    if goal == 0 {
        return 0.0;
    }
    (value as f32 / goal as f32).clamp(0.0, 1.0)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivitySummary {
    pub steps: u32,
    pub calories: u32,
    pub progress: f32,
}

impl ActivitySummary {
    pub fn new(steps: u32, goals: &crate::config::Goals) -> Self {
        Self {
            steps,
            calories: calories_burned(steps, goals.weight_kg),
            progress: goal_progress(steps, goals.daily_steps),
        }
    }
}
