use std::str::FromStr;
use std::time::Duration;

use navette_core::error::CoreError;
use navette_core::reconcile::{ReconcileTiming, DEFAULT_COALESCE_DELAY_MS, DEFAULT_COOLDOWN_MS};

/// Default upper bound on a queried occurrence window (a bit over a year).
pub const DEFAULT_MAX_WINDOW_DAYS: i64 = 400;

/// Scheduling configuration loaded from environment variables.
///
/// Date ranges are always closed (both ends included) and weekdays always use
/// ISO numbering (1 = Monday .. 7 = Sunday); neither is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Coalescing delay and cooldown window of edit sessions.
    pub timing: ReconcileTiming,
    /// Longest window `query_occurrences` accepts, in days.
    pub max_window_days: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timing: ReconcileTiming::default(),
            max_window_days: DEFAULT_MAX_WINDOW_DAYS,
        }
    }
}

impl ScheduleConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var            | Default |
    /// |--------------------|---------|
    /// | `EDIT_COALESCE_MS` | `800`   |
    /// | `EDIT_COOLDOWN_MS` | `3000`  |
    /// | `MAX_WINDOW_DAYS`  | `400`   |
    pub fn from_env() -> Result<Self, CoreError> {
        let coalesce_ms: u64 = env_or("EDIT_COALESCE_MS", DEFAULT_COALESCE_DELAY_MS)?;
        let cooldown_ms: u64 = env_or("EDIT_COOLDOWN_MS", DEFAULT_COOLDOWN_MS)?;
        let max_window_days: i64 = env_or("MAX_WINDOW_DAYS", DEFAULT_MAX_WINDOW_DAYS)?;

        if max_window_days < 1 {
            return Err(CoreError::Validation(format!(
                "MAX_WINDOW_DAYS must be at least 1, got {max_window_days}"
            )));
        }

        Ok(Self {
            timing: ReconcileTiming {
                coalesce_delay: Duration::from_millis(coalesce_ms),
                cooldown: Duration::from_millis(cooldown_ms),
            },
            max_window_days,
        })
    }
}

/// Read and parse `name`, falling back to `default` when unset.
fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{name} must be a number, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ScheduleConfig::default();
        assert_eq!(config.timing.coalesce_delay, Duration::from_millis(800));
        assert_eq!(config.timing.cooldown, Duration::from_millis(3000));
        assert_eq!(config.max_window_days, 400);
    }

    #[test]
    fn env_or_falls_back_when_unset() {
        let value: u64 = env_or("NAVETTE_TEST_SURELY_UNSET_VAR", 17).unwrap();
        assert_eq!(value, 17);
    }
}
