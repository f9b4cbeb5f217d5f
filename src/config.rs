use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::clock::FixedOffsetClock;
use crate::ledger::CounterPolicy;
use crate::stats::{ReportSettings, StatsError, UnmatchedPolicy, WindowSet};

const DEFAULT_DATA_FILE: &str = "badminton_data.json";
/// UTC+05:30
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
const DEFAULT_TOP_LIMIT: usize = 10;

/// Why a configuration value was ignored
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid UTC offset: {0}")]
    InvalidOffset(String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Runtime settings, read from `COURTLOG_*` environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub data_file: PathBuf,
    pub utc_offset_minutes: i32,
    pub counter_policy: CounterPolicy,
    pub report: ReportSettings,
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any variable source; unset or unparsable values
    /// fall back to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_file = lookup("COURTLOG_DATA_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));

        let utc_offset_minutes = parsed(&lookup, "COURTLOG_UTC_OFFSET_MINUTES", parse_offset)
            .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES);

        let counter_policy = parsed(&lookup, "COURTLOG_COUNTER_POLICY", |raw| {
            CounterPolicy::from_str(raw).map_err(|e| ConfigError::InvalidPolicy(format!("{raw}: {e}")))
        })
        .unwrap_or_default();

        let unmatched = parsed(&lookup, "COURTLOG_UNMATCHED_POLICY", |raw| {
            UnmatchedPolicy::from_str(raw).map_err(|e| ConfigError::InvalidPolicy(format!("{raw}: {e}")))
        })
        .unwrap_or_default();

        let windows = parsed(&lookup, "COURTLOG_TIME_WINDOWS", |raw| {
            Ok(WindowSet::from_str(raw)?)
        })
        .unwrap_or_default();

        let top_limit = parsed(&lookup, "COURTLOG_TOP_LIMIT", |raw| {
            raw.parse::<usize>()
                .map_err(|e| ConfigError::InvalidLimit(format!("{raw}: {e}")))
        })
        .unwrap_or(DEFAULT_TOP_LIMIT);

        Self {
            data_file,
            utc_offset_minutes,
            counter_policy,
            report: ReportSettings {
                windows,
                unmatched,
                top_limit,
            },
        }
    }

    pub fn clock(&self) -> FixedOffsetClock {
        FixedOffsetClock::from_minutes(self.utc_offset_minutes)
            .unwrap_or_else(|| {
                warn!(minutes = self.utc_offset_minutes, "UTC offset out of range, using UTC");
                FixedOffsetClock::utc()
            })
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Minutes east of UTC, less than a day either way.
fn parse_offset(raw: &str) -> Result<i32, ConfigError> {
    let minutes = raw
        .parse::<i32>()
        .map_err(|e| ConfigError::InvalidOffset(format!("{raw}: {e}")))?;
    if FixedOffsetClock::from_minutes(minutes).is_none() {
        return Err(ConfigError::InvalidOffset(format!(
            "{minutes} minutes is a day or more away from UTC"
        )));
    }
    Ok(minutes)
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    parse: impl Fn(&str) -> Result<T, ConfigError>,
) -> Option<T> {
    let raw = lookup(name)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match parse(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(variable = name, error = %err, "Ignoring invalid setting, using default");
            None
        }
    }
}
