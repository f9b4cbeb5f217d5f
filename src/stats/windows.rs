use chrono::{NaiveTime, Timelike};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

use super::StatsError;
use crate::ledger::models::hhmm;

/// Label used for matches that fall outside every configured window
pub const OTHER_LABEL: &str = "Other";

/// A named stretch of the day, inclusive at both ends at minute resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    label: String,
    #[serde(with = "hhmm")]
    start: NaiveTime,
    #[serde(with = "hhmm")]
    end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, StatsError> {
        let start = hhmm::truncate(start);
        let end = hhmm::truncate(end);
        if start > end {
            return Err(StatsError::InvalidWindow(format!(
                "{} ends before it starts",
                span_label(start, end)
            )));
        }
        Ok(Self {
            label: span_label(start, end),
            start,
            end,
        })
    }

    /// Builds a window from `(hour, minute)` pairs.
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Result<Self, StatsError> {
        let make = |(h, m): (u32, u32)| {
            NaiveTime::from_hms_opt(h, m, 0)
                .ok_or_else(|| StatsError::InvalidWindow(format!("{h}:{m:02} is not a time of day")))
        };
        Self::new(make(start)?, make(end)?)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        let time = hhmm::truncate(time);
        self.start <= time && time <= self.end
    }
}

impl FromStr for TimeWindow {
    type Err = StatsError;

    /// Parses `HH:MM-HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| StatsError::InvalidWindow(format!("expected HH:MM-HH:MM, got {s:?}")))?;
        let parse = |part: &str| {
            hhmm::parse(part).map_err(|e| StatsError::InvalidWindow(format!("{part:?}: {e}")))
        };
        Self::new(parse(start)?, parse(end)?)
    }
}

fn span_label(start: NaiveTime, end: NaiveTime) -> String {
    format!(
        "{}:{:02}-{}:{:02}",
        start.hour(),
        start.minute(),
        end.hour(),
        end.minute()
    )
}

/// What to do with a match whose time falls in no window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Count it in a trailing "Other" bucket
    #[default]
    Other,
    /// Keep it out of every bucket but report how many there were
    Unclassified,
}

/// Ordered list of reporting windows.
///
/// When windows overlap the earlier-listed one wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WindowSet {
    windows: Vec<TimeWindow>,
}

impl WindowSet {
    pub fn new(windows: Vec<TimeWindow>) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Index of the first window containing `time`
    pub fn classify(&self, time: NaiveTime) -> Option<usize> {
        self.windows.iter().position(|w| w.contains(time))
    }

    pub fn label_for(&self, time: NaiveTime) -> &str {
        self.classify(time)
            .map(|i| self.windows[i].label())
            .unwrap_or(OTHER_LABEL)
    }
}

impl Default for WindowSet {
    /// The early-morning court slots
    fn default() -> Self {
        let spans = [
            ((5, 31), (6, 30)),
            ((6, 31), (7, 0)),
            ((7, 1), (7, 30)),
            ((7, 31), (8, 0)),
            ((8, 1), (10, 0)),
        ];
        let windows = spans
            .into_iter()
            .filter_map(|(start, end)| TimeWindow::from_hm(start, end).ok())
            .collect();
        Self { windows }
    }
}

impl FromStr for WindowSet {
    type Err = StatsError;

    /// Parses a comma-separated list of `HH:MM-HH:MM` spans.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let windows = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(TimeWindow::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        if windows.is_empty() {
            return Err(StatsError::InvalidWindow("no windows given".to_string()));
        }
        Ok(Self { windows })
    }
}

impl fmt::Display for WindowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.windows.iter().map(|w| w.label()).collect();
        f.write_str(&labels.join(", "))
    }
}
