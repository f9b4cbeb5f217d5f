use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::windows::{UnmatchedPolicy, WindowSet};
use crate::ledger::MatchRecord;
use crate::player::PlayerKey;

/// Matches that landed in one reporting window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowBucket {
    pub label: String,
    pub matches: u32,
    pub players: BTreeMap<PlayerKey, u32>,
}

impl WindowBucket {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn count_for(&self, key: &PlayerKey) -> u32 {
        self.players.get(key).copied().unwrap_or_default()
    }

    pub(crate) fn tally(&mut self, record: &MatchRecord) {
        self.matches += 1;
        for key in &record.players {
            *self.players.entry(key.clone()).or_default() += 1;
        }
    }
}

/// Per-window breakdown of the day.
///
/// One bucket per configured window in configured order, followed by an
/// "Other" bucket when the policy asks for it and something landed there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowHistogram {
    pub buckets: Vec<WindowBucket>,
    /// Matches kept out of every bucket under `UnmatchedPolicy::Unclassified`
    pub unclassified: u32,
}

impl WindowHistogram {
    pub fn bucket(&self, label: &str) -> Option<&WindowBucket> {
        self.buckets.iter().find(|b| b.label == label)
    }

    pub fn total_matches(&self) -> u32 {
        self.buckets.iter().map(|b| b.matches).sum::<u32>() + self.unclassified
    }
}

/// Knobs for building a [`DailyReport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub windows: WindowSet,
    pub unmatched: UnmatchedPolicy,
    pub top_limit: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            windows: WindowSet::default(),
            unmatched: UnmatchedPolicy::default(),
            top_limit: 10,
        }
    }
}

/// Every derived view of a day, recomputed from the ledger on each call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub total_matches: usize,
    pub ranked: Vec<(PlayerKey, u32)>,
    pub top_active: Vec<(PlayerKey, u32)>,
    pub histogram: WindowHistogram,
    pub max_count: u32,
}
