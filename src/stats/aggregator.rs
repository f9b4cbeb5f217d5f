use super::models::{DailyReport, ReportSettings, WindowBucket, WindowHistogram};
use super::windows::{UnmatchedPolicy, WindowSet, OTHER_LABEL};
use crate::ledger::DailyState;
use crate::player::PlayerKey;

/// All registered players by count, highest first, ties by ascending key.
pub fn ranked_counts(state: &DailyState) -> Vec<(PlayerKey, u32)> {
    let mut ranked: Vec<(PlayerKey, u32)> = state
        .registry()
        .keys()
        .map(|key| (key.clone(), state.total_for(key)))
        .collect();
    ranked.sort_by(|(a_key, a), (b_key, b)| b.cmp(a).then_with(|| a_key.cmp(b_key)));
    ranked
}

/// Players who have played at all, in ranking order, at most `limit` of them.
pub fn top_active(state: &DailyState, limit: usize) -> Vec<(PlayerKey, u32)> {
    ranked_counts(state)
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .take(limit)
        .collect()
}

/// Buckets today's matches by time of day in a single pass.
pub fn histogram_by_window(
    state: &DailyState,
    windows: &WindowSet,
    policy: UnmatchedPolicy,
) -> WindowHistogram {
    let mut buckets: Vec<WindowBucket> = windows
        .windows()
        .iter()
        .map(|w| WindowBucket::new(w.label()))
        .collect();
    let mut other = WindowBucket::new(OTHER_LABEL);
    let mut unclassified = 0;

    for record in state.matches() {
        match (windows.classify(record.time), policy) {
            (Some(index), _) => buckets[index].tally(record),
            (None, UnmatchedPolicy::Other) => other.tally(record),
            (None, UnmatchedPolicy::Unclassified) => unclassified += 1,
        }
    }

    if other.matches > 0 {
        buckets.push(other);
    }
    WindowHistogram {
        buckets,
        unclassified,
    }
}

/// Highest count across the roster, never below 1 while anyone is registered.
///
/// An empty roster yields 0; callers dividing by it must check.
pub fn max_count(state: &DailyState) -> u32 {
    if state.registry().is_empty() {
        return 0;
    }
    state
        .registry()
        .keys()
        .map(|key| state.total_for(key))
        .max()
        .unwrap_or_default()
        .max(1)
}

/// Cells to fill in a bar `width` cells wide for `count` out of `max`.
pub fn bar_length(count: u32, max: u32, width: usize) -> usize {
    if max == 0 {
        return 0;
    }
    let cells = (u64::from(count.min(max)) * width as u64) / u64::from(max);
    cells as usize
}

pub fn build_report(state: &DailyState, settings: &ReportSettings) -> DailyReport {
    DailyReport {
        date: state.date(),
        total_matches: state.matches().len(),
        ranked: ranked_counts(state),
        top_active: top_active(state, settings.top_limit),
        histogram: histogram_by_window(state, &settings.windows, settings.unmatched),
        max_count: max_count(state),
    }
}
