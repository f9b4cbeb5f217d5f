use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use super::models::{CounterPolicy, DailyState, MatchRecord};
use crate::player::PlayerKey;

/// Where a snapshot stands relative to the calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Current,
    Stale,
}

pub fn day_status(state: &DailyState, today: NaiveDate) -> DayStatus {
    if state.date == today {
        DayStatus::Current
    } else {
        DayStatus::Stale
    }
}

/// Everything a closed day recorded, handed to the gateway for keeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayArchive {
    pub date: NaiveDate,
    pub matches: Vec<MatchRecord>,
    pub counters: BTreeMap<PlayerKey, u32>,
}

impl DayArchive {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Brings a stale snapshot up to `today`.
///
/// Returns the state unchanged and no archive when it is already current.
/// Applying it twice to the same stale input yields the same output both times.
pub fn rollover(
    state: &DailyState,
    today: NaiveDate,
    policy: CounterPolicy,
) -> (DailyState, Option<DayArchive>) {
    match day_status(state, today) {
        DayStatus::Current => (state.clone(), None),
        DayStatus::Stale => {
            info!(from = %state.date, to = %today, matches = state.matches.len(), "Rolling over to a new day");
            let (next, archive) = close_day(state, today, policy);
            (next, Some(archive))
        }
    }
}

/// Unconditionally closes the current day and starts `today` afresh.
pub fn reset(
    state: &DailyState,
    today: NaiveDate,
    policy: CounterPolicy,
) -> (DailyState, DayArchive) {
    info!(date = %state.date, matches = state.matches.len(), "Resetting day");
    close_day(state, today, policy)
}

fn close_day(
    state: &DailyState,
    today: NaiveDate,
    policy: CounterPolicy,
) -> (DailyState, DayArchive) {
    let archive = DayArchive {
        date: state.date,
        matches: state.matches.clone(),
        counters: state.counters.clone(),
    };

    let mut carried = BTreeMap::new();
    if policy == CounterPolicy::Cumulative {
        for key in state.registry.keys() {
            let total = state.total_for(key);
            if total > 0 {
                carried.insert(key.clone(), total);
            }
        }
    }

    // Registered players keep a zeroed entry so views still list the full roster.
    let counters = state.registry.keys().map(|k| (k.clone(), 0)).collect();

    let next = DailyState {
        date: today,
        registry: state.registry.clone(),
        matches: Vec::new(),
        counters,
        carried,
        next_id: 1,
        revision: state.revision,
    };
    (next, archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn key(name: &str) -> PlayerKey {
        PlayerKey::parse(name).unwrap()
    }

    fn played_day() -> DailyState {
        let mut state = DailyState::new(day(1));
        let at = day(1).and_hms_opt(5, 0, 0).unwrap();
        for name in ["alice", "bob", "carol", "dave", "erin"] {
            state.register_player(name, at).unwrap();
        }
        let six = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        state
            .add_match(&["alice", "bob", "carol", "dave"], None, six)
            .unwrap();
        state
            .add_match(&["alice", "erin", "carol", "dave"], None, six)
            .unwrap();
        state
    }

    #[test]
    fn current_day_is_left_alone() {
        let state = played_day();
        let (next, archive) = rollover(&state, day(1), CounterPolicy::ResetDaily);
        assert_eq!(next, state);
        assert!(archive.is_none());
    }

    #[test]
    fn stale_day_clears_matches_and_zeroes_counters() {
        let state = played_day();

        let (next, archive) = rollover(&state, day(2), CounterPolicy::ResetDaily);

        assert_eq!(next.date(), day(2));
        assert!(next.matches().is_empty());
        assert_eq!(next.registry(), state.registry());
        assert_eq!(next.counters().len(), 5);
        assert!(next.counters().values().all(|c| *c == 0));
        assert!(next.carried().is_empty());
        assert_eq!(next.next_id(), 1);
        assert!(next.counters_consistent());

        let archive = archive.unwrap();
        assert_eq!(archive.date, day(1));
        assert_eq!(archive.matches.len(), 2);
        assert_eq!(archive.counters[&key("alice")], 2);
    }

    #[test]
    fn rollover_is_idempotent() {
        let state = played_day();

        let (first, _) = rollover(&state, day(2), CounterPolicy::ResetDaily);
        let (second, _) = rollover(&state, day(2), CounterPolicy::ResetDaily);
        let (again, archive) = rollover(&first, day(2), CounterPolicy::ResetDaily);

        assert_eq!(first, second);
        assert_eq!(again, first);
        assert!(archive.is_none());
    }

    #[test]
    fn earlier_date_also_counts_as_stale() {
        let state = played_day();
        assert_eq!(day_status(&state, day(1)), DayStatus::Current);
        assert_eq!(
            day_status(&state, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
            DayStatus::Stale
        );
    }

    #[test]
    fn cumulative_policy_carries_totals_forward() {
        let state = played_day();

        let (day2, _) = rollover(&state, day(2), CounterPolicy::Cumulative);

        assert_eq!(day2.counter(&key("alice")), 0);
        assert_eq!(day2.total_for(&key("alice")), 2);
        assert_eq!(day2.total_for(&key("bob")), 1);
        assert!(day2.carried().get(&key("erin")).is_some());
        assert!(day2.counters_consistent());

        let (day3, _) = rollover(&day2, day(3), CounterPolicy::Cumulative);
        assert_eq!(day3.total_for(&key("alice")), 2);
    }

    #[test]
    fn reset_forces_a_new_day_even_when_current() {
        let state = played_day();

        let (next, archive) = reset(&state, day(1), CounterPolicy::ResetDaily);

        assert_eq!(next.date(), day(1));
        assert!(next.matches().is_empty());
        assert_eq!(archive.matches.len(), 2);
        assert!(next.counters().values().all(|c| *c == 0));
    }

    #[test]
    fn rollover_keeps_revision() {
        let mut state = played_day();
        state.set_revision(7);
        let (next, _) = rollover(&state, day(2), CounterPolicy::ResetDaily);
        assert_eq!(next.revision(), 7);
    }
}
