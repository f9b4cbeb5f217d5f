use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

use crate::player::{PlayerKey, PlayerRegistry};

pub type MatchId = u32;

/// Number of player slots in a doubles match
pub const MATCH_SIZE: usize = 4;

/// One recorded doubles match.
///
/// Slots 0 and 1 form one team, slots 2 and 3 the other. Once a participant is
/// removed from the roster their slot is retracted, so older rows may hold
/// fewer than four players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub players: Vec<PlayerKey>,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

impl MatchRecord {
    pub fn involves(&self, key: &PlayerKey) -> bool {
        self.players.contains(key)
    }

    pub fn is_complete(&self) -> bool {
        self.players.len() == MATCH_SIZE
    }

    /// Both pairings, available only while all four slots are still named.
    pub fn teams(&self) -> Option<([&PlayerKey; 2], [&PlayerKey; 2])> {
        match self.players.as_slice() {
            [a, b, c, d] => Some(([a, b], [c, d])),
            _ => None,
        }
    }
}

/// What happens to per-player counts when a day is closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CounterPolicy {
    /// Counts start again from zero every day
    #[default]
    ResetDaily,
    /// The closed day's counts are folded into a carried total
    Cumulative,
}

/// The full persisted snapshot for one calendar day.
///
/// `counters[p]` always equals the number of entries in `matches` naming `p`.
/// Totals carried over from earlier days live in `carried` so that invariant
/// is never bent by the cumulative policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyState {
    pub(crate) date: NaiveDate,
    pub(crate) registry: PlayerRegistry,
    pub(crate) matches: Vec<MatchRecord>,
    pub(crate) counters: BTreeMap<PlayerKey, u32>,
    pub(crate) carried: BTreeMap<PlayerKey, u32>,
    pub(crate) next_id: MatchId,
    pub(crate) revision: u64,
}

impl DailyState {
    /// Fresh state for a day with nobody registered
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            registry: PlayerRegistry::new(),
            matches: Vec::new(),
            counters: BTreeMap::new(),
            carried: BTreeMap::new(),
            next_id: 1,
            revision: 0,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    pub fn counters(&self) -> &BTreeMap<PlayerKey, u32> {
        &self.counters
    }

    pub fn carried(&self) -> &BTreeMap<PlayerKey, u32> {
        &self.carried
    }

    pub fn next_id(&self) -> MatchId {
        self.next_id
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// Matches played today by `key`
    pub fn counter(&self, key: &PlayerKey) -> u32 {
        self.counters.get(key).copied().unwrap_or_default()
    }

    /// Today's count plus whatever was carried from earlier days
    pub fn total_for(&self, key: &PlayerKey) -> u32 {
        self.counter(key)
            .saturating_add(self.carried.get(key).copied().unwrap_or_default())
    }

    pub fn find_match(&self, id: MatchId) -> Option<&MatchRecord> {
        self.matches.iter().find(|m| m.id == id)
    }

    /// Today's matches, latest first
    pub fn history(&self) -> impl Iterator<Item = &MatchRecord> {
        self.matches.iter().rev()
    }

    /// Per-player counts derived from `matches` alone, with a zero entry for
    /// every registered player.
    pub fn recount(&self) -> BTreeMap<PlayerKey, u32> {
        let mut counts: BTreeMap<PlayerKey, u32> =
            self.registry.keys().map(|k| (k.clone(), 0)).collect();
        for record in &self.matches {
            for key in &record.players {
                *counts.entry(key.clone()).or_default() += 1;
            }
        }
        counts
    }

    pub fn counters_consistent(&self) -> bool {
        self.recount() == self.counters
    }
}

/// Serialises a time of day as `HH:MM`; reading also accepts `HH:MM:SS`.
pub(crate) mod hhmm {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map(truncate)
    }

    /// Drops seconds and below; windows are defined at minute resolution.
    pub fn truncate(time: NaiveTime) -> NaiveTime {
        NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> PlayerKey {
        PlayerKey::parse(name).unwrap()
    }

    fn record(id: MatchId, names: &[&str]) -> MatchRecord {
        MatchRecord {
            id,
            players: names.iter().map(|n| key(n)).collect(),
            time: NaiveTime::from_hms_opt(6, 15, 0).unwrap(),
            remark: None,
        }
    }

    #[test]
    fn new_state_is_empty_and_numbers_from_one() {
        let state = DailyState::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(state.registry().is_empty());
        assert!(state.matches().is_empty());
        assert!(state.counters().is_empty());
        assert_eq!(state.next_id(), 1);
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn teams_split_slots_in_pairs() {
        let full = record(1, &["a", "b", "c", "d"]);
        let (team_a, team_b) = full.teams().unwrap();
        assert_eq!(team_a, [&key("a"), &key("b")]);
        assert_eq!(team_b, [&key("c"), &key("d")]);

        let partial = record(2, &["a", "c", "d"]);
        assert!(partial.teams().is_none());
        assert!(!partial.is_complete());
    }

    #[test]
    fn match_record_serializes_time_as_hours_and_minutes() {
        let json = serde_json::to_value(record(1, &["a", "b", "c", "d"])).unwrap();
        assert_eq!(json["time"], "06:15");
        assert!(json.get("remark").is_none());

        let parsed: MatchRecord = serde_json::from_str(
            r#"{"id":3,"players":["a","b","c","d"],"time":"07:45:59","remark":"close game"}"#,
        )
        .unwrap();
        assert_eq!(parsed.time, NaiveTime::from_hms_opt(7, 45, 0).unwrap());
        assert_eq!(parsed.players[0], key("A"));
        assert_eq!(parsed.remark.as_deref(), Some("close game"));
    }

    #[test]
    fn counter_policy_parses_from_snake_case() {
        assert_eq!("reset_daily".parse::<CounterPolicy>().unwrap(), CounterPolicy::ResetDaily);
        assert_eq!("cumulative".parse::<CounterPolicy>().unwrap(), CounterPolicy::Cumulative);
        assert!("weekly".parse::<CounterPolicy>().is_err());
        assert_eq!(CounterPolicy::Cumulative.to_string(), "cumulative");
    }

    #[test]
    fn total_for_saturates_on_huge_carried_total() {
        let mut state = DailyState::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        state.counters.insert(key("a"), 2);
        state.carried.insert(key("a"), u32::MAX - 1);

        assert_eq!(state.total_for(&key("a")), u32::MAX);
        assert_eq!(state.total_for(&key("b")), 0);
    }
}
