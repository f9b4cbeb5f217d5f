//! On-disk form of a [`DailyState`].
//!
//! Decoding never trusts the stored blob: keys are re-normalised on the way
//! in and the counter/match invariants are re-established, with each repair
//! logged. Snapshots written by the first generation of the tracker (a flat
//! `player_stats` map and `p1`..`p4` match rows) are read as well.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

use super::models::{hhmm, DailyState, MatchId, MatchRecord};
use crate::player::{normalize, PlayerKey, PlayerRecord, PlayerRegistry};
use crate::shared::AppError;

/// Remark written by older versions when none was given
const PLACEHOLDER_REMARK: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub players: PlayersField,
    #[serde(default)]
    pub matches: Vec<MatchRecord>,
    #[serde(default)]
    pub counters: BTreeMap<PlayerKey, u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub carried: BTreeMap<PlayerKey, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_id: Option<MatchId>,
    #[serde(default)]
    pub revision: u64,
}

/// Roster as stored: either bare keys or keys with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayersField {
    Keys(Vec<PlayerKey>),
    Records(BTreeMap<PlayerKey, PlayerMeta>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
struct LegacySnapshot {
    date: NaiveDate,
    player_stats: BTreeMap<String, u32>,
    #[serde(default)]
    matches: Vec<LegacyMatch>,
}

#[derive(Debug, Deserialize)]
struct LegacyMatch {
    #[serde(with = "hhmm")]
    time: NaiveTime,
    p1: String,
    p2: String,
    p3: String,
    p4: String,
    #[serde(default)]
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredState {
    Current(Snapshot),
    Legacy(LegacySnapshot),
}

/// A correction applied while decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    RetractedUnknownPlayer { match_id: MatchId, player: PlayerKey },
    CollapsedDuplicateSlot { match_id: MatchId, player: PlayerKey },
    Renumbered { from: MatchId, to: MatchId },
    RebuiltCounter { player: PlayerKey, stored: Option<u32>, actual: u32 },
    DroppedCarried { player: PlayerKey },
    AdvancedNextId { stored: Option<MatchId>, derived: MatchId },
    ClearedPlaceholderRemark { match_id: MatchId },
    ImportedLegacyFormat,
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::RetractedUnknownPlayer { match_id, player } => {
                write!(f, "match {match_id}: retracted unregistered player {player}")
            }
            Repair::CollapsedDuplicateSlot { match_id, player } => {
                write!(f, "match {match_id}: dropped repeated slot for {player}")
            }
            Repair::Renumbered { from, to } => write!(f, "match {from} renumbered to {to}"),
            Repair::RebuiltCounter {
                player,
                stored,
                actual,
            } => write!(f, "counter for {player} was {stored:?}, rebuilt as {actual}"),
            Repair::DroppedCarried { player } => {
                write!(f, "dropped carried total for unregistered {player}")
            }
            Repair::AdvancedNextId { stored, derived } => {
                write!(f, "next id {stored:?} moved to {derived}")
            }
            Repair::ClearedPlaceholderRemark { match_id } => {
                write!(f, "match {match_id}: placeholder remark cleared")
            }
            Repair::ImportedLegacyFormat => f.write_str("converted legacy snapshot layout"),
        }
    }
}

impl From<&DailyState> for Snapshot {
    fn from(state: &DailyState) -> Self {
        let players = state
            .registry
            .records()
            .map(|r| {
                (
                    r.key.clone(),
                    PlayerMeta {
                        registered_at: Some(r.registered_at),
                    },
                )
            })
            .collect();
        Self {
            date: state.date,
            players: PlayersField::Records(players),
            matches: state.matches.clone(),
            counters: state.counters.clone(),
            carried: state.carried.clone(),
            next_id: Some(state.next_id),
            revision: state.revision,
        }
    }
}

impl From<LegacySnapshot> for Snapshot {
    fn from(legacy: LegacySnapshot) -> Self {
        let mut players = BTreeMap::new();
        let mut counters = BTreeMap::new();
        for (name, count) in legacy.player_stats {
            if let Ok(key) = normalize(&name) {
                counters.insert(key.clone(), count);
                players.insert(key, PlayerMeta { registered_at: None });
            }
        }
        let matches = legacy
            .matches
            .into_iter()
            .zip(1..)
            .map(|(row, id)| MatchRecord {
                id,
                players: [row.p1, row.p2, row.p3, row.p4]
                    .iter()
                    .filter_map(|p| normalize(p).ok())
                    .collect(),
                time: row.time,
                remark: row.remark,
            })
            .collect();
        Self {
            date: legacy.date,
            players: PlayersField::Records(players),
            matches,
            counters,
            carried: BTreeMap::new(),
            next_id: None,
            revision: 0,
        }
    }
}

pub fn encode(state: &DailyState) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(&Snapshot::from(state))?)
}

/// Parses and validates a stored snapshot, logging every repair made.
pub fn decode(raw: &str) -> Result<DailyState, AppError> {
    let (state, repairs) = decode_with_repairs(raw)?;
    for repair in &repairs {
        warn!(date = %state.date, %repair, "Repaired snapshot");
    }
    Ok(state)
}

pub fn decode_with_repairs(raw: &str) -> Result<(DailyState, Vec<Repair>), AppError> {
    let stored: StoredState = serde_json::from_str(raw).map_err(|e| {
        AppError::CorruptSnapshot(format!("not a recognised snapshot layout: {e}"))
    })?;
    let mut repairs = Vec::new();
    let snapshot = match stored {
        StoredState::Current(snapshot) => snapshot,
        StoredState::Legacy(legacy) => {
            repairs.push(Repair::ImportedLegacyFormat);
            Snapshot::from(legacy)
        }
    };
    let state = into_state(snapshot, &mut repairs)?;
    Ok((state, repairs))
}

fn next_match_id(id: MatchId) -> Result<MatchId, AppError> {
    id.checked_add(1).ok_or_else(|| {
        AppError::CorruptSnapshot(format!("match id {id} leaves no room for another match"))
    })
}

fn into_state(snapshot: Snapshot, repairs: &mut Vec<Repair>) -> Result<DailyState, AppError> {
    let midnight = snapshot.date.and_time(NaiveTime::MIN);
    let mut registry = PlayerRegistry::new();
    match snapshot.players {
        PlayersField::Keys(keys) => {
            for key in keys {
                registry.insert(PlayerRecord {
                    key,
                    registered_at: midnight,
                });
            }
        }
        PlayersField::Records(records) => {
            for (key, meta) in records {
                registry.insert(PlayerRecord {
                    key,
                    registered_at: meta.registered_at.unwrap_or(midnight),
                });
            }
        }
    }

    let mut matches = snapshot.matches;
    let mut last_id: MatchId = 0;
    for record in &mut matches {
        if record.id <= last_id {
            let to = next_match_id(last_id)?;
            repairs.push(Repair::Renumbered {
                from: record.id,
                to,
            });
            record.id = to;
        }
        last_id = record.id;

        let mut seen = BTreeSet::new();
        let match_id = record.id;
        record.players.retain(|player| {
            if !registry.contains(player) {
                repairs.push(Repair::RetractedUnknownPlayer {
                    match_id,
                    player: player.clone(),
                });
                return false;
            }
            if !seen.insert(player.clone()) {
                repairs.push(Repair::CollapsedDuplicateSlot {
                    match_id,
                    player: player.clone(),
                });
                return false;
            }
            true
        });

        let placeholder = record
            .remark
            .as_deref()
            .map(str::trim)
            .is_some_and(|r| r.is_empty() || r == PLACEHOLDER_REMARK);
        if placeholder {
            record.remark = None;
            repairs.push(Repair::ClearedPlaceholderRemark { match_id });
        }
    }

    let derived_next = next_match_id(last_id)?;
    let next_id = match snapshot.next_id {
        Some(stored) if stored >= derived_next => stored,
        stored => {
            if stored.is_some() {
                repairs.push(Repair::AdvancedNextId {
                    stored,
                    derived: derived_next,
                });
            }
            derived_next
        }
    };
    // add_match has to be able to step past whatever id it hands out next
    next_match_id(next_id)?;

    let mut carried = snapshot.carried;
    carried.retain(|player, _| {
        let keep = registry.contains(player);
        if !keep {
            repairs.push(Repair::DroppedCarried {
                player: player.clone(),
            });
        }
        keep
    });

    let mut state = DailyState {
        date: snapshot.date,
        registry,
        matches,
        counters: BTreeMap::new(),
        carried,
        next_id,
        revision: snapshot.revision,
    };

    let actual = state.recount();
    for (player, count) in &actual {
        let stored = snapshot.counters.get(player).copied();
        if stored != Some(*count) {
            repairs.push(Repair::RebuiltCounter {
                player: player.clone(),
                stored,
                actual: *count,
            });
        }
    }
    for (player, stored) in &snapshot.counters {
        if !actual.contains_key(player) {
            repairs.push(Repair::RebuiltCounter {
                player: player.clone(),
                stored: Some(*stored),
                actual: 0,
            });
        }
    }
    state.counters = actual;
    Ok(state)
}
