use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::PlayerKey;

/// Registry entry for a known player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub key: PlayerKey,
    pub registered_at: NaiveDateTime,
}

/// The roster. Survives every rollover untouched.
///
/// Keys are kept ordered so iteration is deterministic, which the
/// aggregator relies on for its tie-break.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerRegistry {
    players: BTreeMap<PlayerKey, PlayerRecord>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &PlayerKey) -> bool {
        self.players.contains_key(key)
    }

    pub fn get(&self, key: &PlayerKey) -> Option<&PlayerRecord> {
        self.players.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &PlayerKey> {
        self.players.keys()
    }

    pub fn records(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub(crate) fn insert(&mut self, record: PlayerRecord) {
        self.players.insert(record.key.clone(), record);
    }

    pub(crate) fn remove(&mut self, key: &PlayerKey) -> Option<PlayerRecord> {
        self.players.remove(key)
    }
}
