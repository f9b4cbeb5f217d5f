use chrono::NaiveDateTime;
use tracing::debug;

use super::{normalize, PlayerKey, PlayerRecord};
use crate::ledger::DailyState;
use crate::shared::AppError;

/// Result of a registration attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// A new player was added with a zero counter
    Created(PlayerKey),
    /// The name normalised to a player that was already registered
    Existing(PlayerKey),
}

impl Registration {
    pub fn key(&self) -> &PlayerKey {
        match self {
            Registration::Created(key) | Registration::Existing(key) => key,
        }
    }

    pub fn into_key(self) -> PlayerKey {
        match self {
            Registration::Created(key) | Registration::Existing(key) => key,
        }
    }
}

impl DailyState {
    /// Adds a player to the roster.
    ///
    /// Re-registering a name that is already known is a successful no-op.
    pub fn register_player(
        &mut self,
        raw_name: &str,
        registered_at: NaiveDateTime,
    ) -> Result<Registration, AppError> {
        let key = normalize(raw_name)?;
        if self.registry.contains(&key) {
            debug!(player = %key, "Player already registered");
            return Ok(Registration::Existing(key));
        }

        self.registry.insert(PlayerRecord {
            key: key.clone(),
            registered_at,
        });
        self.counters.insert(key.clone(), 0);
        debug!(player = %key, "Player registered");
        Ok(Registration::Created(key))
    }

    /// Moves a player to a new key, rewriting every match and counter that
    /// referenced the old one.
    ///
    /// Renaming onto a key held by someone else fails with `Conflict`; two
    /// histories are never merged.
    pub fn rename_player(
        &mut self,
        old_key: &PlayerKey,
        raw_new_name: &str,
    ) -> Result<PlayerKey, AppError> {
        let Some(record) = self.registry.get(old_key) else {
            return Err(AppError::NotFound(old_key.clone()));
        };
        let new_key = normalize(raw_new_name)?;
        if &new_key == old_key {
            return Ok(new_key);
        }
        if self.registry.contains(&new_key) {
            return Err(AppError::Conflict(new_key));
        }
        let registered_at = record.registered_at;

        // Nothing below can fail, so the three rewrites land together.
        self.registry.remove(old_key);
        self.registry.insert(PlayerRecord {
            key: new_key.clone(),
            registered_at,
        });

        let mut rewritten = 0;
        for record in &mut self.matches {
            for slot in record.players.iter_mut() {
                if *slot == *old_key {
                    *slot = new_key.clone();
                    rewritten += 1;
                }
            }
        }

        let count = self.counters.remove(old_key).unwrap_or_default();
        self.counters.insert(new_key.clone(), count);
        if let Some(carried) = self.carried.remove(old_key) {
            self.carried.insert(new_key.clone(), carried);
        }

        debug!(from = %old_key, to = %new_key, rewritten, "Player renamed");
        Ok(new_key)
    }

    /// Drops a player from the roster.
    ///
    /// Their match rows stay; only the slot naming them is retracted.
    pub fn remove_player(&mut self, key: &PlayerKey) -> Result<PlayerRecord, AppError> {
        let Some(record) = self.registry.remove(key) else {
            return Err(AppError::NotFound(key.clone()));
        };
        self.counters.remove(key);
        self.carried.remove(key);

        let mut retracted = 0;
        for record in &mut self.matches {
            let before = record.players.len();
            record.players.retain(|slot| slot != key);
            retracted += before - record.players.len();
        }

        debug!(player = %key, retracted, "Player removed");
        Ok(record)
    }
}
