use chrono::NaiveTime;
use std::collections::BTreeSet;
use tracing::debug;

use super::models::{hhmm, DailyState, MatchId, MatchRecord, MATCH_SIZE};
use crate::player::{normalize, PlayerKey};
use crate::shared::AppError;

impl DailyState {
    /// Appends a match and bumps the counter of each participant.
    ///
    /// Checks run in a fixed order, each with its own error: every slot filled,
    /// every player registered, no player twice. The state is untouched unless
    /// all three pass.
    pub fn add_match<S: AsRef<str>>(
        &mut self,
        selection: &[S],
        remark: Option<&str>,
        now: NaiveTime,
    ) -> Result<MatchRecord, AppError> {
        let players = self.validate_selection(selection)?;
        let following = self
            .next_id
            .checked_add(1)
            .ok_or(AppError::MatchIdsExhausted)?;

        let record = MatchRecord {
            id: self.next_id,
            players,
            time: hhmm::truncate(now),
            remark: clean_remark(remark),
        };

        self.next_id = following;
        for key in &record.players {
            *self.counters.entry(key.clone()).or_default() += 1;
        }
        self.matches.push(record.clone());

        debug!(match_id = record.id, time = %record.time, "Match recorded");
        Ok(record)
    }

    fn validate_selection<S: AsRef<str>>(
        &self,
        selection: &[S],
    ) -> Result<Vec<PlayerKey>, AppError> {
        if selection.len() != MATCH_SIZE || selection.iter().any(|s| s.as_ref().trim().is_empty())
        {
            return Err(AppError::IncompleteSelection);
        }

        let keys = selection
            .iter()
            .map(|s| normalize(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(unknown) = keys.iter().find(|k| !self.registry.contains(k)) {
            return Err(AppError::UnknownPlayer(unknown.clone()));
        }

        let mut seen = BTreeSet::new();
        if let Some(duplicate) = keys.iter().find(|k| !seen.insert(*k)) {
            return Err(AppError::DuplicatePlayer(duplicate.clone()));
        }

        Ok(keys)
    }
}

fn clean_remark(remark: Option<&str>) -> Option<String> {
    remark
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}
