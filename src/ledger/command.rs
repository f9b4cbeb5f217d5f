use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use strum_macros::AsRefStr;

use super::models::{CounterPolicy, DailyState, MatchRecord};
use super::rollover::{self, DayArchive};
use crate::player::{normalize, PlayerKey, PlayerRecord, Registration};
use crate::shared::AppError;

/// A user action, one per presentation-layer control
#[derive(Debug, Clone, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    RegisterPlayer { name: String },
    RenamePlayer { player: String, new_name: String },
    RemovePlayer { player: String },
    AddMatch { players: Vec<String>, remark: Option<String> },
    ResetDay,
}

impl Command {
    pub fn name(&self) -> &str {
        self.as_ref()
    }
}

/// What a successful command produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Registered(Registration),
    Renamed { from: PlayerKey, to: PlayerKey },
    Removed(PlayerRecord),
    MatchAdded(MatchRecord),
    DayReset(DayArchive),
}

/// Calendar reading and policy a command runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    pub today: NaiveDate,
    pub now: NaiveTime,
    pub counter_policy: CounterPolicy,
}

impl CommandContext {
    pub fn timestamp(&self) -> NaiveDateTime {
        self.today.and_time(self.now)
    }
}

/// Runs `command` against a copy of `state`.
///
/// On error the caller's state is, by construction, untouched.
pub fn apply(
    state: &DailyState,
    command: Command,
    ctx: &CommandContext,
) -> Result<(DailyState, Outcome), AppError> {
    let mut next = state.clone();
    let outcome = match command {
        Command::RegisterPlayer { name } => {
            Outcome::Registered(next.register_player(&name, ctx.timestamp())?)
        }
        Command::RenamePlayer { player, new_name } => {
            let from = normalize(&player)?;
            let to = next.rename_player(&from, &new_name)?;
            Outcome::Renamed { from, to }
        }
        Command::RemovePlayer { player } => {
            let key = normalize(&player)?;
            Outcome::Removed(next.remove_player(&key)?)
        }
        Command::AddMatch { players, remark } => {
            Outcome::MatchAdded(next.add_match(players.as_slice(), remark.as_deref(), ctx.now)?)
        }
        Command::ResetDay => {
            let (fresh, archive) = rollover::reset(state, ctx.today, ctx.counter_policy);
            next = fresh;
            Outcome::DayReset(archive)
        }
    };
    Ok((next, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CommandContext {
        CommandContext {
            today: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            now: NaiveTime::from_hms_opt(6, 10, 0).unwrap(),
            counter_policy: CounterPolicy::ResetDaily,
        }
    }

    fn register(state: &DailyState, name: &str) -> DailyState {
        apply(
            state,
            Command::RegisterPlayer {
                name: name.to_string(),
            },
            &ctx(),
        )
        .unwrap()
        .0
    }

    fn foursome() -> DailyState {
        let mut state = DailyState::new(ctx().today);
        for name in ["alice", "bob", "carol", "dave"] {
            state = register(&state, name);
        }
        state
    }

    fn add_match(names: [&str; 4]) -> Command {
        Command::AddMatch {
            players: names.iter().map(|n| n.to_string()).collect(),
            remark: None,
        }
    }

    #[test]
    fn register_stamps_registration_time() {
        let state = foursome();
        let alice = PlayerKey::parse("alice").unwrap();
        assert_eq!(
            state.registry().get(&alice).unwrap().registered_at,
            ctx().timestamp()
        );
    }

    #[test]
    fn add_match_uses_context_time() {
        let (state, outcome) =
            apply(&foursome(), add_match(["alice", "bob", "carol", "dave"]), &ctx()).unwrap();

        let Outcome::MatchAdded(record) = outcome else {
            panic!("expected a match");
        };
        assert_eq!(record.time, ctx().now);
        assert_eq!(state.matches().len(), 1);
    }

    #[test]
    fn failed_command_leaves_input_untouched() {
        let state = foursome();
        let before = state.clone();

        let result = apply(&state, add_match(["alice", "bob", "carol", "alice"]), &ctx());

        assert!(matches!(result, Err(AppError::DuplicatePlayer(_))));
        assert_eq!(state, before);
    }

    #[test]
    fn rename_and_remove_accept_raw_names() {
        let (state, outcome) = apply(
            &foursome(),
            Command::RenamePlayer {
                player: " alice".into(),
                new_name: "Alicia".into(),
            },
            &ctx(),
        )
        .unwrap();
        assert!(matches!(outcome, Outcome::Renamed { ref to, .. } if to.as_str() == "ALICIA"));

        let (state, outcome) = apply(
            &state,
            Command::RemovePlayer {
                player: "bob".into(),
            },
            &ctx(),
        )
        .unwrap();
        assert!(matches!(outcome, Outcome::Removed(ref r) if r.key.as_str() == "BOB"));
        assert_eq!(state.registry().len(), 3);
    }

    #[test]
    fn remove_with_blank_name_is_invalid() {
        let result = apply(
            &foursome(),
            Command::RemovePlayer {
                player: "  ".into(),
            },
            &ctx(),
        );
        assert!(matches!(result, Err(AppError::InvalidName)));
    }

    #[test]
    fn reset_day_clears_matches_and_archives_them() {
        let (state, _) =
            apply(&foursome(), add_match(["alice", "bob", "carol", "dave"]), &ctx()).unwrap();

        let (state, outcome) = apply(&state, Command::ResetDay, &ctx()).unwrap();

        assert!(state.matches().is_empty());
        assert_eq!(state.registry().len(), 4);
        assert!(matches!(outcome, Outcome::DayReset(ref archive) if archive.matches.len() == 1));
    }

    #[test]
    fn command_names_are_snake_case() {
        assert_eq!(Command::ResetDay.name(), "reset_day");
        assert_eq!(add_match(["a", "b", "c", "d"]).name(), "add_match");
    }
}
