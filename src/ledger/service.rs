use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, instrument, warn};

use super::{
    command::{self, Command, CommandContext, Outcome},
    models::{CounterPolicy, DailyState, MatchRecord},
    repository::LedgerRepository,
    rollover,
};
use crate::{
    clock::Clock,
    player::{PlayerKey, PlayerRecord, Registration},
    shared::AppError,
    stats::{self, DailyReport, ReportSettings},
};

/// Runs each user action as load, roll over, apply, save.
///
/// Actions are serialised behind one lock, so within a process there is only
/// ever a single writer.
pub struct LedgerService {
    repository: Arc<dyn LedgerRepository>,
    clock: Arc<dyn Clock>,
    counter_policy: CounterPolicy,
    report_settings: ReportSettings,
    write_lock: AsyncMutex<()>,
}

impl LedgerService {
    pub fn builder(
        repository: Arc<dyn LedgerRepository>,
        clock: Arc<dyn Clock>,
    ) -> LedgerServiceBuilder {
        LedgerServiceBuilder::new(repository, clock)
    }

    pub fn counter_policy(&self) -> CounterPolicy {
        self.counter_policy
    }

    /// Today's state, rolled over and persisted first if the stored day is stale
    #[instrument(skip(self))]
    pub async fn current_state(&self) -> Result<DailyState, AppError> {
        let _guard = self.write_lock.lock().await;
        self.load_current().await
    }

    pub async fn register_player(&self, name: &str) -> Result<Registration, AppError> {
        match self
            .execute(Command::RegisterPlayer {
                name: name.to_string(),
            })
            .await?
        {
            (_, Outcome::Registered(registration)) => Ok(registration),
            (_, other) => Err(unexpected(other)),
        }
    }

    pub async fn rename_player(&self, player: &str, new_name: &str) -> Result<PlayerKey, AppError> {
        match self
            .execute(Command::RenamePlayer {
                player: player.to_string(),
                new_name: new_name.to_string(),
            })
            .await?
        {
            (_, Outcome::Renamed { to, .. }) => Ok(to),
            (_, other) => Err(unexpected(other)),
        }
    }

    pub async fn remove_player(&self, player: &str) -> Result<PlayerRecord, AppError> {
        match self
            .execute(Command::RemovePlayer {
                player: player.to_string(),
            })
            .await?
        {
            (_, Outcome::Removed(record)) => Ok(record),
            (_, other) => Err(unexpected(other)),
        }
    }

    pub async fn add_match<S: AsRef<str>>(
        &self,
        players: &[S],
        remark: Option<&str>,
    ) -> Result<MatchRecord, AppError> {
        let command = Command::AddMatch {
            players: players.iter().map(|p| p.as_ref().to_string()).collect(),
            remark: remark.map(str::to_string),
        };
        match self.execute(command).await? {
            (_, Outcome::MatchAdded(record)) => Ok(record),
            (_, other) => Err(unexpected(other)),
        }
    }

    /// Clears today's matches and counters, keeping the roster
    pub async fn reset_day(&self) -> Result<DailyState, AppError> {
        let (state, _) = self.execute(Command::ResetDay).await?;
        Ok(state)
    }

    /// Every derived view, recomputed from the current ledger
    pub async fn report(&self) -> Result<DailyReport, AppError> {
        let state = self.current_state().await?;
        Ok(stats::build_report(&state, &self.report_settings))
    }

    /// Applies one command end to end and returns the saved state.
    ///
    /// A rejected command saves nothing beyond a pending rollover. If the
    /// final save fails the error is returned and nothing is retried.
    #[instrument(skip(self, command), fields(command = command.name()))]
    pub async fn execute(&self, command: Command) -> Result<(DailyState, Outcome), AppError> {
        let _guard = self.write_lock.lock().await;
        let state = self.load_current().await?;

        let ctx = self.context();
        let (mut next, outcome) = match command::apply(&state, command, &ctx) {
            Ok(applied) => applied,
            Err(err) => {
                if err.is_validation() {
                    debug!(error = %err, "Command rejected");
                } else {
                    warn!(error = %err, "Command failed");
                }
                return Err(err);
            }
        };

        if let Outcome::DayReset(archive) = &outcome {
            self.repository.archive_day(archive).await?;
        }
        self.persist(&mut next).await?;

        info!(outcome = %outcome_summary(&outcome), "Command applied");
        Ok((next, outcome))
    }

    fn context(&self) -> CommandContext {
        CommandContext {
            today: self.clock.today(),
            now: self.clock.now(),
            counter_policy: self.counter_policy,
        }
    }

    async fn load_current(&self) -> Result<DailyState, AppError> {
        let today = self.clock.today();
        let Some(stored) = self.repository.load().await? else {
            info!(%today, "No snapshot yet, starting a fresh day");
            return Ok(DailyState::new(today));
        };

        let (mut state, archive) = rollover::rollover(&stored, today, self.counter_policy);
        if let Some(archive) = archive {
            self.repository.archive_day(&archive).await?;
            self.persist(&mut state).await?;
        }
        Ok(state)
    }

    async fn persist(&self, state: &mut DailyState) -> Result<(), AppError> {
        match self.repository.save(state).await {
            Ok(revision) => {
                state.set_revision(revision);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, date = %state.date(), "Failed to save snapshot");
                Err(err)
            }
        }
    }
}

fn outcome_summary(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Registered(Registration::Created(key)) => format!("registered {key}"),
        Outcome::Registered(Registration::Existing(key)) => format!("{key} already registered"),
        Outcome::Renamed { from, to } => format!("renamed {from} to {to}"),
        Outcome::Removed(record) => format!("removed {}", record.key),
        Outcome::MatchAdded(record) => format!("match #{} added", record.id),
        Outcome::DayReset(archive) => format!("reset after {} matches", archive.matches.len()),
    }
}

fn unexpected(outcome: Outcome) -> AppError {
    AppError::Internal(format!(
        "command produced an unexpected outcome: {}",
        outcome_summary(&outcome)
    ))
}

pub struct LedgerServiceBuilder {
    repository: Arc<dyn LedgerRepository>,
    clock: Arc<dyn Clock>,
    counter_policy: CounterPolicy,
    report_settings: ReportSettings,
}

impl LedgerServiceBuilder {
    fn new(repository: Arc<dyn LedgerRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            counter_policy: CounterPolicy::default(),
            report_settings: ReportSettings::default(),
        }
    }

    pub fn with_counter_policy(mut self, policy: CounterPolicy) -> Self {
        self.counter_policy = policy;
        self
    }

    pub fn with_report_settings(mut self, settings: ReportSettings) -> Self {
        self.report_settings = settings;
        self
    }

    pub fn build(self) -> LedgerService {
        LedgerService {
            repository: self.repository,
            clock: self.clock,
            counter_policy: self.counter_policy,
            report_settings: self.report_settings,
            write_lock: AsyncMutex::new(()),
        }
    }
}
