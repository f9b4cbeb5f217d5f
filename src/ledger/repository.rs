use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::models::DailyState;
use super::rollover::DayArchive;
use super::snapshot;
use crate::shared::AppError;

/// Persistence gateway for the single daily snapshot.
///
/// `save` either replaces the stored snapshot completely or fails; it rejects
/// a state whose revision no longer matches what is stored, and returns the
/// revision the state now has on success.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn load(&self) -> Result<Option<DailyState>, AppError>;
    async fn save(&self, state: &DailyState) -> Result<u64, AppError>;
    async fn archive_day(&self, archive: &DayArchive) -> Result<(), AppError>;
}

fn check_revision(state: &DailyState, stored: u64) -> Result<u64, AppError> {
    if state.revision() != stored {
        warn!(
            expected = state.revision(),
            found = stored,
            "Snapshot was written by someone else"
        );
        return Err(AppError::RevisionConflict {
            expected: state.revision(),
            found: stored,
        });
    }
    Ok(stored + 1)
}

/// In-memory implementation of LedgerRepository for development and testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerRepository {
    snapshot: Arc<RwLock<Option<DailyState>>>,
    archives: Arc<RwLock<Vec<DayArchive>>>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `state` already stored, as if a previous run had saved it
    pub fn with_state(state: DailyState) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(Some(state))),
            archives: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn archives(&self) -> Vec<DayArchive> {
        self.archives.read().await.clone()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    #[instrument(skip(self))]
    async fn load(&self) -> Result<Option<DailyState>, AppError> {
        let snapshot = self.snapshot.read().await;
        debug!(found = snapshot.is_some(), "Loading snapshot from memory");
        Ok(snapshot.clone())
    }

    #[instrument(skip(self, state), fields(date = %state.date()))]
    async fn save(&self, state: &DailyState) -> Result<u64, AppError> {
        let mut snapshot = self.snapshot.write().await;
        let stored = snapshot.as_ref().map(DailyState::revision).unwrap_or_default();
        let revision = check_revision(state, stored)?;

        let mut saved = state.clone();
        saved.set_revision(revision);
        *snapshot = Some(saved);

        debug!(revision, "Snapshot saved in memory");
        Ok(revision)
    }

    #[instrument(skip(self, archive), fields(date = %archive.date))]
    async fn archive_day(&self, archive: &DayArchive) -> Result<(), AppError> {
        self.archives.write().await.push(archive.clone());
        debug!(matches = archive.matches.len(), "Day archived in memory");
        Ok(())
    }
}

/// Keeps the snapshot as a JSON document on disk.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// snapshot, so a failed write never leaves a half-written document behind.
#[derive(Debug, Clone)]
pub struct JsonFileLedgerRepository {
    path: PathBuf,
}

impl JsonFileLedgerRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the `sequence`th archive for `archive.date` is written.
    ///
    /// The first close of a date gets `<stem>-<date>.json`; a reset followed by
    /// the rollover of the same date continues with `-2`, `-3`, ...
    pub fn archive_path(&self, archive: &DayArchive, sequence: u32) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("ledger");
        let date = archive.date.format("%Y-%m-%d");
        let name = if sequence <= 1 {
            format!("{stem}-{date}.json")
        } else {
            format!("{stem}-{date}-{sequence}.json")
        };
        self.path.with_file_name(name)
    }

    async fn next_archive_path(&self, archive: &DayArchive) -> Result<PathBuf, AppError> {
        for sequence in 1..=u32::MAX {
            let candidate = self.archive_path(archive, sequence);
            if !tokio::fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(AppError::Internal(format!(
            "no free archive name left for {}",
            archive.date
        )))
    }

    async fn read(&self) -> Result<Option<String>, AppError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn stored_revision(&self) -> Result<u64, AppError> {
        let Some(raw) = self.read().await? else {
            return Ok(0);
        };
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Ok(value
            .get("revision")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or_default())
    }

    async fn write_atomically(&self, target: &Path, contents: String) -> Result<(), AppError> {
        let mut tmp = target.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, contents).await?;
        if let Err(err) = tokio::fs::rename(&tmp, target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for JsonFileLedgerRepository {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<DailyState>, AppError> {
        let Some(raw) = self.read().await? else {
            debug!("No snapshot on disk yet");
            return Ok(None);
        };
        let state = snapshot::decode(&raw)?;
        debug!(date = %state.date(), players = state.registry().len(), "Snapshot loaded");
        Ok(Some(state))
    }

    #[instrument(skip(self, state), fields(path = %self.path.display(), date = %state.date()))]
    async fn save(&self, state: &DailyState) -> Result<u64, AppError> {
        let stored = self.stored_revision().await?;
        let revision = check_revision(state, stored)?;

        let mut saved = state.clone();
        saved.set_revision(revision);
        self.write_atomically(&self.path, snapshot::encode(&saved)?)
            .await?;

        debug!(revision, "Snapshot written");
        Ok(revision)
    }

    #[instrument(skip(self, archive), fields(date = %archive.date))]
    async fn archive_day(&self, archive: &DayArchive) -> Result<(), AppError> {
        if archive.is_empty() {
            debug!("Nothing played, skipping archive");
            return Ok(());
        }
        let target = self.next_archive_path(archive).await?;
        let contents = serde_json::to_string_pretty(archive)?;
        self.write_atomically(&target, contents).await?;
        info!(path = %target.display(), matches = archive.matches.len(), "Day archived");
        Ok(())
    }
}
