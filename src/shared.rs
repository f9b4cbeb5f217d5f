use thiserror::Error;

use crate::player::PlayerKey;

/// Every way an operation on the ledger can be rejected.
///
/// Validation variants are raised before any mutation, so a caller that
/// receives one can keep using the state it already holds.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid name: a player name must contain at least one visible character")]
    InvalidName,

    #[error("Not found: no player registered as {0}")]
    NotFound(PlayerKey),

    #[error("Conflict: {0} is already registered to a different player")]
    Conflict(PlayerKey),

    #[error("Incomplete selection: a match needs exactly 4 players")]
    IncompleteSelection,

    #[error("Unknown player: {0} is not registered")]
    UnknownPlayer(PlayerKey),

    #[error("Duplicate player: {0} was selected more than once")]
    DuplicatePlayer(PlayerKey),

    #[error("Match ids exhausted: no further match can be recorded today")]
    MatchIdsExhausted,

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Revision conflict: expected revision {expected}, stored revision is {found}")]
    RevisionConflict { expected: u64, found: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for the rejections caused by user input rather than storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::InvalidName
                | AppError::NotFound(_)
                | AppError::Conflict(_)
                | AppError::IncompleteSelection
                | AppError::UnknownPlayer(_)
                | AppError::DuplicatePlayer(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::CorruptSnapshot(err.to_string())
    }
}
