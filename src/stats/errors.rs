use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("Invalid time window: {0}")]
    InvalidWindow(String),
}
