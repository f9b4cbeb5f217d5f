// Library crate for the badminton doubles ledger
// This file exposes the public API for the console binary and integration tests

pub mod clock;
pub mod config;
pub mod ledger;
pub mod player;
pub mod shared;
pub mod stats;

// Re-export commonly used types for easier access in tests
pub use clock::{Clock, FixedOffsetClock, ManualClock};
pub use config::{ConfigError, LedgerConfig};
pub use ledger::{
    Command, CounterPolicy, DailyState, InMemoryLedgerRepository, JsonFileLedgerRepository,
    LedgerRepository, LedgerService, MatchRecord, Outcome,
};
pub use player::{normalize, PlayerKey, Registration};
pub use shared::AppError;
pub use stats::{DailyReport, ReportSettings, UnmatchedPolicy, WindowSet};
