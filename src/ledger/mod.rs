pub mod command;
pub mod models;
pub mod repository;
pub mod rollover;
pub mod service;
pub mod snapshot;

mod matches;

pub use command::{apply, Command, CommandContext, Outcome};
pub use models::{CounterPolicy, DailyState, MatchId, MatchRecord, MATCH_SIZE};
pub use repository::{InMemoryLedgerRepository, JsonFileLedgerRepository, LedgerRepository};
pub use rollover::{rollover, DayArchive, DayStatus};
pub use service::{LedgerService, LedgerServiceBuilder};
