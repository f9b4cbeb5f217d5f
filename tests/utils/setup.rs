use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

use courtlog::{
    ledger::{CounterPolicy, InMemoryLedgerRepository, LedgerService},
    stats::ReportSettings,
    Clock, ManualClock, PlayerKey,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub service: LedgerService,
    pub repository: Arc<InMemoryLedgerRepository>,
    pub clock: ManualClock,
    pub players: Vec<String>,
}

pub struct TestSetupBuilder {
    players: Vec<String>,
    start: NaiveDateTime,
    counter_policy: CounterPolicy,
    report_settings: ReportSettings,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: vec![],
            start: at(1, 6, 0),
            counter_policy: CounterPolicy::default(),
            report_settings: ReportSettings::default(),
        }
    }

    pub fn with_players(mut self, players: Vec<&str>) -> Self {
        self.players = players.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_four_players(self) -> Self {
        self.with_players(vec!["alice", "bob", "carol", "dave"])
    }

    pub fn starting_at(mut self, start: NaiveDateTime) -> Self {
        self.start = start;
        self
    }

    pub fn with_counter_policy(mut self, policy: CounterPolicy) -> Self {
        self.counter_policy = policy;
        self
    }

    pub fn with_report_settings(mut self, settings: ReportSettings) -> Self {
        self.report_settings = settings;
        self
    }

    pub async fn build(self) -> TestSetup {
        let repository = Arc::new(InMemoryLedgerRepository::new());
        let clock = ManualClock::new(self.start);
        let service = LedgerService::builder(repository.clone(), Arc::new(clock.clone()))
            .with_counter_policy(self.counter_policy)
            .with_report_settings(self.report_settings)
            .build();

        for player in &self.players {
            service.register_player(player).await.unwrap();
        }

        TestSetup {
            service,
            repository,
            clock,
            players: self.players,
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSetup {
    /// Plays a match between the first four registered players at `h:m`
    pub async fn play_at(&self, h: u32, m: u32) {
        let today = self.clock.today();
        self.clock.set(today.and_hms_opt(h, m, 0).unwrap());
        self.service
            .add_match(&self.players[..4], None)
            .await
            .unwrap();
    }
}

/// January 2024, `day` at `h:m`
pub fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

pub fn key(name: &str) -> PlayerKey {
    PlayerKey::parse(name).unwrap()
}
