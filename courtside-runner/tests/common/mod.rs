//! In-memory stats provider for orchestrator tests. No network.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use courtside_core::config::AppConfig;
use courtside_core::data::nba::LIVE_HEADERS;
use courtside_core::data::{CacheStore, DataError, RateLimiter, RawTable, StatsProvider};
use courtside_runner::TeamDataManager;

pub const TEAM_ID: &str = "1610612761";

pub const ROSTER: [(&str, &str); 3] = [
    ("1630567", "Scottie Barnes"),
    ("1631104", "Immanuel Quickley"),
    ("1628384", "Jakob Poeltl"),
];

/// Fake upstream: deterministic game logs, optional per-slice failures, and
/// a log of every call made.
#[derive(Default)]
pub struct FakeProvider {
    pub games_per_season: usize,
    pub failing_seasons: HashSet<String>,
    pub failing_players: HashSet<String>,
    pub live_fails: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(games_per_season: usize) -> Self {
        Self {
            games_per_season,
            ..Self::default()
        }
    }

    pub fn failing_season(mut self, season: &str) -> Self {
        self.failing_seasons.insert(season.to_string());
        self
    }

    pub fn failing_player(mut self, player_id: &str) -> Self {
        self.failing_players.insert(player_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn season_start(season: &str) -> i32 {
    season[..4].parse().unwrap()
}

fn upstream_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string().to_uppercase()
}

impl StatsProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn fetch_team_games(&self, team_id: &str, season: &str) -> Result<RawTable, DataError> {
        self.record(format!("team_games:{team_id}:{season}"));
        if self.failing_seasons.contains(season) {
            return Err(DataError::UpstreamUnavailable(format!("HTTP 503 for {season}")));
        }
        let opener = NaiveDate::from_ymd_opt(season_start(season), 10, 22).unwrap();
        let rows: Vec<Vec<Value>> = (0..self.games_per_season)
            .map(|i| {
                let points = 100 + ((i * 7) % 25) as i64;
                vec![
                    json!(team_id.parse::<i64>().unwrap_or(0)),
                    json!(format!("002{}{i:04}", season_start(season) % 100)),
                    json!(upstream_date(opener + Duration::days(2 * i as i64))),
                    json!(if i % 2 == 0 { "TOR vs. BOS" } else { "TOR @ NYK" }),
                    json!(if points >= 110 { "W" } else { "L" }),
                    json!(0.42 + (i % 6) as f64 * 0.01),
                    json!(0.33 + (i % 4) as f64 * 0.01),
                    json!(40 + (i % 5) as i64),
                    json!(24 + (i % 7) as i64),
                    json!(points),
                ]
            })
            .collect();
        Ok(RawTable::new(
            [
                "Team_ID", "Game_ID", "GAME_DATE", "MATCHUP", "WL", "FG_PCT", "FG3_PCT", "REB",
                "AST", "PTS",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            rows,
        ))
    }

    fn fetch_roster(&self, team_id: &str, season: &str) -> Result<RawTable, DataError> {
        self.record(format!("roster:{team_id}:{season}"));
        Ok(RawTable::new(
            vec!["TeamID".into(), "PLAYER".into(), "PLAYER_ID".into()],
            ROSTER
                .iter()
                .map(|(id, name)| vec![json!(team_id), json!(name), json!(id.parse::<i64>().unwrap())])
                .collect(),
        ))
    }

    fn fetch_player_games(&self, player_id: &str, season: &str) -> Result<RawTable, DataError> {
        self.record(format!("player_games:{player_id}:{season}"));
        if self.failing_players.contains(player_id) {
            return Err(DataError::RateLimited {
                retry_after_secs: 60,
            });
        }
        let opener = NaiveDate::from_ymd_opt(season_start(season), 10, 22).unwrap();
        let rows = (0..2)
            .map(|i: i64| {
                vec![
                    json!(player_id),
                    json!(upstream_date(opener + Duration::days(2 * i))),
                    json!(15 + i * 5),
                    json!(6),
                    json!(4),
                    json!(1),
                    json!(0),
                    json!(2),
                    json!(0.5),
                    json!(null),
                ]
            })
            .collect();
        Ok(RawTable::new(
            [
                "Player_ID", "GAME_DATE", "PTS", "REB", "AST", "STL", "BLK", "TOV", "FG_PCT",
                "FG3_PCT",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            rows,
        ))
    }

    fn fetch_live_scoreboard(&self) -> Result<RawTable, DataError> {
        self.record("live_scoreboard".to_string());
        if self.live_fails {
            return Err(DataError::UpstreamUnavailable("connection reset".into()));
        }
        Ok(RawTable::new(
            LIVE_HEADERS.iter().map(|h| h.to_string()).collect(),
            vec![vec![
                json!("0022400140"),
                json!("Q3 5:12"),
                json!(3),
                json!("PT05M12.00S"),
                json!(TEAM_ID),
                json!("Raptors"),
                json!(78),
                json!("1610612738"),
                json!("Celtics"),
                json!(81),
            ]],
        ))
    }
}

pub fn test_config(comparison: &[&str]) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.delay_secs = 0.0;
    config.api.team_id = TEAM_ID.to_string();
    config.dashboard.default_season = "2024-25".to_string();
    config.dashboard.comparison_seasons = comparison.iter().map(|s| s.to_string()).collect();
    config
}

/// Manager over a fake provider with an in-process cache and no delay.
pub fn manager_with(
    provider: Arc<FakeProvider>,
    cache: Arc<CacheStore>,
    config: AppConfig,
) -> TeamDataManager {
    TeamDataManager::new(provider, cache, Arc::new(RateLimiter::disabled()), config)
}

pub fn manager(provider: Arc<FakeProvider>) -> TeamDataManager {
    manager_with(
        provider,
        Arc::new(CacheStore::in_process()),
        test_config(&[]),
    )
}
