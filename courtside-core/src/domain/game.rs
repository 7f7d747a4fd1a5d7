//! Typed rows produced by the dataset assembler.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One team game from the season game log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    /// `None` when the upstream date string could not be parsed.
    pub game_date: Option<NaiveDate>,
    pub matchup: String,
    /// "W" or "L"; empty while the game is unplayed.
    pub wl: String,
    pub points: i32,
    pub field_goal_pct: Option<f64>,
    pub three_pt_pct: Option<f64>,
    pub rebounds: i32,
    pub assists: i32,
    pub season: String,
}

impl GameRecord {
    pub fn is_win(&self) -> bool {
        self.wl.eq_ignore_ascii_case("W")
    }

    /// True for home games (`TOR vs. BOS`), false for away (`TOR @ BOS`).
    pub fn is_home(&self) -> bool {
        self.matchup.contains("vs")
    }
}

/// One player's line for a single game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerGameRecord {
    pub player_id: String,
    pub player_name: String,
    pub game_date: Option<NaiveDate>,
    pub points: i32,
    pub rebounds: i32,
    pub assists: i32,
    pub steals: i32,
    pub blocks: i32,
    pub turnovers: i32,
    pub field_goal_pct: Option<f64>,
    pub three_pt_pct: Option<f64>,
    pub season: String,
}

/// A roster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: String,
    pub player_name: String,
}

impl fmt::Display for RosterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.player_name, self.player_id)
    }
}

/// Score state of the team's game in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveGameSnapshot {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    pub period: i32,
    pub game_clock: String,
    pub status: String,
}
