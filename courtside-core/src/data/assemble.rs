//! Dataset assembly: raw upstream rows → typed records → columnar tables.
//!
//! Pure transforms. Same raw input always yields the same table, column order
//! included. Rows missing a required field are skipped with a warning rather
//! than failing the whole fetch; unparseable dates become null.

use chrono::NaiveDate;
use polars::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

use super::provider::{DataError, RawRecord, RawTable};
use super::table::{date_column, days_to_date};
use crate::domain::{GameRecord, LiveGameSnapshot, PlayerGameRecord, RosterEntry};

/// Trailing window for the rolling averages.
pub const DEFAULT_WINDOW: usize = 5;

/// Upstream date formats, tried in order.
const DATE_FORMATS: [&str; 2] = ["%b %d, %Y", "%Y-%m-%d"];

// ── Scalar parsing ──────────────────────────────────────────────────

/// Parse an upstream date string. Non-strict: anything unrecognized is `None`.
pub fn parse_game_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Numbers and numeric-looking strings → `i32`. Fractions are rounded.
pub fn parse_int(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i32>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i32))
        }
        _ => None,
    }
}

/// Numbers and numeric-looking strings → `f64`.
pub fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn int_field(rec: &RawRecord<'_>, field: &str) -> Option<i32> {
    rec.get(field).and_then(parse_int)
}

fn float_field(rec: &RawRecord<'_>, field: &str) -> Option<f64> {
    rec.get(field).and_then(parse_float)
}

// ── Raw → records ───────────────────────────────────────────────────

/// Team game log rows → records, most recent first.
pub fn assemble_team_games(raw: &RawTable, season: &str) -> Vec<GameRecord> {
    let mut games: Vec<GameRecord> = raw
        .records()
        .enumerate()
        .filter_map(|(i, rec)| {
            let game = game_from_record(&rec, season);
            if game.is_none() {
                tracing::warn!(row = i, season, "skipping malformed team game row");
            }
            game
        })
        .collect();
    sort_games_desc(&mut games);
    games
}

fn game_from_record(rec: &RawRecord<'_>, season: &str) -> Option<GameRecord> {
    // GAME_DATE must be present; an unparseable value is still kept as null.
    let date_text = rec.text("GAME_DATE")?;
    Some(GameRecord {
        game_id: rec.text("Game_ID").unwrap_or_default(),
        game_date: parse_game_date(&date_text),
        matchup: rec.text("MATCHUP")?,
        wl: rec.text("WL").unwrap_or_default(),
        points: int_field(rec, "PTS")?,
        field_goal_pct: float_field(rec, "FG_PCT"),
        three_pt_pct: float_field(rec, "FG3_PCT"),
        rebounds: int_field(rec, "REB").unwrap_or(0),
        assists: int_field(rec, "AST").unwrap_or(0),
        season: season.to_string(),
    })
}

/// Player game log rows → records for one roster player.
pub fn assemble_player_games(
    raw: &RawTable,
    player: &RosterEntry,
    season: &str,
) -> Vec<PlayerGameRecord> {
    let mut games: Vec<PlayerGameRecord> = raw
        .records()
        .enumerate()
        .filter_map(|(i, rec)| {
            let game = player_game_from_record(&rec, player, season);
            if game.is_none() {
                tracing::warn!(
                    row = i,
                    player = %player.player_name,
                    season,
                    "skipping malformed player game row"
                );
            }
            game
        })
        .collect();
    sort_player_games(&mut games);
    games
}

fn player_game_from_record(
    rec: &RawRecord<'_>,
    player: &RosterEntry,
    season: &str,
) -> Option<PlayerGameRecord> {
    let date_text = rec.text("GAME_DATE")?;
    Some(PlayerGameRecord {
        player_id: rec.text("Player_ID")?,
        player_name: player.player_name.clone(),
        game_date: parse_game_date(&date_text),
        points: int_field(rec, "PTS")?,
        rebounds: int_field(rec, "REB").unwrap_or(0),
        assists: int_field(rec, "AST").unwrap_or(0),
        steals: int_field(rec, "STL").unwrap_or(0),
        blocks: int_field(rec, "BLK").unwrap_or(0),
        turnovers: int_field(rec, "TOV").unwrap_or(0),
        field_goal_pct: float_field(rec, "FG_PCT"),
        three_pt_pct: float_field(rec, "FG3_PCT"),
        season: season.to_string(),
    })
}

/// Roster rows → entries. Rows without an id or name are skipped.
pub fn assemble_roster(raw: &RawTable) -> Vec<RosterEntry> {
    raw.records()
        .filter_map(|rec| match (rec.text("PLAYER_ID"), rec.text("PLAYER")) {
            (Some(player_id), Some(player_name)) => Some(RosterEntry {
                player_id,
                player_name,
            }),
            _ => {
                tracing::warn!("skipping malformed roster row");
                None
            }
        })
        .collect()
}

/// Find the team's game on the flattened live scoreboard.
pub fn live_snapshot(raw: &RawTable, team_id: &str) -> Option<LiveGameSnapshot> {
    raw.records()
        .find(|rec| {
            rec.text("homeTeamId").as_deref() == Some(team_id)
                || rec.text("awayTeamId").as_deref() == Some(team_id)
        })
        .and_then(|rec| {
            Some(LiveGameSnapshot {
                game_id: rec.text("gameId")?,
                home_team: rec.text("homeTeamName")?,
                away_team: rec.text("awayTeamName")?,
                home_score: int_field(&rec, "homeScore").unwrap_or(0),
                away_score: int_field(&rec, "awayScore").unwrap_or(0),
                period: int_field(&rec, "period").unwrap_or(0),
                game_clock: rec.text("gameClock").unwrap_or_default(),
                status: rec
                    .text("gameStatusText")
                    .unwrap_or_else(|| "Unknown".to_string()),
            })
        })
}

// ── Sorting ─────────────────────────────────────────────────────────

/// Most recent first; undated rows last; game id breaks ties.
pub fn sort_games_desc(games: &mut [GameRecord]) {
    games.sort_by(|a, b| {
        date_desc_nulls_last(a.game_date, b.game_date).then_with(|| a.game_id.cmp(&b.game_id))
    });
}

/// Player name ascending, then most recent first.
pub fn sort_player_games(games: &mut [PlayerGameRecord]) {
    games.sort_by(|a, b| {
        a.player_name
            .cmp(&b.player_name)
            .then_with(|| date_desc_nulls_last(a.game_date, b.game_date))
    });
}

fn date_desc_nulls_last(a: Option<NaiveDate>, b: Option<NaiveDate>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ── Records ↔ frames ────────────────────────────────────────────────

pub const GAME_COLUMNS: [&str; 10] = [
    "GAME_ID", "GAME_DATE", "MATCHUP", "WL", "PTS", "FG_PCT", "FG3_PCT", "REB", "AST", "SEASON",
];

pub const PLAYER_COLUMNS: [&str; 12] = [
    "PLAYER_ID",
    "PLAYER_NAME",
    "GAME_DATE",
    "PTS",
    "REB",
    "AST",
    "FG_PCT",
    "FG3_PCT",
    "STL",
    "BLK",
    "TOV",
    "SEASON",
];

pub fn games_to_frame(games: &[GameRecord]) -> Result<DataFrame, DataError> {
    let dates: Vec<Option<NaiveDate>> = games.iter().map(|g| g.game_date).collect();
    Ok(DataFrame::new(vec![
        Column::new(
            "GAME_ID".into(),
            games.iter().map(|g| g.game_id.as_str()).collect::<Vec<_>>(),
        ),
        date_column("GAME_DATE", &dates)?,
        Column::new(
            "MATCHUP".into(),
            games.iter().map(|g| g.matchup.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "WL".into(),
            games.iter().map(|g| g.wl.as_str()).collect::<Vec<_>>(),
        ),
        Column::new("PTS".into(), games.iter().map(|g| g.points).collect::<Vec<_>>()),
        Column::new(
            "FG_PCT".into(),
            games.iter().map(|g| g.field_goal_pct).collect::<Vec<_>>(),
        ),
        Column::new(
            "FG3_PCT".into(),
            games.iter().map(|g| g.three_pt_pct).collect::<Vec<_>>(),
        ),
        Column::new("REB".into(), games.iter().map(|g| g.rebounds).collect::<Vec<_>>()),
        Column::new("AST".into(), games.iter().map(|g| g.assists).collect::<Vec<_>>()),
        Column::new(
            "SEASON".into(),
            games.iter().map(|g| g.season.as_str()).collect::<Vec<_>>(),
        ),
    ])?)
}

/// Read games back from a frame. Only `GAME_DATE` and `PTS` are required;
/// other columns default when absent, so frames decoded from plain column
/// maps are accepted.
pub fn games_from_frame(df: &DataFrame) -> Result<Vec<GameRecord>, DataError> {
    let n = df.height();
    let dates = date_values(df, "GAME_DATE")?;
    let points = required_i32(df, "PTS")?;
    let game_ids = optional_str(df, "GAME_ID")?;
    let matchups = optional_str(df, "MATCHUP")?;
    let wls = optional_str(df, "WL")?;
    let fg = optional_f64(df, "FG_PCT")?;
    let fg3 = optional_f64(df, "FG3_PCT")?;
    let reb = optional_i32(df, "REB")?;
    let ast = optional_i32(df, "AST")?;
    let seasons = optional_str(df, "SEASON")?;

    let mut games = Vec::with_capacity(n);
    for i in 0..n {
        let Some(pts) = points[i] else {
            continue;
        };
        games.push(GameRecord {
            game_id: game_ids[i].clone().unwrap_or_default(),
            game_date: dates[i],
            matchup: matchups[i].clone().unwrap_or_default(),
            wl: wls[i].clone().unwrap_or_default(),
            points: pts,
            field_goal_pct: fg[i],
            three_pt_pct: fg3[i],
            rebounds: reb[i].unwrap_or(0),
            assists: ast[i].unwrap_or(0),
            season: seasons[i].clone().unwrap_or_default(),
        });
    }
    Ok(games)
}

pub fn players_to_frame(games: &[PlayerGameRecord]) -> Result<DataFrame, DataError> {
    let dates: Vec<Option<NaiveDate>> = games.iter().map(|g| g.game_date).collect();
    let ints = |f: fn(&PlayerGameRecord) -> i32| games.iter().map(f).collect::<Vec<i32>>();
    Ok(DataFrame::new(vec![
        Column::new(
            "PLAYER_ID".into(),
            games.iter().map(|g| g.player_id.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "PLAYER_NAME".into(),
            games.iter().map(|g| g.player_name.as_str()).collect::<Vec<_>>(),
        ),
        date_column("GAME_DATE", &dates)?,
        Column::new("PTS".into(), ints(|g| g.points)),
        Column::new("REB".into(), ints(|g| g.rebounds)),
        Column::new("AST".into(), ints(|g| g.assists)),
        Column::new(
            "FG_PCT".into(),
            games.iter().map(|g| g.field_goal_pct).collect::<Vec<_>>(),
        ),
        Column::new(
            "FG3_PCT".into(),
            games.iter().map(|g| g.three_pt_pct).collect::<Vec<_>>(),
        ),
        Column::new("STL".into(), ints(|g| g.steals)),
        Column::new("BLK".into(), ints(|g| g.blocks)),
        Column::new("TOV".into(), ints(|g| g.turnovers)),
        Column::new(
            "SEASON".into(),
            games.iter().map(|g| g.season.as_str()).collect::<Vec<_>>(),
        ),
    ])?)
}

pub fn players_from_frame(df: &DataFrame) -> Result<Vec<PlayerGameRecord>, DataError> {
    let n = df.height();
    let names = required_str(df, "PLAYER_NAME")?;
    let points = required_i32(df, "PTS")?;
    let dates = date_values(df, "GAME_DATE")?;
    let ids = optional_str(df, "PLAYER_ID")?;
    let reb = optional_i32(df, "REB")?;
    let ast = optional_i32(df, "AST")?;
    let stl = optional_i32(df, "STL")?;
    let blk = optional_i32(df, "BLK")?;
    let tov = optional_i32(df, "TOV")?;
    let fg = optional_f64(df, "FG_PCT")?;
    let fg3 = optional_f64(df, "FG3_PCT")?;
    let seasons = optional_str(df, "SEASON")?;

    let mut games = Vec::with_capacity(n);
    for i in 0..n {
        let (Some(name), Some(pts)) = (names[i].clone(), points[i]) else {
            continue;
        };
        games.push(PlayerGameRecord {
            player_id: ids[i].clone().unwrap_or_default(),
            player_name: name,
            game_date: dates[i],
            points: pts,
            rebounds: reb[i].unwrap_or(0),
            assists: ast[i].unwrap_or(0),
            steals: stl[i].unwrap_or(0),
            blocks: blk[i].unwrap_or(0),
            turnovers: tov[i].unwrap_or(0),
            field_goal_pct: fg[i],
            three_pt_pct: fg3[i],
            season: seasons[i].clone().unwrap_or_default(),
        });
    }
    Ok(games)
}

pub fn roster_to_frame(roster: &[RosterEntry]) -> Result<DataFrame, DataError> {
    Ok(DataFrame::new(vec![
        Column::new(
            "PLAYER_ID".into(),
            roster.iter().map(|p| p.player_id.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "PLAYER".into(),
            roster.iter().map(|p| p.player_name.as_str()).collect::<Vec<_>>(),
        ),
    ])?)
}

pub fn roster_from_frame(df: &DataFrame) -> Result<Vec<RosterEntry>, DataError> {
    let ids = required_str(df, "PLAYER_ID")?;
    let names = required_str(df, "PLAYER")?;
    Ok(ids
        .into_iter()
        .zip(names)
        .filter_map(|(id, name)| {
            Some(RosterEntry {
                player_id: id?,
                player_name: name?,
            })
        })
        .collect())
}

pub fn live_to_frame(snapshot: &LiveGameSnapshot) -> Result<DataFrame, DataError> {
    Ok(DataFrame::new(vec![
        Column::new("gameId".into(), [snapshot.game_id.as_str()]),
        Column::new("homeTeam".into(), [snapshot.home_team.as_str()]),
        Column::new("awayTeam".into(), [snapshot.away_team.as_str()]),
        Column::new("homeScore".into(), [snapshot.home_score]),
        Column::new("awayScore".into(), [snapshot.away_score]),
        Column::new("period".into(), [snapshot.period]),
        Column::new("gameClock".into(), [snapshot.game_clock.as_str()]),
        Column::new("gameStatus".into(), [snapshot.status.as_str()]),
    ])?)
}

/// First row of a live frame, if any.
pub fn live_from_frame(df: &DataFrame) -> Result<Option<LiveGameSnapshot>, DataError> {
    if df.height() == 0 {
        return Ok(None);
    }
    let text = |name: &str| -> Result<String, DataError> {
        Ok(required_str(df, name)?[0].clone().unwrap_or_default())
    };
    let int = |name: &str| -> Result<i32, DataError> { Ok(required_i32(df, name)?[0].unwrap_or(0)) };
    Ok(Some(LiveGameSnapshot {
        game_id: text("gameId")?,
        home_team: text("homeTeam")?,
        away_team: text("awayTeam")?,
        home_score: int("homeScore")?,
        away_score: int("awayScore")?,
        period: int("period")?,
        game_clock: text("gameClock")?,
        status: text("gameStatus")?,
    }))
}

// ── Conforming decoded tables ───────────────────────────────────────
//
// A frame decoded from a plain column map has inferred dtypes: Int64 where
// the table holds Int32, Str for an all-null column. These rebuild the
// canonical schema by reading the records back out.

pub fn conform_games(df: DataFrame) -> Result<DataFrame, DataError> {
    games_to_frame(&games_from_frame(&df)?)
}

pub fn conform_players(df: DataFrame) -> Result<DataFrame, DataError> {
    players_to_frame(&players_from_frame(&df)?)
}

pub fn conform_roster(df: DataFrame) -> Result<DataFrame, DataError> {
    roster_to_frame(&roster_from_frame(&df)?)
}

pub fn conform_live(df: DataFrame) -> Result<DataFrame, DataError> {
    match live_from_frame(&df)? {
        Some(snapshot) => live_to_frame(&snapshot),
        None => Ok(df),
    }
}

// ── Column readers ──────────────────────────────────────────────────

fn required_str(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, DataError> {
    let col = df.column(name)?.cast(&DataType::String)?;
    let ca = col.str()?;
    Ok((0..ca.len()).map(|i| ca.get(i).map(str::to_string)).collect())
}

fn required_i32(df: &DataFrame, name: &str) -> Result<Vec<Option<i32>>, DataError> {
    let col = df.column(name)?.cast(&DataType::Int32)?;
    let ca = col.i32()?;
    Ok((0..ca.len()).map(|i| ca.get(i)).collect())
}

fn required_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let col = df.column(name)?.cast(&DataType::Float64)?;
    let ca = col.f64()?;
    Ok((0..ca.len()).map(|i| ca.get(i)).collect())
}

fn optional_str(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, DataError> {
    if df.column(name).is_err() {
        return Ok(vec![None; df.height()]);
    }
    required_str(df, name)
}

fn optional_i32(df: &DataFrame, name: &str) -> Result<Vec<Option<i32>>, DataError> {
    if df.column(name).is_err() {
        return Ok(vec![None; df.height()]);
    }
    required_i32(df, name)
}

fn optional_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    if df.column(name).is_err() {
        return Ok(vec![None; df.height()]);
    }
    required_f64(df, name)
}

/// Dates from a `Date` column, or parsed from a string column.
fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>, DataError> {
    let col = df.column(name)?;
    match col.dtype() {
        DataType::Date => {
            let ca = col.date()?;
            Ok((0..ca.len()).map(|i| ca.get(i).map(days_to_date)).collect())
        }
        DataType::String => {
            let ca = col.str()?;
            Ok((0..ca.len())
                .map(|i| ca.get(i).and_then(parse_game_date))
                .collect())
        }
        other => Err(DataError::Table(format!(
            "column '{name}' has dtype {other:?}, expected a date"
        ))),
    }
}

// ── Derived views ───────────────────────────────────────────────────

/// Trailing mean over `window` values. The first `window - 1` positions, and
/// any window containing a missing value, are `None`.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return result;
    }
    for end in (window - 1)..values.len() {
        let slice = &values[(end + 1 - window)..=end];
        if slice.iter().all(Option::is_some) {
            let sum: f64 = slice.iter().flatten().sum();
            result[end] = Some(sum / window as f64);
        }
    }
    result
}

/// A game with its trailing averages over the preceding window (inclusive).
#[derive(Debug, Clone, PartialEq)]
pub struct TrendRow {
    pub game_date: Option<NaiveDate>,
    pub season: String,
    pub points: i32,
    pub pts_ma: f64,
    pub fg_pct_ma: f64,
    pub fg3_pct_ma: f64,
    pub reb_ma: f64,
    pub ast_ma: f64,
}

/// Rolling features over games in chronological order. Rows whose window is
/// incomplete or touches a missing value are dropped.
pub fn trend_rows(games: &[GameRecord], window: usize) -> Vec<TrendRow> {
    let mut ordered: Vec<&GameRecord> = games.iter().collect();
    ordered.sort_by(|a, b| {
        a.game_date
            .cmp(&b.game_date)
            .then_with(|| a.game_id.cmp(&b.game_id))
    });

    let pts = rolling_mean(
        &ordered.iter().map(|g| Some(g.points as f64)).collect::<Vec<_>>(),
        window,
    );
    let fg = rolling_mean(
        &ordered.iter().map(|g| g.field_goal_pct).collect::<Vec<_>>(),
        window,
    );
    let fg3 = rolling_mean(
        &ordered.iter().map(|g| g.three_pt_pct).collect::<Vec<_>>(),
        window,
    );
    let reb = rolling_mean(
        &ordered.iter().map(|g| Some(g.rebounds as f64)).collect::<Vec<_>>(),
        window,
    );
    let ast = rolling_mean(
        &ordered.iter().map(|g| Some(g.assists as f64)).collect::<Vec<_>>(),
        window,
    );

    ordered
        .iter()
        .enumerate()
        .filter_map(|(i, g)| {
            Some(TrendRow {
                game_date: g.game_date,
                season: g.season.clone(),
                points: g.points,
                pts_ma: pts[i]?,
                fg_pct_ma: fg[i]?,
                fg3_pct_ma: fg3[i]?,
                reb_ma: reb[i]?,
                ast_ma: ast[i]?,
            })
        })
        .collect()
}

/// Trend table; average columns are suffixed with the window,
/// e.g. `pts_ma_5`.
pub fn trend_frame(rows: &[TrendRow], window: usize) -> Result<DataFrame, DataError> {
    let dates: Vec<Option<NaiveDate>> = rows.iter().map(|r| r.game_date).collect();
    let average = |stat: &str, f: fn(&TrendRow) -> f64| {
        Column::new(
            format!("{stat}_ma_{window}").into(),
            rows.iter().map(f).collect::<Vec<f64>>(),
        )
    };
    Ok(DataFrame::new(vec![
        date_column("GAME_DATE", &dates)?,
        Column::new(
            "SEASON".into(),
            rows.iter().map(|r| r.season.as_str()).collect::<Vec<_>>(),
        ),
        Column::new("PTS".into(), rows.iter().map(|r| r.points).collect::<Vec<_>>()),
        average("pts", |r| r.pts_ma),
        average("fg_pct", |r| r.fg_pct_ma),
        average("fg3_pct", |r| r.fg3_pct_ma),
        average("reb", |r| r.reb_ma),
        average("ast", |r| r.ast_ma),
    ])?)
}

/// The `n` most recent games, in the columns a results table shows.
pub fn recent_games(games: &[GameRecord], n: usize) -> Result<DataFrame, DataError> {
    let mut sorted = games.to_vec();
    sort_games_desc(&mut sorted);
    sorted.truncate(n);
    Ok(games_to_frame(&sorted)?.select(["GAME_DATE", "MATCHUP", "WL", "PTS", "FG_PCT", "FG3_PCT"])?)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Per-season aggregates, most recent season first.
pub fn season_summary(games: &[GameRecord]) -> Result<DataFrame, DataError> {
    let mut by_season: BTreeMap<&str, Vec<&GameRecord>> = BTreeMap::new();
    for game in games {
        by_season.entry(game.season.as_str()).or_default().push(game);
    }

    let mut seasons = Vec::new();
    let mut played = Vec::new();
    let mut wins = Vec::new();
    let mut avg_pts = Vec::new();
    let mut avg_fg = Vec::new();
    let mut avg_fg3 = Vec::new();
    for (season, rows) in by_season.iter().rev() {
        seasons.push(*season);
        played.push(rows.len() as u32);
        wins.push(rows.iter().filter(|g| g.is_win()).count() as u32);
        avg_pts.push(mean(rows.iter().map(|g| g.points as f64)).map(|v| round_to(v, 1)));
        avg_fg.push(mean(rows.iter().filter_map(|g| g.field_goal_pct)).map(|v| round_to(v, 3)));
        avg_fg3.push(mean(rows.iter().filter_map(|g| g.three_pt_pct)).map(|v| round_to(v, 3)));
    }

    Ok(DataFrame::new(vec![
        Column::new("SEASON".into(), seasons),
        Column::new("games_played".into(), played),
        Column::new("wins".into(), wins),
        Column::new("avg_points".into(), avg_pts),
        Column::new("avg_fg_pct".into(), avg_fg),
        Column::new("avg_fg3_pct".into(), avg_fg3),
    ])?)
}

/// Per-player means, highest scorer first.
pub fn player_averages(games: &[PlayerGameRecord]) -> Result<DataFrame, DataError> {
    let mut by_player: BTreeMap<&str, Vec<&PlayerGameRecord>> = BTreeMap::new();
    for game in games {
        by_player.entry(game.player_name.as_str()).or_default().push(game);
    }

    let mut rows: Vec<(&str, f64, f64, f64, Option<f64>)> = by_player
        .iter()
        .map(|(name, games)| {
            let avg = |f: fn(&PlayerGameRecord) -> i32| {
                round_to(mean(games.iter().map(|g| f(g) as f64)).unwrap_or(0.0), 1)
            };
            (
                *name,
                avg(|g| g.points),
                avg(|g| g.rebounds),
                avg(|g| g.assists),
                mean(games.iter().filter_map(|g| g.field_goal_pct)).map(|v| round_to(v, 3)),
            )
        })
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    Ok(DataFrame::new(vec![
        Column::new("PLAYER_NAME".into(), rows.iter().map(|r| r.0).collect::<Vec<_>>()),
        Column::new("AVG_PTS".into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
        Column::new("AVG_REB".into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()),
        Column::new("AVG_AST".into(), rows.iter().map(|r| r.3).collect::<Vec<_>>()),
        Column::new("FG_PCT".into(), rows.iter().map(|r| r.4).collect::<Vec<_>>()),
    ])?)
}
