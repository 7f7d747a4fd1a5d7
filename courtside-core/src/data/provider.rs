//! Stats provider trait and structured error types.
//!
//! The StatsProvider trait abstracts over the upstream stats service so the
//! orchestrator can be driven by the live HTTP client or by an in-memory fake
//! in tests. Providers are not rate-limited or cached themselves: the caller
//! throttles before each call and the cache layer sits above this trait.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in both CLI and log contexts.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("rate limited by upstream (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("data error: {0}")]
    Other(String),
}

impl From<polars::error::PolarsError> for DataError {
    fn from(e: polars::error::PolarsError) -> Self {
        DataError::Table(e.to_string())
    }
}

/// A raw upstream result set: header names plus positional rows.
///
/// Mirrors the `resultSets[i]` shape of the stats service: values stay as the
/// JSON scalars the service sent (numbers, strings or nulls).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index for a header, matched case-insensitively
    /// (the service mixes `Game_ID` with `GAME_DATE`).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .or_else(|| self.headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
    }

    /// Iterate rows as header-addressable records.
    pub fn records(&self) -> impl Iterator<Item = RawRecord<'_>> {
        self.rows.iter().map(move |row| RawRecord {
            table: self,
            row: row.as_slice(),
        })
    }
}

/// One row of a [`RawTable`], addressable by header name.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    table: &'a RawTable,
    row: &'a [Value],
}

impl<'a> RawRecord<'a> {
    /// The field value, or `None` if the header is absent or the row is short.
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.table
            .column_index(field)
            .and_then(|idx| self.row.get(idx))
    }

    /// Field rendered as a string; numbers are formatted, null is `None`.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Trait for upstream stats sources.
///
/// All calls are blocking. Each method corresponds to exactly one network
/// request, so callers can apply the rate limiter once per call.
pub trait StatsProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Regular-season game log for a team.
    fn fetch_team_games(&self, team_id: &str, season: &str) -> Result<RawTable, DataError>;

    /// Current roster for a team (`PLAYER_ID`, `PLAYER`, ...).
    fn fetch_roster(&self, team_id: &str, season: &str) -> Result<RawTable, DataError>;

    /// Regular-season game log for a player.
    fn fetch_player_games(&self, player_id: &str, season: &str) -> Result<RawTable, DataError>;

    /// Today's scoreboard, one row per game.
    fn fetch_live_scoreboard(&self) -> Result<RawTable, DataError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_table() -> RawTable {
        RawTable::new(
            vec!["Game_ID".into(), "GAME_DATE".into(), "PTS".into()],
            vec![
                vec![json!("0022400061"), json!("OCT 23, 2024"), json!(106)],
                vec![json!("0022400062"), json!(null)],
            ],
        )
    }

    #[test]
    fn record_lookup_is_case_insensitive() {
        let table = sample_table();
        let first = table.records().next().unwrap();
        assert_eq!(first.text("GAME_ID").as_deref(), Some("0022400061"));
        assert_eq!(first.text("PTS").as_deref(), Some("106"));
    }

    #[test]
    fn short_rows_and_nulls_read_as_missing() {
        let table = sample_table();
        let second = table.records().nth(1).unwrap();
        assert_eq!(second.text("GAME_DATE"), None);
        assert!(second.get("PTS").is_none());
        assert!(second.get("NOT_A_COLUMN").is_none());
    }
}
