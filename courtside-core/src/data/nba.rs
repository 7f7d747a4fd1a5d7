//! NBA stats provider.
//!
//! Fetches game logs and rosters from the `stats.nba.com` JSON endpoints and the
//! live scoreboard from the `cdn.nba.com` feed. Every endpoint answers with a
//! `resultSets` array of `{headers, rowSet}` tables except the live feed, which
//! is flattened here into the same tabular shape.
//!
//! The stats host rejects requests without browser-like headers and is slow
//! to answer; the client timeout is the only protection against a hung call.

use super::provider::{DataError, RawTable, StatsProvider};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_STATS_URL: &str = "https://stats.nba.com/stats";
pub const DEFAULT_LIVE_URL: &str =
    "https://cdn.nba.com/static/json/liveData/scoreboard/todaysScoreboard_00.json";

/// Headers of the flattened live scoreboard table.
pub const LIVE_HEADERS: [&str; 10] = [
    "gameId",
    "gameStatusText",
    "period",
    "gameClock",
    "homeTeamId",
    "homeTeamName",
    "homeScore",
    "awayTeamId",
    "awayTeamName",
    "awayScore",
];

/// `stats.nba.com` response envelope.
#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    name: String,
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct LiveResponse {
    scoreboard: LiveScoreboard,
}

#[derive(Debug, Deserialize)]
struct LiveScoreboard {
    #[serde(default)]
    games: Vec<LiveGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveGame {
    game_id: String,
    #[serde(default)]
    game_status_text: String,
    #[serde(default)]
    period: i64,
    #[serde(default)]
    game_clock: String,
    home_team: LiveTeam,
    away_team: LiveTeam,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveTeam {
    team_id: i64,
    team_name: String,
    #[serde(default)]
    score: i64,
}

/// Client settings.
#[derive(Debug, Clone)]
pub struct NbaClientOptions {
    pub stats_url: String,
    pub live_url: String,
    pub timeout: Duration,
    /// Extra attempts after a failed call. Zero means no retry.
    pub retry_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for NbaClientOptions {
    fn default() -> Self {
        Self {
            stats_url: DEFAULT_STATS_URL.to_string(),
            live_url: DEFAULT_LIVE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry_attempts: 0,
            base_backoff: Duration::from_millis(500),
        }
    }
}

/// Longest single wait between retries.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// `base * 2^(attempt - 1)`, capped at [`MAX_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// NBA stats provider.
pub struct NbaStatsClient {
    client: reqwest::blocking::Client,
    options: NbaClientOptions,
}

impl NbaStatsClient {
    pub fn new(options: NbaClientOptions) -> Result<Self, DataError> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in [
            ("accept", "application/json, text/plain, */*"),
            ("accept-language", "en-US,en;q=0.9"),
            ("origin", "https://www.nba.com"),
            ("referer", "https://www.nba.com/"),
            ("x-nba-stats-origin", "stats"),
            ("x-nba-stats-token", "true"),
        ] {
            headers.insert(name, reqwest::header::HeaderValue::from_static(value));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .default_headers(headers)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, options })
    }

    fn endpoint_url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let query: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{k}={}", v.replace(' ', "+")))
            .collect();
        format!("{}/{endpoint}?{}", self.options.stats_url, query.join("&"))
    }

    /// Take the first result set of a stats response.
    fn parse_stats(endpoint: &str, resp: StatsResponse) -> Result<RawTable, DataError> {
        let set = resp.result_sets.into_iter().next().ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("{endpoint}: no result sets"))
        })?;
        if set.headers.is_empty() {
            return Err(DataError::ResponseFormatChanged(format!(
                "{endpoint}: result set '{}' has no headers",
                set.name
            )));
        }
        Ok(RawTable::new(set.headers, set.row_set))
    }

    /// Flatten the live scoreboard into one row per game.
    fn parse_live(resp: LiveResponse) -> RawTable {
        let rows = resp
            .scoreboard
            .games
            .into_iter()
            .map(|g| {
                vec![
                    json!(g.game_id),
                    json!(g.game_status_text.trim()),
                    json!(g.period),
                    json!(g.game_clock),
                    json!(g.home_team.team_id.to_string()),
                    json!(g.home_team.team_name),
                    json!(g.home_team.score),
                    json!(g.away_team.team_id.to_string()),
                    json!(g.away_team.team_name),
                    json!(g.away_team.score),
                ]
            })
            .collect();
        RawTable::new(LIVE_HEADERS.iter().map(|h| h.to_string()).collect(), rows)
    }

    /// GET a JSON document, retrying transient failures when configured.
    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.options.retry_attempts {
            if attempt > 0 {
                std::thread::sleep(backoff_delay(self.options.base_backoff, attempt));
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status.is_server_error() {
                        last_error = Some(DataError::UpstreamUnavailable(format!(
                            "HTTP {status} for {url}"
                        )));
                        continue;
                    }

                    if !status.is_success() {
                        return Err(DataError::UpstreamUnavailable(format!(
                            "HTTP {status} for {url}"
                        )));
                    }

                    return resp.json::<T>().map_err(|e| {
                        DataError::ResponseFormatChanged(format!("failed to parse {url}: {e}"))
                    });
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::UpstreamUnavailable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::UpstreamUnavailable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }

    fn fetch_stats(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<RawTable, DataError> {
        let url = self.endpoint_url(endpoint, params);
        tracing::debug!(%url, "stats request");
        let resp: StatsResponse = self.get_json(&url)?;
        Self::parse_stats(endpoint, resp)
    }
}

impl StatsProvider for NbaStatsClient {
    fn name(&self) -> &str {
        "nba_stats"
    }

    fn fetch_team_games(&self, team_id: &str, season: &str) -> Result<RawTable, DataError> {
        self.fetch_stats(
            "teamgamelog",
            &[
                ("TeamID", team_id),
                ("Season", season),
                ("SeasonType", "Regular Season"),
            ],
        )
    }

    fn fetch_roster(&self, team_id: &str, season: &str) -> Result<RawTable, DataError> {
        self.fetch_stats(
            "commonteamroster",
            &[("TeamID", team_id), ("Season", season), ("LeagueID", "00")],
        )
    }

    fn fetch_player_games(&self, player_id: &str, season: &str) -> Result<RawTable, DataError> {
        self.fetch_stats(
            "playergamelog",
            &[
                ("PlayerID", player_id),
                ("Season", season),
                ("SeasonType", "Regular Season"),
            ],
        )
    }

    fn fetch_live_scoreboard(&self) -> Result<RawTable, DataError> {
        let url = self.options.live_url.clone();
        tracing::debug!(%url, "live scoreboard request");
        let resp: LiveResponse = self.get_json(&url)?;
        Ok(Self::parse_live(resp))
    }
}
