//! Team data manager: the consumer-facing query surface.
//!
//! Every query goes through the cache. Multi-slice queries (all players of a
//! roster, several seasons) fan out over a per-request worker pool, drop the
//! slices that failed and re-sort the survivors so the result does not depend
//! on completion order.
//!
//! Collaborators are injected: the stats provider, the cache store and the
//! rate limiter can be shared between managers or replaced by fakes.

use std::sync::Arc;

use courtside_core::config::{AppConfig, ConfigError};
use courtside_core::data::assemble;
use courtside_core::data::{
    CacheStatsSnapshot, CacheStore, DataError, NbaClientOptions, NbaStatsClient, RateLimiter,
    StatsProvider,
};
use courtside_core::domain::{
    GameRecord, LiveGameSnapshot, PlayerGameRecord, RosterEntry, Season, SeasonError,
};
use polars::prelude::DataFrame;
use thiserror::Error;

use crate::fanout::{fan_out, merge_successes};
use crate::memoize::{Memoized, Operation};

/// Errors surfaced by the query surface.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid season: {0}")]
    Season(#[from] SeasonError),
}

pub struct TeamDataManager {
    provider: Arc<dyn StatsProvider>,
    cache: Arc<CacheStore>,
    limiter: Arc<RateLimiter>,
    config: AppConfig,
}

impl TeamDataManager {
    pub fn new(
        provider: Arc<dyn StatsProvider>,
        cache: Arc<CacheStore>,
        limiter: Arc<RateLimiter>,
        config: AppConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            limiter,
            config,
        }
    }

    /// Wire up the NBA client, the configured cache tiers and the rate limiter.
    pub fn from_config(config: AppConfig) -> Result<Self, FetchError> {
        config.validate()?;
        let options = NbaClientOptions {
            stats_url: config.api.stats_url.clone(),
            live_url: config.api.live_url.clone(),
            timeout: config.timeout(),
            retry_attempts: config.api.retry_attempts,
            ..NbaClientOptions::default()
        };
        let provider = Arc::new(NbaStatsClient::new(options)?);
        let cache = Arc::new(CacheStore::from_config(&config.cache));
        let limiter = Arc::new(RateLimiter::new(config.rate_limit_delay()));
        Ok(Self::new(provider, cache, limiter, config))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn team_id(&self) -> &str {
        &self.config.api.team_id
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn memo(&self, operation: Operation) -> Memoized<'_> {
        Memoized::for_operation(&self.cache, operation, &self.config.cache.ttl)
    }

    fn resolve_season(&self, season: Option<&str>) -> Result<Season, FetchError> {
        match season {
            Some(s) => Ok(s.parse()?),
            None => Ok(self.config.default_season()?),
        }
    }

    // ── Single-slice fetches ─────────────────────────────────────────

    fn team_games_for(&self, season: &Season) -> Result<Option<DataFrame>, DataError> {
        let season_label = season.to_string();
        self.memo(Operation::TeamGames)
            .get_or_fetch(&[self.team_id(), &season_label], || {
                self.limiter.throttle();
                let raw = self.provider.fetch_team_games(self.team_id(), &season_label)?;
                let games = assemble::assemble_team_games(&raw, &season_label);
                tracing::info!(season = %season_label, games = games.len(), "fetched team games");
                if games.is_empty() {
                    return Ok(None);
                }
                Ok(Some(assemble::games_to_frame(&games)?))
            })
    }

    /// Roster for a season.
    pub fn get_roster(&self, season: Option<&str>) -> Result<Vec<RosterEntry>, FetchError> {
        let season = self.resolve_season(season)?;
        Ok(self.roster_for(&season)?)
    }

    fn roster_for(&self, season: &Season) -> Result<Vec<RosterEntry>, DataError> {
        let season_label = season.to_string();
        let frame = self
            .memo(Operation::Roster)
            .get_or_fetch(&[self.team_id(), &season_label], || {
                self.limiter.throttle();
                let raw = self.provider.fetch_roster(self.team_id(), &season_label)?;
                let roster = assemble::assemble_roster(&raw);
                tracing::info!(season = %season_label, players = roster.len(), "fetched roster");
                if roster.is_empty() {
                    return Ok(None);
                }
                Ok(Some(assemble::roster_to_frame(&roster)?))
            })?;
        match frame {
            Some(df) => assemble::roster_from_frame(&df),
            None => Ok(Vec::new()),
        }
    }

    /// One player's game log for a season, keyed by player id.
    pub fn get_player_games(
        &self,
        player: &RosterEntry,
        season: &Season,
    ) -> Result<Option<DataFrame>, DataError> {
        let season_label = season.to_string();
        self.memo(Operation::PlayerGames)
            .get_or_fetch(&[&player.player_id, &season_label], || {
                self.limiter.throttle();
                let raw = self
                    .provider
                    .fetch_player_games(&player.player_id, &season_label)?;
                let games = assemble::assemble_player_games(&raw, player, &season_label);
                if games.is_empty() {
                    return Ok(None);
                }
                Ok(Some(assemble::players_to_frame(&games)?))
            })
    }

    // ── Query surface ────────────────────────────────────────────────

    /// Team game log, most recent first. `None` means no data.
    pub fn get_team_games(&self, season: Option<&str>) -> Result<Option<DataFrame>, FetchError> {
        let season = self.resolve_season(season)?;
        Ok(self.team_games_for(&season)?)
    }

    /// Every roster player's games for a season, ordered by player name then
    /// most recent game. Players whose fetch failed are left out.
    pub fn get_player_stats(&self, season: Option<&str>) -> Result<Option<DataFrame>, FetchError> {
        let season = self.resolve_season(season)?;
        let season_label = season.to_string();
        let frame = self
            .memo(Operation::PlayerStats)
            .get_or_fetch(&[self.team_id(), &season_label], || {
                let roster = self.roster_for(&season)?;
                if roster.is_empty() {
                    return Ok(None);
                }
                let outcomes = fan_out(
                    "players",
                    self.config.fanout.player_workers,
                    &roster,
                    |player| self.get_player_games(player, &season),
                );
                match merge_successes("players", outcomes) {
                    Some(df) => {
                        let mut games = assemble::players_from_frame(&df)?;
                        assemble::sort_player_games(&mut games);
                        Ok(Some(assemble::players_to_frame(&games)?))
                    }
                    None => Ok(None),
                }
            })?;
        Ok(frame)
    }

    /// The team's game on today's scoreboard. Upstream failures read as
    /// "no live game".
    pub fn get_live_game_stats(&self) -> Option<LiveGameSnapshot> {
        let result = self
            .memo(Operation::LiveGame)
            .get_or_fetch(&[self.team_id()], || {
                self.limiter.throttle();
                let raw = self.provider.fetch_live_scoreboard()?;
                match assemble::live_snapshot(&raw, self.team_id()) {
                    Some(snapshot) => Ok(Some(assemble::live_to_frame(&snapshot)?)),
                    None => Ok(None),
                }
            })
            .and_then(|frame| match frame {
                Some(df) => assemble::live_from_frame(&df),
                None => Ok(None),
            });
        match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "live scoreboard unavailable");
                None
            }
        }
    }

    /// Game logs of the comparison seasons stacked together, most recent
    /// first. Seasons whose fetch failed are left out.
    pub fn get_season_comparison(&self) -> Result<Option<DataFrame>, FetchError> {
        let seasons = self.config.comparison_seasons()?;
        let labels: Vec<String> = seasons.iter().map(Season::to_string).collect();
        let joined = labels.join(",");
        let frame = self
            .memo(Operation::SeasonComparison)
            .get_or_fetch(&[self.team_id(), &joined], || {
                let outcomes = fan_out(
                    "seasons",
                    self.config.fanout.season_workers,
                    &seasons,
                    |season| self.team_games_for(season),
                );
                match merge_successes("seasons", outcomes) {
                    Some(df) => {
                        let mut games = assemble::games_from_frame(&df)?;
                        assemble::sort_games_desc(&mut games);
                        Ok(Some(assemble::games_to_frame(&games)?))
                    }
                    None => Ok(None),
                }
            })?;
        Ok(frame)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn get_cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.get_stats()
    }

    // ── Derived views ────────────────────────────────────────────────

    /// Typed team games for a season; empty when there is no data.
    pub fn team_game_records(&self, season: Option<&str>) -> Result<Vec<GameRecord>, FetchError> {
        match self.get_team_games(season)? {
            Some(df) => Ok(assemble::games_from_frame(&df)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn player_game_records(
        &self,
        season: Option<&str>,
    ) -> Result<Vec<PlayerGameRecord>, FetchError> {
        match self.get_player_stats(season)? {
            Some(df) => Ok(assemble::players_from_frame(&df)?),
            None => Ok(Vec::new()),
        }
    }

    /// The `n` most recent games of a season.
    pub fn get_recent_games(
        &self,
        season: Option<&str>,
        n: usize,
    ) -> Result<Option<DataFrame>, FetchError> {
        let games = self.team_game_records(season)?;
        if games.is_empty() {
            return Ok(None);
        }
        Ok(Some(assemble::recent_games(&games, n)?))
    }

    /// Per-player season averages, highest scorer first.
    pub fn get_player_averages(&self, season: Option<&str>) -> Result<Option<DataFrame>, FetchError> {
        let games = self.player_game_records(season)?;
        if games.is_empty() {
            return Ok(None);
        }
        Ok(Some(assemble::player_averages(&games)?))
    }

    /// Per-season aggregates over the comparison seasons.
    pub fn get_season_summary(&self) -> Result<Option<DataFrame>, FetchError> {
        let Some(df) = self.get_season_comparison()? else {
            return Ok(None);
        };
        let games = assemble::games_from_frame(&df)?;
        Ok(Some(assemble::season_summary(&games)?))
    }

    /// Rolling averages over a season's games in date order.
    pub fn get_trends(&self, season: Option<&str>) -> Result<Option<DataFrame>, FetchError> {
        let games = self.team_game_records(season)?;
        let rows = assemble::trend_rows(&games, self.config.ml.window);
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(assemble::trend_frame(&rows, self.config.ml.window)?))
    }
}
