//! Memoize-with-TTL wrapper around upstream fetches.
//!
//! A [`Memoized`] binds a cache store, an operation name and a TTL. Calling
//! [`Memoized::get_or_fetch`] with the operation's arguments returns the cached
//! table when one is live, otherwise runs the fetch closure and stores what it
//! returns. Errors, `None` and empty tables are never cached.
//!
//! Composite operations (player stats, season comparison) are built from
//! other memoized fetches. Their misses are not api calls; the inner fetches
//! count their own.

use std::time::{Duration, Instant};

use courtside_core::config::TtlConfig;
use courtside_core::data::assemble;
use courtside_core::data::{CacheKey, CacheStore, DataError};
use polars::prelude::DataFrame;

/// Restores a table's schema after it was read back from the shared tier.
pub type Conform = fn(DataFrame) -> Result<DataFrame, DataError>;

/// Cached query kinds and their key prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LiveGame,
    TeamGames,
    Roster,
    PlayerGames,
    PlayerStats,
    SeasonComparison,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::LiveGame => "live_game",
            Operation::TeamGames => "team_games",
            Operation::Roster => "roster",
            Operation::PlayerGames => "player_games",
            Operation::PlayerStats => "player_stats",
            Operation::SeasonComparison => "season_comparison",
        }
    }

    pub fn ttl(self, ttl: &TtlConfig) -> Duration {
        let secs = match self {
            Operation::LiveGame => ttl.live_secs,
            Operation::TeamGames => ttl.team_games_secs,
            Operation::Roster => ttl.roster_secs,
            Operation::PlayerGames => ttl.player_games_secs,
            Operation::PlayerStats => ttl.player_stats_secs,
            Operation::SeasonComparison => ttl.season_comparison_secs,
        };
        Duration::from_secs(secs)
    }

    /// Whether a miss goes straight to the upstream API.
    pub fn calls_upstream(self) -> bool {
        !matches!(self, Operation::PlayerStats | Operation::SeasonComparison)
    }

    pub fn conform(self) -> Conform {
        match self {
            Operation::LiveGame => assemble::conform_live,
            Operation::TeamGames | Operation::SeasonComparison => assemble::conform_games,
            Operation::Roster => assemble::conform_roster,
            Operation::PlayerGames | Operation::PlayerStats => assemble::conform_players,
        }
    }
}

/// A cached view of one upstream operation.
pub struct Memoized<'a> {
    store: &'a CacheStore,
    operation: &'static str,
    ttl: Duration,
    counts_api_calls: bool,
    conform: Option<Conform>,
}

impl<'a> Memoized<'a> {
    pub fn new(store: &'a CacheStore, operation: &'static str, ttl: Duration) -> Self {
        Self {
            store,
            operation,
            ttl,
            counts_api_calls: true,
            conform: None,
        }
    }

    pub fn for_operation(store: &'a CacheStore, operation: Operation, ttl: &TtlConfig) -> Self {
        let memo = Self::new(store, operation.name(), operation.ttl(ttl))
            .with_conform(operation.conform());
        if operation.calls_upstream() {
            memo
        } else {
            memo.composite()
        }
    }

    /// Misses are not counted as api calls.
    pub fn composite(mut self) -> Self {
        self.counts_api_calls = false;
        self
    }

    pub fn with_conform(mut self, conform: Conform) -> Self {
        self.conform = Some(conform);
        self
    }

    pub fn key(&self, args: &[&str]) -> CacheKey {
        CacheKey::new(self.operation, args)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached table for `args`, or the result of `fetch`.
    ///
    /// On a miss the store's api-call counter is bumped once before `fetch`
    /// runs, whether or not the fetch succeeds. Composite memos skip that.
    pub fn get_or_fetch<F>(&self, args: &[&str], fetch: F) -> Result<Option<DataFrame>, DataError>
    where
        F: FnOnce() -> Result<Option<DataFrame>, DataError>,
    {
        let key = self.key(args);
        let hit = match self.conform {
            Some(conform) => self.store.get_conformed(key.as_str(), conform),
            None => self.store.get(key.as_str()),
        };
        if let Some(hit) = hit {
            return Ok(Some(hit));
        }

        if self.counts_api_calls {
            self.store.track_api_call();
        }
        let start = Instant::now();
        let result = fetch();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(Some(df)) if df.height() > 0 => {
                tracing::debug!(key = %key, rows = df.height(), elapsed_ms, "fetched");
                self.store.set(key.as_str(), df, self.ttl);
            }
            Ok(_) => {
                tracing::debug!(key = %key, elapsed_ms, "fetched no rows, not caching");
            }
            Err(e) => {
                tracing::debug!(key = %key, elapsed_ms, error = %e, "fetch failed");
            }
        }
        result
    }
}
