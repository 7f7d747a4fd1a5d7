//! Application configuration.
//!
//! Loaded once at startup from a TOML file; every field has a default so an
//! empty or missing file yields a working configuration. `REDIS_URL` in the
//! environment overrides `cache.redis_url`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::data::nba::{DEFAULT_LIVE_URL, DEFAULT_STATS_URL};
use crate::data::shared_tier::DEFAULT_REDIS_URL;
use crate::domain::Season;

/// Upper bound on `api.retry_attempts`.
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub dashboard: DashboardConfig,
    pub fanout: FanoutConfig,
    pub ml: MlConfig,
    pub paths: PathsConfig,
}

/// Upstream stats service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub stats_url: String,
    pub live_url: String,
    /// Sleep before every upstream call, in seconds.
    pub delay_secs: f64,
    pub team_id: String,
    pub timeout_secs: u64,
    /// Extra attempts after a failed call, at most [`MAX_RETRY_ATTEMPTS`].
    pub retry_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            stats_url: DEFAULT_STATS_URL.to_string(),
            live_url: DEFAULT_LIVE_URL.to_string(),
            delay_secs: 1.5,
            team_id: "1610612761".to_string(),
            timeout_secs: 30,
            retry_attempts: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub enabled_shared: bool,
    pub fast_tier_cap_secs: u64,
    pub ttl: TtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            enabled_shared: true,
            fast_tier_cap_secs: 300,
            ttl: TtlConfig::default(),
        }
    }
}

impl CacheConfig {
    /// `REDIS_URL` if set, else the configured URL, else the local default.
    pub fn resolved_redis_url(&self) -> String {
        std::env::var("REDIS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.redis_url.clone())
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string())
    }
}

/// Freshness bound per operation kind, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub live_secs: u64,
    pub team_games_secs: u64,
    pub roster_secs: u64,
    pub player_games_secs: u64,
    pub player_stats_secs: u64,
    pub season_comparison_secs: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            live_secs: 60,
            team_games_secs: 3600,
            roster_secs: 3600,
            player_games_secs: 3600,
            player_stats_secs: 3600,
            season_comparison_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub refresh_rate_secs: u64,
    pub default_season: String,
    /// Seasons compared side by side. Empty means the default season and the
    /// one before it.
    pub comparison_seasons: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_rate_secs: 30,
            default_season: "2023-24".to_string(),
            comparison_seasons: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanoutConfig {
    pub season_workers: usize,
    pub player_workers: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            season_workers: 2,
            player_workers: 3,
        }
    }
}

/// Next-game points model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlConfig {
    pub window: usize,
    pub test_size: f64,
    pub random_state: u64,
    /// Trees in the random forest.
    pub n_trees: usize,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            window: 5,
            test_size: 0.2,
            random_state: 42,
            n_trees: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub models: PathBuf,
    pub data: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            models: PathBuf::from("models"),
            data: PathBuf::from("data"),
        }
    }
}

impl AppConfig {
    /// Read and validate `path`; a missing file yields validated defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::from_file(path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api.delay_secs.is_finite() || self.api.delay_secs < 0.0 {
            return Err(invalid("api.delay_secs", "must be a non-negative number"));
        }
        if self.api.team_id.trim().is_empty() {
            return Err(invalid("api.team_id", "must not be empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs", "must be positive"));
        }
        if self.api.retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(invalid(
                "api.retry_attempts",
                format!("must be at most {MAX_RETRY_ATTEMPTS}"),
            ));
        }
        self.dashboard
            .default_season
            .parse::<Season>()
            .map_err(|e| invalid("dashboard.default_season", e.to_string()))?;
        for season in &self.dashboard.comparison_seasons {
            season
                .parse::<Season>()
                .map_err(|e| invalid("dashboard.comparison_seasons", e.to_string()))?;
        }
        if self.fanout.season_workers == 0 {
            return Err(invalid("fanout.season_workers", "must be at least 1"));
        }
        if self.fanout.player_workers == 0 {
            return Err(invalid("fanout.player_workers", "must be at least 1"));
        }
        if self.ml.window == 0 {
            return Err(invalid("ml.window", "must be at least 1"));
        }
        if !(self.ml.test_size > 0.0 && self.ml.test_size < 1.0) {
            return Err(invalid("ml.test_size", "must be between 0 and 1"));
        }
        if self.ml.n_trees == 0 {
            return Err(invalid("ml.n_trees", "must be at least 1"));
        }
        Ok(())
    }

    /// Value at a dotted path such as `"api.delay_secs"`.
    pub fn lookup(&self, path: &str) -> Option<toml::Value> {
        let mut value = toml::Value::try_from(self).ok()?;
        for part in path.split('.') {
            value = value.get(part)?.clone();
        }
        Some(value)
    }

    pub fn default_season(&self) -> Result<Season, ConfigError> {
        self.dashboard
            .default_season
            .parse()
            .map_err(|e: crate::domain::SeasonError| {
                invalid("dashboard.default_season", e.to_string())
            })
    }

    /// Seasons for the comparison view, most recent first.
    pub fn comparison_seasons(&self) -> Result<Vec<Season>, ConfigError> {
        let mut seasons = if self.dashboard.comparison_seasons.is_empty() {
            let current = self.default_season()?;
            vec![current, current.previous()]
        } else {
            self.dashboard
                .comparison_seasons
                .iter()
                .map(|s| {
                    s.parse()
                        .map_err(|e: crate::domain::SeasonError| {
                            invalid("dashboard.comparison_seasons", e.to_string())
                        })
                })
                .collect::<Result<Vec<Season>, _>>()?
        };
        seasons.sort_by(|a, b| b.cmp(a));
        seasons.dedup();
        Ok(seasons)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_secs_f64(self.api.delay_secs.max(0.0))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn refresh_rate(&self) -> Duration {
        Duration::from_secs(self.dashboard.refresh_rate_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.api.delay_secs, 1.5);
        assert_eq!(config.api.team_id, "1610612761");
        assert_eq!(config.cache.ttl.live_secs, 60);
        assert_eq!(config.cache.ttl.team_games_secs, 3600);
        assert_eq!(config.fanout.season_workers, 2);
        assert_eq!(config.fanout.player_workers, 3);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [api]
            delay_secs = 0.5

            [cache.ttl]
            live_secs = 15
            "#,
        )
        .unwrap();
        assert_eq!(config.api.delay_secs, 0.5);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.cache.ttl.live_secs, 15);
        assert_eq!(config.cache.ttl.roster_secs, 3600);
    }

    #[test]
    fn rejects_negative_delay() {
        let err = AppConfig::from_toml("[api]\ndelay_secs = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "api.delay_secs"));
    }

    #[test]
    fn rejects_bad_season_and_test_size() {
        assert!(AppConfig::from_toml("[dashboard]\ndefault_season = \"2024\"").is_err());
        assert!(AppConfig::from_toml("[ml]\ntest_size = 1.0").is_err());
        assert!(AppConfig::from_toml("[fanout]\nplayer_workers = 0").is_err());
        assert!(AppConfig::from_toml("[ml]\nn_trees = 0").is_err());
    }

    #[test]
    fn bounds_retry_attempts() {
        assert!(AppConfig::from_toml("[api]\nretry_attempts = 3").is_ok());
        let err = AppConfig::from_toml("[api]\nretry_attempts = 40").unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref field, .. } if field == "api.retry_attempts")
        );
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            AppConfig::from_toml("[api"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn dotted_lookup() {
        let config = AppConfig::default();
        assert_eq!(
            config.lookup("api.delay_secs").and_then(|v| v.as_float()),
            Some(1.5)
        );
        assert_eq!(
            config.lookup("cache.ttl.live_secs").and_then(|v| v.as_integer()),
            Some(60)
        );
        assert!(config.lookup("api.nope").is_none());
    }

    #[test]
    fn comparison_defaults_to_current_and_previous() {
        let config = AppConfig::default();
        let seasons: Vec<String> = config
            .comparison_seasons()
            .unwrap()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(seasons, ["2023-24", "2022-23"]);
    }

    #[test]
    fn explicit_comparison_seasons_sorted_recent_first() {
        let config = AppConfig::from_toml(
            "[dashboard]\ncomparison_seasons = [\"2022-23\", \"2024-25\", \"2023-24\"]",
        )
        .unwrap();
        let seasons: Vec<String> = config
            .comparison_seasons()
            .unwrap()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(seasons, ["2024-25", "2023-24", "2022-23"]);
    }

    #[test]
    fn toml_roundtrip() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(AppConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/courtside.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
