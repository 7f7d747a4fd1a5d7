//! Two-tier table cache.
//!
//! Layout:
//! - fast tier: per-process map of key → (`DataFrame`, expiry instant)
//! - shared tier: optional [`SharedTier`] backend (Redis in production) holding
//!   a plain JSON column map per key, `{"PTS": [110, 98], ...}`, with the
//!   backend's own expiry in whole seconds
//!
//! Reads check the fast tier, then the shared tier; a shared-tier hit refills
//! the fast tier for `min(remaining, fast_tier_cap)`. Column dtypes are
//! inferred on the way back in; [`CacheStore::get_conformed`] takes a step
//! that restores the caller's schema. Shared-tier failures never reach
//! the caller: reads degrade to a miss and writes are dropped, both with a
//! warning.
//!
//! Hit/miss/api-call counters are process-wide and only reset by [`CacheStore::clear`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::Serialize;
use serde_json::Value;

use super::provider::DataError;
use super::shared_tier::{expiry_after, CacheError, RedisTier, RedisTierConfig, SharedTier};
use super::table::TableSnapshot;
use crate::config::CacheConfig;

/// Default upper bound on how long a shared-tier hit lives in the fast tier.
pub const DEFAULT_FAST_TIER_CAP: Duration = Duration::from_secs(300);

/// Deterministic cache key: `"{operation}:{arg1}:{arg2}..."`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(operation: &str, args: &[&str]) -> Self {
        let mut key = operation.to_string();
        for arg in args {
            key.push(':');
            key.push_str(arg);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Operation name (the segment before the first `:`).
    pub fn operation(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Point-in-time view of the cache counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub api_calls: u64,
    /// Hit rate as a percentage with two decimals, e.g. `"66.67%"`.
    pub hit_rate: String,
    pub fast_tier_entries: usize,
    pub shared_tier: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CacheStatsSnapshot {
    /// `hits / (hits + misses)`, or 0 when nothing has been looked up.
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

struct FastEntry {
    frame: DataFrame,
    expires_at: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Whole seconds for the backend TTL, rounded up, at least 1.
fn backend_ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0))
        .max(1)
}

/// The two-tier cache store.
pub struct CacheStore {
    fast: Mutex<HashMap<String, FastEntry>>,
    shared: Option<Arc<dyn SharedTier>>,
    fast_tier_cap: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    api_calls: AtomicU64,
}

impl CacheStore {
    pub fn new(shared: Option<Arc<dyn SharedTier>>, fast_tier_cap: Duration) -> Self {
        Self {
            fast: Mutex::new(HashMap::new()),
            shared,
            fast_tier_cap,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            api_calls: AtomicU64::new(0),
        }
    }

    /// Fast tier only.
    pub fn in_process() -> Self {
        Self::new(None, DEFAULT_FAST_TIER_CAP)
    }

    pub fn with_shared(shared: Arc<dyn SharedTier>) -> Self {
        Self::new(Some(shared), DEFAULT_FAST_TIER_CAP)
    }

    pub fn with_fast_tier_cap(mut self, cap: Duration) -> Self {
        self.fast_tier_cap = cap;
        self
    }

    /// Build from configuration. A Redis URL that does not parse leaves the
    /// store running on the fast tier alone.
    pub fn from_config(config: &CacheConfig) -> Self {
        let cap = Duration::from_secs(config.fast_tier_cap_secs);
        if !config.enabled_shared {
            return Self::new(None, cap);
        }
        let url = config.resolved_redis_url();
        let tier_config = RedisTierConfig {
            url: url.clone(),
            ..RedisTierConfig::default()
        };
        match RedisTier::new(tier_config) {
            Ok(tier) => {
                tracing::info!(%url, "shared cache tier: redis");
                Self::new(Some(Arc::new(tier)), cap)
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "shared cache tier disabled");
                Self::new(None, cap)
            }
        }
    }

    pub fn fast_tier_cap(&self) -> Duration {
        self.fast_tier_cap
    }

    pub fn shared_tier(&self) -> Option<&Arc<dyn SharedTier>> {
        self.shared.as_ref()
    }

    /// Look up a key. Counts exactly one hit or one miss.
    pub fn get(&self, key: &str) -> Option<DataFrame> {
        self.get_conformed(key, Ok)
    }

    /// Like [`get`](Self::get), but a table read back from the shared tier is
    /// passed through `conform` before it is returned or refilled into the
    /// fast tier. A table that fails to conform is a miss.
    pub fn get_conformed<F>(&self, key: &str, conform: F) -> Option<DataFrame>
    where
        F: FnOnce(DataFrame) -> Result<DataFrame, DataError>,
    {
        let now = Instant::now();
        {
            let mut fast = lock(&self.fast);
            match fast.get(key) {
                Some(entry) if entry.expires_at > now => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key, tier = "fast", "cache hit");
                    return Some(entry.frame.clone());
                }
                Some(_) => {
                    fast.remove(key);
                }
                None => {}
            }
        }

        if let Some(shared) = &self.shared {
            match self.read_shared(shared.as_ref(), key, conform) {
                Ok(Some((frame, remaining))) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key, tier = shared.name(), "cache hit");
                    self.put_fast(key, frame.clone(), remaining.min(self.fast_tier_cap));
                    return Some(frame);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(key, tier = shared.name(), error = %e, "shared cache read failed");
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key, "cache miss");
        None
    }

    /// Store a table for `ttl`. Last writer wins. A zero `ttl` removes the
    /// shared copy rather than writing one.
    pub fn set(&self, key: &str, frame: &DataFrame, ttl: Duration) {
        self.put_fast(key, frame.clone(), ttl);
        if let Some(shared) = &self.shared {
            if let Err(e) = Self::write_shared(shared.as_ref(), key, frame, ttl) {
                tracing::warn!(key, tier = shared.name(), error = %e, "shared cache write failed");
            }
        }
    }

    /// Remove a key from both tiers. Idempotent.
    pub fn delete(&self, key: &str) {
        lock(&self.fast).remove(key);
        if let Some(shared) = &self.shared {
            if let Err(e) = shared.del(key) {
                tracing::warn!(key, tier = shared.name(), error = %e, "shared cache delete failed");
            }
        }
    }

    /// Flush both tiers and zero the counters.
    pub fn clear(&self) {
        lock(&self.fast).clear();
        if let Some(shared) = &self.shared {
            if let Err(e) = shared.flush_all() {
                tracing::warn!(tier = shared.name(), error = %e, "shared cache flush failed");
            }
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.api_calls.store(0, Ordering::Relaxed);
        tracing::info!("cache cleared");
    }

    pub fn track_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> CacheStatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let now = Instant::now();
        let fast_tier_entries = lock(&self.fast)
            .values()
            .filter(|e| e.expires_at > now)
            .count();
        CacheStatsSnapshot {
            hits,
            misses,
            api_calls: self.api_calls.load(Ordering::Relaxed),
            hit_rate: format!("{:.2}%", hit_rate(hits, misses) * 100.0),
            fast_tier_entries,
            shared_tier: self.shared.as_ref().map(|s| s.name().to_string()),
            timestamp: Utc::now(),
        }
    }

    fn put_fast(&self, key: &str, frame: DataFrame, ttl: Duration) {
        let entry = FastEntry {
            frame,
            expires_at: expiry_after(Instant::now(), ttl),
        };
        lock(&self.fast).insert(key.to_string(), entry);
    }

    /// Decode a shared-tier value into a frame plus its remaining lifetime.
    /// A key with no readable expiry is treated as expiring at the cap.
    fn read_shared<F>(
        &self,
        shared: &dyn SharedTier,
        key: &str,
        conform: F,
    ) -> Result<Option<(DataFrame, Duration)>, CacheError>
    where
        F: FnOnce(DataFrame) -> Result<DataFrame, DataError>,
    {
        let Some(raw) = shared.get(key)? else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&raw)?;
        let frame = TableSnapshot::from_plain_columns(&value)
            .and_then(|snapshot| snapshot.to_frame())
            .and_then(conform)
            .map_err(|e| CacheError::Codec(e.to_string()))?;

        let remaining = match shared.ttl(key) {
            Ok(Some(remaining)) => remaining,
            Ok(None) => self.fast_tier_cap,
            Err(e) => {
                tracing::warn!(key, tier = shared.name(), error = %e, "shared cache ttl lookup failed");
                self.fast_tier_cap
            }
        };
        Ok(Some((frame, remaining)))
    }

    fn write_shared(
        shared: &dyn SharedTier,
        key: &str,
        frame: &DataFrame,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return shared.del(key);
        }
        let plain = TableSnapshot::from_frame(frame)
            .map_err(|e| CacheError::Codec(e.to_string()))?
            .to_plain_columns();
        let json = serde_json::to_string(&plain)?;
        shared.set_ex(key, &json, backend_ttl_secs(ttl))
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::in_process()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::shared_tier::MemoryTier;
    use polars::prelude::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![Column::new("PTS".into(), vec![110i32, 98])]).unwrap()
    }

    #[test]
    fn key_joins_operation_and_args() {
        let key = CacheKey::new("team_games", &["1610612761", "2024-25"]);
        assert_eq!(key.as_str(), "team_games:1610612761:2024-25");
        assert_eq!(key.operation(), "team_games");
        assert_eq!(CacheKey::new("live_game", &[]).to_string(), "live_game");
    }

    #[test]
    fn identical_queries_share_a_key() {
        let a = CacheKey::new("player_games", &["123", "2024-25"]);
        let b = CacheKey::new("player_games", &["123", "2024-25"]);
        assert_eq!(a, b);
        assert_ne!(a, CacheKey::new("player_games", &["123", "2023-24"]));
    }

    #[test]
    fn empty_stats_report_zero_rate() {
        let stats = CacheStore::in_process().get_stats();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.hit_rate, "0.00%");
        assert_eq!(stats.shared_tier, None);
    }

    #[test]
    fn hit_rate_formats_two_decimals() {
        let store = CacheStore::in_process();
        store.set("k", &frame(), Duration::from_secs(60));
        store.get("k");
        store.get("k");
        store.get("missing");
        let stats = store.get_stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));
        assert_eq!(stats.hit_rate, "66.67%");
    }

    #[test]
    fn backend_ttl_rounds_up() {
        assert_eq!(backend_ttl_secs(Duration::ZERO), 1);
        assert_eq!(backend_ttl_secs(Duration::from_millis(1500)), 2);
        assert_eq!(backend_ttl_secs(Duration::from_secs(3600)), 3600);
        assert_eq!(backend_ttl_secs(Duration::MAX), u64::MAX);
    }

    #[test]
    fn shared_value_is_a_plain_column_map() {
        let tier = Arc::new(MemoryTier::new());
        let store = CacheStore::with_shared(tier.clone());
        store.set("team_games:2024-25", &frame(), Duration::from_secs(60));

        let raw = tier.get("team_games:2024-25").unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({"PTS": [110, 98]}));
        assert!(tier.ttl("team_games:2024-25").unwrap().unwrap() <= Duration::from_secs(60));
    }

    #[test]
    fn zero_ttl_drops_the_shared_copy() {
        let tier = Arc::new(MemoryTier::new());
        let store = CacheStore::with_shared(tier.clone());
        store.set("k", &frame(), Duration::from_secs(60));
        store.set("k", &frame(), Duration::ZERO);
        assert!(tier.is_empty());
        assert!(store.get("k").is_none());
    }

    #[test]
    fn shared_hit_is_conformed_before_refill() {
        let tier = Arc::new(MemoryTier::new());
        CacheStore::with_shared(tier.clone()).set("k", &frame(), Duration::from_secs(60));

        let reader = CacheStore::with_shared(tier.clone());
        let to_i32 = |df: DataFrame| -> Result<DataFrame, DataError> {
            Ok(DataFrame::new(vec![df.column("PTS")?.cast(&DataType::Int32)?])?)
        };
        let got = reader.get_conformed("k", to_i32).unwrap();
        assert!(got.equals_missing(&frame()));

        // the refilled fast-tier copy is the conformed one
        tier.flush_all().unwrap();
        let again = reader.get("k").unwrap();
        assert_eq!(again.column("PTS").unwrap().dtype(), &DataType::Int32);
    }

    #[test]
    fn failed_conform_is_a_miss() {
        let tier = Arc::new(MemoryTier::new());
        CacheStore::with_shared(tier.clone()).set("k", &frame(), Duration::from_secs(60));

        let reader = CacheStore::with_shared(tier);
        let got = reader.get_conformed("k", |_| Err(DataError::Table("wrong shape".into())));
        assert!(got.is_none());
        assert_eq!(reader.get_stats().misses, 1);
    }

    #[test]
    fn unbounded_ttl_does_not_overflow() {
        let store = CacheStore::with_shared(Arc::new(MemoryTier::new()));
        store.set("k", &frame(), Duration::MAX);
        assert!(store.get("k").is_some());
        assert_eq!(store.get_stats().fast_tier_entries, 1);
    }

    #[test]
    fn undecodable_shared_value_is_a_miss() {
        let tier = Arc::new(MemoryTier::new());
        tier.set_ex("k", "{not json", 60).unwrap();
        let store = CacheStore::with_shared(tier);
        assert!(store.get("k").is_none());
    }
}
