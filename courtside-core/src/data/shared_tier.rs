//! Shared cache tier: a key/value backend visible to every dashboard process.
//!
//! The cache store talks to it through [`SharedTier`] and never lets one of
//! its errors escape: a failed read is a miss, a failed write is dropped.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use redis::Commands;
use thiserror::Error;

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache codec error: {0}")]
    Codec(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Codec(e.to_string())
    }
}

/// Minimal string key/value backend with per-key expiry.
pub trait SharedTier: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, expiring after `ttl_secs` (at least 1).
    fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// Remaining lifetime of `key`. `None` if the key is missing or has no
    /// expiry.
    fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    fn del(&self, key: &str) -> Result<(), CacheError>;

    /// Drop every key in the backend.
    fn flush_all(&self) -> Result<(), CacheError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Expiries past what `Instant` can represent are clamped to this horizon.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// `now + ttl`, clamped instead of overflowing.
pub(crate) fn expiry_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

// ── Redis ───────────────────────────────────────────────────────────

/// Redis connection settings.
#[derive(Debug, Clone)]
pub struct RedisTierConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
}

impl Default for RedisTierConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            connect_timeout: Duration::from_secs(2),
            io_timeout: Duration::from_secs(2),
        }
    }
}

/// Redis-backed shared tier.
///
/// The connection is opened on first use and dropped after any command
/// error, so a Redis restart costs one failed lookup rather than a broken
/// store.
pub struct RedisTier {
    client: redis::Client,
    config: RedisTierConfig,
    conn: Mutex<Option<redis::Connection>>,
}

impl RedisTier {
    /// Parse the URL. Does not connect.
    pub fn new(config: RedisTierConfig) -> Result<Self, CacheError> {
        let client = redis::Client::open(config.url.as_str())?;
        Ok(Self {
            client,
            config,
            conn: Mutex::new(None),
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn connect(&self) -> Result<redis::Connection, CacheError> {
        let conn = self
            .client
            .get_connection_with_timeout(self.config.connect_timeout)?;
        conn.set_read_timeout(Some(self.config.io_timeout))?;
        conn.set_write_timeout(Some(self.config.io_timeout))?;
        tracing::debug!(url = %self.config.url, "connected to redis");
        Ok(conn)
    }

    /// Run one command on the shared connection, reconnecting if needed.
    fn with_conn<T>(
        &self,
        op: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    ) -> Result<T, CacheError> {
        let mut guard = lock(&self.conn);
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(CacheError::Backend("redis connection unavailable".into()));
        };
        match op(conn) {
            Ok(v) => Ok(v),
            Err(e) => {
                *guard = None;
                Err(e.into())
            }
        }
    }
}

impl SharedTier for RedisTier {
    fn name(&self) -> &str {
        "redis"
    }

    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.with_conn(|conn| conn.get::<_, Option<String>>(key))
    }

    fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        self.with_conn(|conn| conn.set_ex::<_, _, ()>(key, value, ttl_secs.max(1)))
    }

    fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        // -2: no such key, -1: no expiry
        let secs: i64 = self.with_conn(|conn| redis::cmd("TTL").arg(key).query(conn))?;
        Ok(u64::try_from(secs).ok().map(Duration::from_secs))
    }

    fn del(&self, key: &str) -> Result<(), CacheError> {
        self.with_conn(|conn| conn.del::<_, ()>(key))
    }

    fn flush_all(&self) -> Result<(), CacheError> {
        self.with_conn(|conn| redis::cmd("FLUSHALL").query::<()>(conn))
    }
}

// ── In-memory ───────────────────────────────────────────────────────

/// In-process stand-in for Redis. Honors expiry on read.
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (unexpired) key count.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        lock(&self.entries)
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SharedTier for MemoryTier {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = lock(&self.entries);
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let expires_at = expiry_after(Instant::now(), Duration::from_secs(ttl_secs.max(1)));
        lock(&self.entries).insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let now = Instant::now();
        Ok(lock(&self.entries)
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(_, expires_at)| *expires_at - now))
    }

    fn del(&self, key: &str) -> Result<(), CacheError> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn flush_all(&self) -> Result<(), CacheError> {
        lock(&self.entries).clear();
        Ok(())
    }
}
