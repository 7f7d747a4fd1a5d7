//! Upstream access, table codec, assembly and caching

pub mod assemble;
pub mod cache;
pub mod nba;
pub mod provider;
pub mod rate_limit;
pub mod shared_tier;
pub mod table;

pub use cache::{CacheKey, CacheStatsSnapshot, CacheStore};
pub use nba::{NbaClientOptions, NbaStatsClient};
pub use provider::{DataError, RawRecord, RawTable, StatsProvider};
pub use rate_limit::RateLimiter;
pub use shared_tier::{CacheError, MemoryTier, RedisTier, RedisTierConfig, SharedTier};
pub use table::{ColumnValues, TableColumn, TableSnapshot};
