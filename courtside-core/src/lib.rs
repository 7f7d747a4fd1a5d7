//! Courtside Core: domain types, upstream stats client, table codec, cache store.
//!
//! This crate holds everything below the fetch orchestrator:
//! - Domain records (team games, player games, roster, live snapshot, seasons)
//! - The `StatsProvider` trait and its `stats.nba.com` implementation
//! - Fixed-delay rate limiter
//! - Dataset assembly (raw rows → typed records → polars tables)
//! - Two-tier cache store (in-process fast tier + shared Redis tier)
//! - Application configuration

pub mod config;
pub mod data;
pub mod domain;

pub use config::{AppConfig, ConfigError};
