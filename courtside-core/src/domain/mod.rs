//! Domain types for the stats dashboard

pub mod game;
pub mod season;

pub use game::{GameRecord, LiveGameSnapshot, PlayerGameRecord, RosterEntry};
pub use season::{Season, SeasonError};

/// Upstream team identifier (e.g. `1610612761`).
pub type TeamId = String;
