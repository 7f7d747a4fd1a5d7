//! Courtside Runner: fetch orchestration, consumer queries, predictor, export.
//!
//! This crate builds on `courtside-core` to provide:
//! - Memoize-with-TTL wrapper over upstream fetches
//! - Per-request bounded fan-out with explicit failure dropping
//! - `TeamDataManager`, the query surface consumed by the CLI
//! - Next-game points predictor (random forest over rolling averages)
//! - CSV/JSON export of any returned table

pub mod export;
pub mod fanout;
pub mod manager;
pub mod memoize;
pub mod predictor;

pub use export::{export_frame_csv, export_frame_json, save_frame_csv};
pub use fanout::{fan_out, merge_successes, SliceOutcome};
pub use manager::{FetchError, TeamDataManager};
pub use memoize::{Memoized, Operation};
pub use predictor::{NextGamePredictor, PointsModel, PredictError, TrainingReport};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn manager_is_send_sync() {
        assert_send::<TeamDataManager>();
        assert_sync::<TeamDataManager>();
    }

    #[test]
    fn slice_outcome_is_send() {
        assert_send::<SliceOutcome>();
    }

    #[test]
    fn predictor_types_are_send_sync() {
        assert_send::<PointsModel>();
        assert_sync::<PointsModel>();
        assert_send::<NextGamePredictor>();
        assert_sync::<NextGamePredictor>();
    }

    #[test]
    fn error_types_are_send_sync() {
        assert_send::<FetchError>();
        assert_sync::<FetchError>();
        assert_send::<PredictError>();
        assert_sync::<PredictError>();
    }
}
