//! Integration tests for the next-game points predictor.

mod common;

use std::sync::Arc;

use common::{manager, FakeProvider};
use courtside_core::config::MlConfig;
use courtside_runner::{NextGamePredictor, PredictError};

#[test]
fn untrained_model_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut predictor = NextGamePredictor::new(dir.path(), MlConfig::default());
    assert!(matches!(
        predictor.load(),
        Err(PredictError::ModelNotTrained(_))
    ));
    assert!(matches!(
        predictor.predict_next(&[]),
        Err(PredictError::ModelNotTrained(_))
    ));
}

#[test]
fn too_few_games_is_insufficient_data() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(Arc::new(FakeProvider::new(8)));
    let games = mgr.team_game_records(None).unwrap();

    let mut predictor = NextGamePredictor::new(dir.path(), MlConfig::default());
    let err = predictor.train(&games).unwrap_err();
    assert!(matches!(err, PredictError::InsufficientData { got: 3, .. }));
}

#[test]
fn train_persist_reload_predict() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(Arc::new(FakeProvider::new(40)));
    let games = mgr.team_game_records(None).unwrap();
    assert_eq!(games.len(), 40);

    let mut predictor = NextGamePredictor::new(dir.path(), MlConfig::default());
    let report = predictor.train(&games).unwrap();

    // 40 games, window 5 → 35 usable rows; 20% held out
    assert_eq!(report.train_rows + report.test_rows, 35);
    assert_eq!(report.test_rows, 7);
    assert!(report.model_path.exists());
    assert_eq!(report.dataset_hash.len(), 64);
    assert!(report.r2_train.is_finite());

    let trained = predictor.predict_next(&games).unwrap();

    let mut reloaded = NextGamePredictor::new(dir.path(), MlConfig::default());
    reloaded.load().unwrap();
    let again = reloaded.predict_next(&games).unwrap();
    assert!((trained - again).abs() < 1e-9);
    assert!(trained.is_finite());
    assert!((60.0..160.0).contains(&trained));
}

#[test]
fn retraining_same_data_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(Arc::new(FakeProvider::new(30)));
    let games = mgr.team_game_records(None).unwrap();

    let mut predictor = NextGamePredictor::new(dir.path(), MlConfig::default());
    let first = predictor.train(&games).unwrap();
    let second = predictor.train(&games).unwrap();

    assert_eq!(first.dataset_hash, second.dataset_hash);
    assert_eq!(first.r2_test, second.r2_test);
}
