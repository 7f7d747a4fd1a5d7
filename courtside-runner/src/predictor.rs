//! Next-game points predictor.
//!
//! Features for game `i` are the trailing means (window inclusive of `i`) of
//! points, FG%, 3P%, rebounds and assists; the target is the points scored in
//! game `i + 1`. Rows are split with a seeded shuffle, standardized, and fit
//! with a seeded random forest regressor.
//!
//! A trained model is persisted as JSON, forest included, and carries a
//! BLAKE3 hash of the training set so a retrain on identical data is
//! recognizable.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use courtside_core::config::MlConfig;
use courtside_core::data::assemble::rolling_mean;
use courtside_core::data::DataError;
use courtside_core::domain::GameRecord;
use serde::{Deserialize, Serialize};
use smartcore::api::{Predictor, SupervisedEstimator, Transformer, UnsupervisedEstimator};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::r2;
use smartcore::model_selection::train_test_split;
use smartcore::preprocessing::numerical::{StandardScaler, StandardScalerParameters};
use thiserror::Error;

pub const MODEL_FILE: &str = "next_game_points.json";

/// Stats averaged into the feature vector, in column order.
pub const FEATURE_STATS: [&str; 5] = ["pts", "fg_pct", "fg3_pct", "reb", "ast"];

/// Fewest usable rows a model is trained on.
const MIN_TRAINING_ROWS: usize = 10;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("model not trained: no model at {0}")]
    ModelNotTrained(PathBuf),

    #[error("not enough games: need {needed} usable rows, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("model error: {0}")]
    Model(String),

    #[error("model file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl From<Failed> for PredictError {
    fn from(e: Failed) -> Self {
        PredictError::Model(e.to_string())
    }
}

/// Training rows built from a game log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub features: Vec<[f64; 5]>,
    pub targets: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// BLAKE3 over the canonical JSON form.
    pub fn hash(&self) -> Result<String, PredictError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

fn chronological(games: &[GameRecord]) -> Vec<&GameRecord> {
    let mut ordered: Vec<&GameRecord> = games.iter().collect();
    ordered.sort_by(|a, b| {
        a.game_date
            .cmp(&b.game_date)
            .then_with(|| a.game_id.cmp(&b.game_id))
    });
    ordered
}

/// Rolling feature vector per game, in date order; `None` where the window
/// is incomplete or touches a missing value.
fn rolling_features(ordered: &[&GameRecord], window: usize) -> Vec<Option<[f64; 5]>> {
    let series = |f: fn(&GameRecord) -> Option<f64>| {
        rolling_mean(&ordered.iter().map(|g| f(g)).collect::<Vec<_>>(), window)
    };
    let pts = series(|g| Some(g.points as f64));
    let fg = series(|g| g.field_goal_pct);
    let fg3 = series(|g| g.three_pt_pct);
    let reb = series(|g| Some(g.rebounds as f64));
    let ast = series(|g| Some(g.assists as f64));

    (0..ordered.len())
        .map(|i| Some([pts[i]?, fg[i]?, fg3[i]?, reb[i]?, ast[i]?]))
        .collect()
}

/// Pair each game's rolling features with the following game's points.
pub fn build_dataset(games: &[GameRecord], window: usize) -> Dataset {
    let ordered = chronological(games);
    let features = rolling_features(&ordered, window);
    let mut dataset = Dataset::default();
    for i in 0..ordered.len().saturating_sub(1) {
        if let Some(x) = features[i] {
            dataset.features.push(x);
            dataset.targets.push(ordered[i + 1].points as f64);
        }
    }
    dataset
}

/// Feature column names for a window, e.g. `pts_ma_5`.
pub fn feature_names(window: usize) -> Vec<String> {
    FEATURE_STATS
        .iter()
        .map(|stat| format!("{stat}_ma_{window}"))
        .collect()
}

fn to_matrix(rows: &[[f64; 5]]) -> Result<DenseMatrix<f64>, PredictError> {
    let rows: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vec()).collect();
    Ok(DenseMatrix::from_2d_vec(&rows)?)
}

/// Persisted model.
#[derive(Debug, Serialize, Deserialize)]
pub struct PointsModel {
    pub feature_names: Vec<String>,
    pub window: usize,
    pub n_trees: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub r2_train: f64,
    pub r2_test: f64,
    pub dataset_hash: String,
    pub trained_at: DateTime<Utc>,
    scaler: StandardScaler<f64>,
    forest: Forest,
}

impl PointsModel {
    /// Predicted points for each feature row.
    pub fn predict_rows(&self, rows: &[[f64; 5]]) -> Result<Vec<f64>, PredictError> {
        let x = self.scaler.transform(&to_matrix(rows)?)?;
        Ok(self.forest.predict(&x)?)
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub r2_train: f64,
    pub r2_test: f64,
    pub dataset_hash: String,
    pub model_path: PathBuf,
}

pub struct NextGamePredictor {
    model_path: PathBuf,
    ml: MlConfig,
    model: Option<PointsModel>,
}

impl NextGamePredictor {
    pub fn new(models_dir: &Path, ml: MlConfig) -> Self {
        Self {
            model_path: models_dir.join(MODEL_FILE),
            ml,
            model: None,
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn model(&self) -> Option<&PointsModel> {
        self.model.as_ref()
    }

    /// Load the persisted model, if there is one.
    pub fn load(&mut self) -> Result<&PointsModel, PredictError> {
        if !self.model_path.exists() {
            return Err(PredictError::ModelNotTrained(self.model_path.clone()));
        }
        let content = fs::read_to_string(&self.model_path)?;
        let model: PointsModel = serde_json::from_str(&content)?;
        Ok(&*self.model.insert(model))
    }

    fn forest_parameters(&self) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            n_trees: self.ml.n_trees,
            max_depth: None,
            min_samples_leaf: 1,
            min_samples_split: 2,
            m: None,
            keep_samples: false,
            seed: self.ml.random_state,
        }
    }

    /// Fit on `games`, evaluate on a seeded hold-out split and persist.
    pub fn train(&mut self, games: &[GameRecord]) -> Result<TrainingReport, PredictError> {
        let dataset = build_dataset(games, self.ml.window);
        if dataset.len() < MIN_TRAINING_ROWS {
            return Err(PredictError::InsufficientData {
                needed: MIN_TRAINING_ROWS,
                got: dataset.len(),
            });
        }
        // both sides of the split need at least one row
        let test_size = self.ml.test_size as f32;
        let n_test = (dataset.len() as f32 * test_size) as usize;
        if n_test == 0 || n_test >= dataset.len() {
            return Err(PredictError::InsufficientData {
                needed: (1.0 / test_size).ceil() as usize,
                got: dataset.len(),
            });
        }
        let dataset_hash = dataset.hash()?;

        let x = to_matrix(&dataset.features)?;
        let (x_train, x_test, y_train, y_test) = train_test_split(
            &x,
            &dataset.targets,
            test_size,
            true,
            Some(self.ml.random_state),
        );

        let scaler = StandardScaler::fit(&x_train, StandardScalerParameters::default())?;
        let z_train = scaler.transform(&x_train)?;
        let z_test = scaler.transform(&x_test)?;
        let forest = Forest::fit(&z_train, &y_train, self.forest_parameters())?;

        let r2_train = r2(&y_train, &forest.predict(&z_train)?);
        let r2_test = r2(&y_test, &forest.predict(&z_test)?);

        let model = PointsModel {
            feature_names: feature_names(self.ml.window),
            window: self.ml.window,
            n_trees: self.ml.n_trees,
            train_rows: y_train.len(),
            test_rows: y_test.len(),
            r2_train,
            r2_test,
            dataset_hash: dataset_hash.clone(),
            trained_at: Utc::now(),
            scaler,
            forest,
        };

        self.save(&model)?;
        tracing::info!(
            train_rows = model.train_rows,
            test_rows = model.test_rows,
            r2_test = model.r2_test,
            path = %self.model_path.display(),
            "trained next-game points model"
        );

        let report = TrainingReport {
            train_rows: model.train_rows,
            test_rows: model.test_rows,
            r2_train: model.r2_train,
            r2_test: model.r2_test,
            dataset_hash,
            model_path: self.model_path.clone(),
        };
        self.model = Some(model);
        Ok(report)
    }

    /// Predict points for the game after the most recent one in `games`.
    pub fn predict_next(&self, games: &[GameRecord]) -> Result<f64, PredictError> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| PredictError::ModelNotTrained(self.model_path.clone()))?;
        let ordered = chronological(games);
        let features = rolling_features(&ordered, model.window);
        let latest = features
            .last()
            .copied()
            .flatten()
            .ok_or(PredictError::InsufficientData {
                needed: model.window,
                got: ordered.len(),
            })?;
        model
            .predict_rows(&[latest])?
            .first()
            .copied()
            .ok_or_else(|| PredictError::Model("forest returned no prediction".into()))
    }

    /// Write atomically: temp file, then rename into place.
    fn save(&self, model: &PointsModel) -> Result<(), PredictError> {
        if let Some(dir) = self.model_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.model_path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(model)?)?;
        fs::rename(&tmp, &self.model_path)?;
        Ok(())
    }
}
