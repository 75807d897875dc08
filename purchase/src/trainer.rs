// BSD 3-Clause License
//
// Copyright (c) 2025, BlackPortal ○
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this
//    list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice,
//    this list of conditions and the following disclaimer in the documentation
//    and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its
//    contributors may be used to endorse or promote products derived from
//    this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
// AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
// FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
// DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
// CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
// OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use log::{debug, info};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::artifacts::{ArtifactBundle, ColumnOrder};
use crate::classical::{EvaluationReport, ForestParams, RandomForest};
use crate::data::{Column, ColumnData, RawTable};
use crate::encoders::FeatureEncoder;
use crate::errors::{ModelError, TrainingDataError, TrainingError};
use crate::scalers::FeatureScaler;

/// Smallest table the trainer accepts.
pub const MIN_TRAINING_ROWS: usize = 10;

/// Configuration for a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    target_column: String,
    excluded_columns: Vec<String>,
    test_ratio: f64,
    seed: u64,
    forest: ForestParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            target_column: "Purchased".to_string(),
            excluded_columns: vec!["User_ID".to_string()],
            test_ratio: 0.2,
            seed: 42,
            forest: ForestParams::default(),
        }
    }
}

impl TrainerConfig {
    pub fn with_target_column(mut self, column: &str) -> Self {
        self.target_column = column.to_string();
        self
    }

    /// Identifier-like columns that never become features.
    pub fn with_excluded_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.excluded_columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    pub fn with_test_ratio(mut self, ratio: f64) -> Self {
        self.test_ratio = ratio.clamp(0.0, 0.9);
        self
    }

    /// Seed of the train/test shuffle. The forest has its own seed in [`ForestParams`].
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_forest(mut self, forest: ForestParams) -> Self {
        self.forest = forest;
        self
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn excluded_columns(&self) -> &[String] {
        &self.excluded_columns
    }

    pub fn test_ratio(&self) -> f64 {
        self.test_ratio
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn forest(&self) -> &ForestParams {
        &self.forest
    }

    fn is_feature(&self, column: &str) -> bool {
        column != self.target_column && !self.excluded_columns.iter().any(|c| c == column)
    }
}

/// Shuffles `0..n_rows` with a seeded RNG and splits it into
/// `(train, test)` index sets, the test set holding `ceil(n_rows * test_ratio)` rows.
pub fn train_test_split(n_rows: usize, test_ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_size = ((n_rows as f64) * test_ratio).ceil() as usize;
    let train = indices.split_off(test_size.min(n_rows));
    (train, indices)
}

/// Fits a fresh encoder, scaler and forest from a raw table.
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        ModelTrainer { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Trains a bundle and evaluates it on the held-out split.
    ///
    /// Encoder and scaler only see training rows. Held-out rows are encoded
    /// and scaled with the frozen parameters, the same way requests are.
    pub fn train(&self, table: &RawTable) -> Result<(ArtifactBundle, EvaluationReport), TrainingError> {
        let labels = self.labels(table)?;
        let features: Vec<&Column> =
            table.columns().iter().filter(|c| self.config.is_feature(&c.name)).collect();
        if features.is_empty() {
            return Err(TrainingDataError::NoFeatures.into());
        }
        if table.n_rows() < MIN_TRAINING_ROWS {
            return Err(TrainingDataError::InsufficientRows {
                rows: table.n_rows(),
                min: MIN_TRAINING_ROWS,
            }
            .into());
        }

        info!(
            "Training on {} rows with {} features, target '{}'",
            table.n_rows(),
            features.len(),
            self.config.target_column
        );
        let (train_idx, test_idx) =
            train_test_split(table.n_rows(), self.config.test_ratio, self.config.seed);
        debug!("Split data: train_size={}, test_size={}", train_idx.len(), test_idx.len());

        let column_order = ColumnOrder::new(features.iter().map(|c| c.name.as_str()));
        let encoder = fit_encoder(&features, &train_idx);
        let x = encode(&features, &encoder, table.n_rows());

        let x_train = x.select(Axis(0), &train_idx);
        let y_train = labels.select(Axis(0), &train_idx);
        let scaler = FeatureScaler::fit(column_order.names(), &x_train).map_err(ModelError::from)?;
        let x_train = scaler.transform_matrix(column_order.names(), &x_train).map_err(ModelError::from)?;

        let mut model = RandomForest::new().params(self.config.forest.clone()).build();
        model.fit(&x_train, &y_train)?;

        let report = if test_idx.is_empty() {
            EvaluationReport::from_probabilities(&Array1::zeros(0), &Array1::zeros(0), train_idx.len())
        } else {
            let x_test = x.select(Axis(0), &test_idx);
            let x_test =
                scaler.transform_matrix(column_order.names(), &x_test).map_err(ModelError::from)?;
            let y_test = labels.select(Axis(0), &test_idx);
            let probabilities = model.predict_proba(&x_test)?;
            EvaluationReport::from_probabilities(&probabilities, &y_test, train_idx.len())
        };

        let bundle = ArtifactBundle::new(column_order, encoder, scaler, model)?;
        match report.roc_auc {
            Some(auc) => info!(
                "Training run {} finished: accuracy {:.4}, ROC-AUC {:.4}",
                bundle.run_id(),
                report.accuracy,
                auc
            ),
            None => info!(
                "Training run {} finished: accuracy {:.4}, ROC-AUC undefined",
                bundle.run_id(),
                report.accuracy
            ),
        }
        Ok((bundle, report))
    }

    fn labels(&self, table: &RawTable) -> Result<Array1<f64>, TrainingDataError> {
        let target = &self.config.target_column;
        let column =
            table.column(target).ok_or_else(|| TrainingDataError::MissingTarget(target.clone()))?;
        let values = match &column.data {
            ColumnData::Numeric(values) => values,
            ColumnData::Categorical(_) => {
                return Err(TrainingDataError::CategoricalTarget(target.clone()));
            }
        };
        if let Some((row, &value)) =
            values.iter().enumerate().find(|(_, &v)| v != 0.0 && v != 1.0)
        {
            return Err(TrainingDataError::InvalidTarget { row, value });
        }
        Ok(Array1::from_vec(values.clone()))
    }
}

fn fit_encoder(features: &[&Column], train_idx: &[usize]) -> FeatureEncoder {
    let mut encoder = FeatureEncoder::new();
    for column in features {
        if let ColumnData::Categorical(values) = &column.data {
            let codes =
                encoder.fit_column(&column.name, train_idx.iter().map(|&i| values[i].as_str()));
            debug!("Encoded '{}' with {} categories", column.name, codes.len());
        }
    }
    encoder
}

/// Numeric matrix of every row, laid out like `features`. Non-finite numbers
/// become 0 as missing request values do.
fn encode(features: &[&Column], encoder: &FeatureEncoder, n_rows: usize) -> Array2<f64> {
    Array2::from_shape_fn((n_rows, features.len()), |(row, col)| {
        let column = features[col];
        match &column.data {
            ColumnData::Numeric(values) if values[row].is_finite() => values[row],
            ColumnData::Numeric(_) => 0.0,
            ColumnData::Categorical(values) => f64::from(encoder.transform(&column.name, &values[row])),
        }
    })
}
