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

//! Smartphone purchase prediction.
//!
//! Raw feature rows go through a frozen encoder and scaler and are scored by a
//! seeded random forest. The model and its feature pipeline travel together as
//! an [`ArtifactBundle`], persisted atomically by an [`ArtifactStore`] and
//! served through the [`PredictionService`].

pub mod artifacts;
pub mod classical;
pub mod data;
pub mod encoders;
pub mod errors;
pub mod scalers;
pub mod service;
pub mod summary;
pub mod trainer;

#[cfg(test)]
pub(crate) mod testing;

pub use artifacts::{ArtifactBundle, ArtifactStore, ColumnOrder, DirectoryStore};
pub use classical::{EvaluationReport, RandomForest};
pub use data::{CsvTableSource, RawRow, RawTable, Scalar, TableSource};
pub use encoders::{FeatureEncoder, FALLBACK_CODE};
pub use errors::{ArtifactCorruptError, ServiceError, TrainingDataError};
pub use scalers::FeatureScaler;
pub use service::{
    align, rank_importances, AlignedRow, DriftStats, FeatureImportance, PredictionResult,
    PredictionService, ServiceConfig,
};
pub use summary::{DataSummary, FeatureSummary};
pub use trainer::{ModelTrainer, TrainerConfig, MIN_TRAINING_ROWS};
