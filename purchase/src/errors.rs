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

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    #[error("Column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch { column: String, expected: usize, actual: usize },

    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("Failed to open file: {0}")]
    FileOpen(#[from] std::io::Error),

    #[error("CSV file is empty")]
    EmptyFile,

    #[error("CSV must have a header row with at least one column")]
    MissingHeaders,

    #[error("Inconsistent column count: row {row} has {actual} columns, expected {expected}")]
    InconsistentColumns { row: usize, actual: usize, expected: usize },

    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),
}

/// Malformed or insufficient training data. Fatal and never retried automatically.
#[derive(Error, Debug, Clone)]
pub enum TrainingDataError {
    #[error("Target column '{0}' not found in training data")]
    MissingTarget(String),

    #[error("Target column '{0}' must be numeric with values 0 or 1")]
    CategoricalTarget(String),

    #[error("Invalid target value {value} at row {row}, expected 0 or 1")]
    InvalidTarget { row: usize, value: f64 },

    #[error("Training data has {rows} rows, at least {min} are required")]
    InsufficientRows { rows: usize, min: usize },

    #[error("No feature columns left after removing the target and excluded columns")]
    NoFeatures,

    #[error("Failed to read training data: {0}")]
    Source(Arc<DataError>),
}

impl From<DataError> for TrainingDataError {
    fn from(err: DataError) -> Self {
        TrainingDataError::Source(Arc::new(err))
    }
}

/// The stored bundle is partial or its members disagree with each other.
#[derive(Error, Debug, Clone)]
pub enum ArtifactCorruptError {
    #[error("Artifact member '{0}' is missing")]
    MissingMember(&'static str),

    #[error("Artifact member '{member}' could not be decoded: {reason}")]
    Malformed { member: &'static str, reason: String },

    #[error("Artifact member '{member}' does not match its manifest checksum")]
    ChecksumMismatch { member: &'static str },

    #[error("Artifact member '{member}' belongs to run {found}, manifest expects {expected}")]
    RunMismatch { member: &'static str, expected: String, found: String },

    #[error("Column signature of '{member}' disagrees with the column order: {detail}")]
    ColumnMismatch { member: &'static str, detail: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No artifact bundle found in {0}")]
    NotFound(PathBuf),

    #[error("Artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Corrupt(#[from] ArtifactCorruptError),
}

#[derive(Error, Debug, PartialEq)]
pub enum ScalerError {
    #[error("Input array is empty")]
    EmptyInput,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("Input array is empty")]
    EmptyInput,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Invalid class label {0}, expected 0 or 1")]
    InvalidLabel(f64),

    #[error("Scaler error: {0}")]
    Scaler(#[from] ScalerError),
}

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error(transparent)]
    Data(#[from] TrainingDataError),

    #[error("Model fitting failed: {0}")]
    Model(#[from] ModelError),

    #[error("Trained bundle is inconsistent: {0}")]
    Bundle(#[from] ArtifactCorruptError),
}

/// Failures surfaced by the prediction service. Cloneable so a single failed
/// training run can be reported to every caller that waited on it.
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    #[error(transparent)]
    TrainingData(#[from] TrainingDataError),

    #[error(transparent)]
    ArtifactCorrupt(#[from] ArtifactCorruptError),

    #[error("Artifact store failed: {0}")]
    Storage(Arc<StoreError>),

    #[error("Model failed: {0}")]
    Model(Arc<ModelError>),

    #[error("Training was interrupted before it completed")]
    Interrupted,
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corrupt(corrupt) => ServiceError::ArtifactCorrupt(corrupt),
            other => ServiceError::Storage(Arc::new(other)),
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        ServiceError::Model(Arc::new(err))
    }
}

impl From<TrainingError> for ServiceError {
    fn from(err: TrainingError) -> Self {
        match err {
            TrainingError::Data(data) => ServiceError::TrainingData(data),
            TrainingError::Model(model) => ServiceError::Model(Arc::new(model)),
            TrainingError::Bundle(corrupt) => ServiceError::ArtifactCorrupt(corrupt),
        }
    }
}
