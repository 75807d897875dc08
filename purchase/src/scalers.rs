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

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::errors::ScalerError;

/// Frozen standardization parameters of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub mean: f64,
    pub std: f64,
}

impl ScaleParams {
    /// A zero or non-finite deviation is replaced by 1 so constant columns only get centered.
    pub fn new(mean: f64, std: f64) -> Self {
        let std = if std == 0.0 || !std.is_finite() { 1.0 } else { std };
        ScaleParams { mean, std }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }
}

/// Per-column standard scaler keyed by column name.
///
/// Fitting produces a new scaler; transforms never refit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    params: BTreeMap<String, ScaleParams>,
}

impl FeatureScaler {
    /// Fits population mean and standard deviation for each column of `x`,
    /// where column `i` of `x` holds the feature named `columns[i]`.
    pub fn fit<S: AsRef<str>>(columns: &[S], x: &Array2<f64>) -> Result<Self, ScalerError> {
        if x.is_empty() || x.nrows() == 0 {
            return Err(ScalerError::EmptyInput);
        }
        if columns.len() != x.ncols() {
            return Err(ScalerError::DimensionMismatch { expected: columns.len(), actual: x.ncols() });
        }

        let mean = x.mean_axis(Axis(0)).ok_or(ScalerError::EmptyInput)?;
        let std = x.std_axis(Axis(0), 0.0);
        let params = columns
            .iter()
            .zip(mean.iter().zip(std.iter()))
            .map(|(name, (&m, &s))| (name.as_ref().to_string(), ScaleParams::new(m, s)))
            .collect();
        Ok(FeatureScaler { params })
    }

    pub fn params(&self, column: &str) -> Option<&ScaleParams> {
        self.params.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Scales a single value. Columns the scaler was not fitted on pass through.
    pub fn transform(&self, column: &str, value: f64) -> f64 {
        match self.params.get(column) {
            Some(params) => params.apply(value),
            None => value,
        }
    }

    /// Scales a row laid out as `columns`.
    pub fn transform_row<S: AsRef<str>>(
        &self,
        columns: &[S],
        values: &[f64],
    ) -> Result<Array1<f64>, ScalerError> {
        if columns.len() != values.len() {
            return Err(ScalerError::DimensionMismatch {
                expected: columns.len(),
                actual: values.len(),
            });
        }
        Ok(columns.iter().zip(values).map(|(name, &v)| self.transform(name.as_ref(), v)).collect())
    }

    /// Scales every row of `x`, whose columns are laid out as `columns`.
    pub fn transform_matrix<S: AsRef<str>>(
        &self,
        columns: &[S],
        x: &Array2<f64>,
    ) -> Result<Array2<f64>, ScalerError> {
        if columns.len() != x.ncols() {
            return Err(ScalerError::DimensionMismatch { expected: columns.len(), actual: x.ncols() });
        }
        let mut scaled = x.clone();
        for (name, mut column) in columns.iter().zip(scaled.axis_iter_mut(Axis(1))) {
            if let Some(params) = self.params.get(name.as_ref()) {
                column.mapv_inplace(|v| params.apply(v));
            }
        }
        Ok(scaled)
    }
}
