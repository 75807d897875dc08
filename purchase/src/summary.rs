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

use serde::{Deserialize, Serialize};

use crate::data::{ColumnData, RawTable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureSummary {
    Numeric { mean: f64, min: f64, max: f64, std: f64 },
    Categorical { counts: BTreeMap<String, usize> },
}

/// Aggregate statistics of a raw table. Independent of any trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    pub record_count: usize,
    /// Mean of the target column; absent when the target is missing,
    /// categorical, or the table is empty.
    pub positive_rate: Option<f64>,
    pub features: BTreeMap<String, FeatureSummary>,
}

impl DataSummary {
    pub fn feature(&self, name: &str) -> Option<&FeatureSummary> {
        self.features.get(name)
    }

    pub fn mean(&self, name: &str) -> Option<f64> {
        match self.features.get(name)? {
            FeatureSummary::Numeric { mean, .. } => Some(*mean),
            FeatureSummary::Categorical { .. } => None,
        }
    }

    pub fn counts(&self, name: &str) -> Option<&BTreeMap<String, usize>> {
        match self.features.get(name)? {
            FeatureSummary::Categorical { counts } => Some(counts),
            FeatureSummary::Numeric { .. } => None,
        }
    }
}

/// Summarizes every column except `target` and `excluded`. Numeric columns of
/// an empty table are left out since they have no statistics.
pub fn summarize(table: &RawTable, target: &str, excluded: &[String]) -> DataSummary {
    let positive_rate = match table.column(target).map(|c| &c.data) {
        Some(ColumnData::Numeric(values)) if !values.is_empty() => {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
        _ => None,
    };

    let features = table
        .columns()
        .iter()
        .filter(|c| c.name != target && !excluded.contains(&c.name))
        .filter_map(|c| summarize_column(&c.data).map(|s| (c.name.clone(), s)))
        .collect();

    DataSummary { record_count: table.n_rows(), positive_rate, features }
}

fn summarize_column(data: &ColumnData) -> Option<FeatureSummary> {
    match data {
        ColumnData::Numeric(values) if values.is_empty() => None,
        ColumnData::Numeric(values) => {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            Some(FeatureSummary::Numeric {
                mean,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                std: variance.sqrt(),
            })
        }
        ColumnData::Categorical(values) => {
            let mut counts = BTreeMap::new();
            for value in values {
                *counts.entry(value.clone()).or_insert(0) += 1;
            }
            Some(FeatureSummary::Categorical { counts })
        }
    }
}
