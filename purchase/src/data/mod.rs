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

pub mod csv;

pub use csv::{CsvTableSource, MISSING_CATEGORY};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::DataError;

/// A single raw field value as received from a caller or read from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view of the value. Booleans map to 1/0, text is parsed.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Scalar::Null => return None,
            Scalar::Bool(b) => bool_to_f64(*b),
            Scalar::Int(i) => *i as f64,
            Scalar::Float(f) => *f,
            Scalar::Text(s) => parse_numeric(s)?,
        };
        value.is_finite().then_some(value)
    }

    /// Category label for the value, `None` for nulls and blank text.
    ///
    /// Floats keep their decimal point (`1.0` reads as `"1.0"`, as the CSV
    /// reader keeps that cell), integers do not.
    pub fn as_category(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(true) => Some("True".to_string()),
            Scalar::Bool(false) => Some("False".to_string()),
            Scalar::Int(i) => Some(i.to_string()),
            Scalar::Float(f) => Some(format!("{f:?}")),
            Scalar::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }

    /// Present but empty: a zero-length or whitespace-only text value.
    pub fn is_blank(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.trim().is_empty())
    }
}

impl From<&serde_json::Value> for Scalar {
    /// Arrays and objects carry no scalar meaning and are treated as null.
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => Scalar::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => n.as_f64().map(Scalar::Float).unwrap_or(Scalar::Null),
            },
            serde_json::Value::String(s) => Scalar::Text(s.clone()),
            _ => Scalar::Null,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// A request row: column name to raw value. Its schema is not guaranteed to
/// match the training schema.
pub type RawRow = HashMap<String, Scalar>;

/// Parses numbers and the boolean literals `true`/`false` (any case).
pub(crate) fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        return Some(value);
    }
    if trimmed.eq_ignore_ascii_case("true") {
        Some(1.0)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(0.0)
    } else {
        None
    }
}

fn bool_to_f64(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scalar_at(&self, idx: usize) -> Scalar {
        match self {
            ColumnData::Numeric(values) => Scalar::Float(values[idx]),
            ColumnData::Categorical(values) => Scalar::Text(values[idx].clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: &str, values: Vec<f64>) -> Self {
        Column { name: name.to_string(), data: ColumnData::Numeric(values) }
    }

    pub fn categorical<S: AsRef<str>>(name: &str, values: &[S]) -> Self {
        Column {
            name: name.to_string(),
            data: ColumnData::Categorical(values.iter().map(|v| v.as_ref().to_string()).collect()),
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.data, ColumnData::Categorical(_))
    }
}

/// A table of typed, equally long, uniquely named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    columns: Vec<Column>,
    n_rows: usize,
}

impl RawTable {
    pub fn new(columns: Vec<Column>) -> Result<Self, DataError> {
        let n_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DataError::DuplicateColumn(column.name.clone()));
            }
            if column.data.len() != n_rows {
                return Err(DataError::LengthMismatch {
                    column: column.name.clone(),
                    expected: n_rows,
                    actual: column.data.len(),
                });
            }
        }
        Ok(RawTable { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Materializes row `idx` as a [`RawRow`].
    pub fn row(&self, idx: usize) -> Option<RawRow> {
        if idx >= self.n_rows {
            return None;
        }
        Some(self.columns.iter().map(|c| (c.name.clone(), c.data.scalar_at(idx))).collect())
    }
}

/// Anything that can produce the raw training table on demand.
pub trait TableSource: Send + Sync {
    fn load_table(&self) -> Result<RawTable, DataError>;
}

impl TableSource for RawTable {
    fn load_table(&self) -> Result<RawTable, DataError> {
        Ok(self.clone())
    }
}
