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

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::debug;

use super::{parse_numeric, Column, ColumnData, RawTable, TableSource};
use crate::errors::{CsvError, DataError};

/// Placeholder category for empty cells in categorical columns.
pub const MISSING_CATEGORY: &str = "missing";

/// Loads a headed CSV file into a [`RawTable`] each time it is asked to.
#[derive(Debug, Clone)]
pub struct CsvTableSource {
    path: PathBuf,
}

impl CsvTableSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CsvTableSource { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvTableSource {
    fn load_table(&self) -> Result<RawTable, DataError> {
        let file = File::open(&self.path).map_err(CsvError::from)?;
        let table = read_table(file)?;
        debug!(
            "Loaded {} rows and {} columns from {:?}",
            table.n_rows(),
            table.columns().len(),
            self.path
        );
        Ok(table)
    }
}

/// Reads CSV text with a header row. Lines starting with `#` are skipped.
///
/// A column is categorical when any non-empty cell fails to parse as a number
/// (the literals `true`/`false` count as numbers). Empty numeric cells become
/// `0.0`, empty categorical cells become [`MISSING_CATEGORY`].
pub fn read_table<R: Read>(reader: R) -> Result<RawTable, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers().map_err(CsvError::from)?.iter().map(String::from).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::MissingHeaders.into());
    }

    // Parse all fields as strings initially
    let mut data: Vec<Vec<String>> = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result.map_err(CsvError::from)?;
        if record.len() != headers.len() {
            return Err(CsvError::InconsistentColumns {
                row: i + 1,
                actual: record.len(),
                expected: headers.len(),
            }
            .into());
        }
        data.push(record.iter().map(|s| s.to_string()).collect());
    }

    if data.is_empty() {
        return Err(CsvError::EmptyFile.into());
    }

    let columns = headers
        .into_iter()
        .enumerate()
        .map(|(col, name)| {
            let is_categorical =
                data.iter().any(|row| !row[col].is_empty() && parse_numeric(&row[col]).is_none());
            let values = data.iter().map(|row| row[col].as_str());
            let column_data = if is_categorical {
                ColumnData::Categorical(
                    values
                        .map(|v| if v.is_empty() { MISSING_CATEGORY.to_string() } else { v.to_string() })
                        .collect(),
                )
            } else {
                ColumnData::Numeric(values.map(|v| parse_numeric(v).unwrap_or(0.0)).collect())
            };
            Column { name, data: column_data }
        })
        .collect();

    RawTable::new(columns)
}
