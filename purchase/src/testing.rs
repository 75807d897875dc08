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

//! Shared fixtures for the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::data::{Column, RawRow, RawTable, Scalar, TableSource};
use crate::errors::DataError;

pub(crate) const SYNTHETIC_ROWS: usize = 100;

/// The 100-row smartphone table: brands A/B/C, iOS/Android, 40% purchasers.
pub(crate) fn synthetic_table() -> RawTable {
    synthetic_table_with_rows(SYNTHETIC_ROWS)
}

/// Row `i` is a purchaser when `i % 5 < 2`. Age, income and tech savviness
/// follow the label closely so a forest separates the classes.
pub(crate) fn synthetic_table_with_rows(n_rows: usize) -> RawTable {
    let mut user_id = Vec::with_capacity(n_rows);
    let mut age = Vec::with_capacity(n_rows);
    let mut income = Vec::with_capacity(n_rows);
    let mut brand = Vec::with_capacity(n_rows);
    let mut os = Vec::with_capacity(n_rows);
    let mut tech_savvy = Vec::with_capacity(n_rows);
    let mut activity = Vec::with_capacity(n_rows);
    let mut purchased = Vec::with_capacity(n_rows);

    for i in 0..n_rows {
        let positive = i % 5 < 2;
        user_id.push((1000 + i) as f64);
        let years = if positive { 22 + (i * 7) % 12 } else { 38 + (i * 11) % 25 };
        age.push(years as f64);
        let salary = if positive { 65_000 + (i * 313) % 30_000 } else { 20_000 + (i * 271) % 30_000 };
        income.push(salary as f64);
        brand.push(["A", "B", "C"][i % 3]);
        os.push(if i % 2 == 0 { "iOS" } else { "Android" });
        tech_savvy.push(if positive || i % 7 == 0 { 1.0 } else { 0.0 });
        activity.push(((i * 17) % 100) as f64);
        purchased.push(if positive { 1.0 } else { 0.0 });
    }

    RawTable::new(vec![
        Column::numeric("User_ID", user_id),
        Column::numeric("Age", age),
        Column::numeric("Income", income),
        Column::categorical("Brand_Preference", &brand),
        Column::categorical("Preferred_OS", &os),
        Column::numeric("Tech_Savvy", tech_savvy),
        Column::numeric("Online_Activity_Score", activity),
        Column::numeric("Purchased", purchased),
    ])
    .unwrap()
}

/// A request row shaped like the training data, without the target.
pub(crate) fn sample_row() -> RawRow {
    RawRow::from([
        ("Age".to_string(), Scalar::Int(27)),
        ("Income".to_string(), Scalar::Float(72_000.0)),
        ("Brand_Preference".to_string(), Scalar::from("B")),
        ("Preferred_OS".to_string(), Scalar::from("iOS")),
        ("Tech_Savvy".to_string(), Scalar::Bool(true)),
        ("Online_Activity_Score".to_string(), Scalar::Int(64)),
    ])
}

/// Table source that sleeps before answering and counts its loads.
pub(crate) struct SlowSource {
    table: RawTable,
    delay: Duration,
    loads: AtomicUsize,
}

impl SlowSource {
    pub(crate) fn new(table: RawTable, delay: Duration) -> Self {
        SlowSource { table, delay, loads: AtomicUsize::new(0) }
    }

    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl TableSource for SlowSource {
    fn load_table(&self) -> Result<RawTable, DataError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        Ok(self.table.clone())
    }
}
