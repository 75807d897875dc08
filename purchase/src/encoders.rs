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

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Code returned for a category that was never seen while fitting.
///
/// Unseen values are folded into this code instead of failing the request. The
/// code is shared with the lexicographically smallest fitted category, so an
/// unseen value is scored as if it were that category.
pub const FALLBACK_CODE: u32 = 0;

/// Ordinal codes for one categorical column.
///
/// Codes are assigned in sorted order of the distinct fitted values, starting
/// at zero, and never change once fitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCodes {
    codes: BTreeMap<String, u32>,
}

impl CategoryCodes {
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> =
            values.into_iter().map(|v| v.as_ref().to_string()).collect();
        let codes = distinct.into_iter().enumerate().map(|(code, v)| (v, code as u32)).collect();
        CategoryCodes { codes }
    }

    pub fn code(&self, value: &str) -> Option<u32> {
        self.codes.get(value).copied()
    }

    pub fn decode(&self, code: u32) -> Option<&str> {
        self.codes.iter().find(|(_, c)| **c == code).map(|(v, _)| v.as_str())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Per-column categorical encoders, frozen at training time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    columns: BTreeMap<String, CategoryCodes>,
}

impl FeatureEncoder {
    pub fn new() -> Self {
        FeatureEncoder { columns: BTreeMap::new() }
    }

    /// Fits (or refits) the codes of a single column.
    pub fn fit_column<I, S>(&mut self, column: &str, values: I) -> &CategoryCodes
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.columns.insert(column.to_string(), CategoryCodes::fit(values));
        &self.columns[column]
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn codes(&self, column: &str) -> Option<&CategoryCodes> {
        self.columns.get(column)
    }

    /// Code of `value` in `column`, or `None` when the value (or column) was not fitted.
    pub fn lookup(&self, column: &str, value: &str) -> Option<u32> {
        self.columns.get(column).and_then(|codes| codes.code(value))
    }

    /// Code of `value` in `column`, folding unseen values into [`FALLBACK_CODE`].
    pub fn transform(&self, column: &str, value: &str) -> u32 {
        self.lookup(column, value).unwrap_or(FALLBACK_CODE)
    }

    pub fn decode(&self, column: &str, code: u32) -> Option<&str> {
        self.columns.get(column).and_then(|codes| codes.decode(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_sorted_order() {
        let codes = CategoryCodes::fit(["Samsung", "Apple", "OnePlus", "Apple"]);
        assert_eq!(codes.code("Apple"), Some(0));
        assert_eq!(codes.code("OnePlus"), Some(1));
        assert_eq!(codes.code("Samsung"), Some(2));
        assert_eq!(codes.len(), 3);
    }

    #[test]
    fn test_round_trip_and_stability() {
        let mut encoder = FeatureEncoder::new();
        encoder.fit_column("Brand_Preference", ["C", "A", "B", "A"]);

        for value in ["A", "B", "C"] {
            let first = encoder.transform("Brand_Preference", value);
            for _ in 0..3 {
                assert_eq!(encoder.transform("Brand_Preference", value), first);
            }
            assert_eq!(encoder.decode("Brand_Preference", first), Some(value));
        }
    }

    #[test]
    fn test_unseen_value_maps_to_fallback() {
        let mut encoder = FeatureEncoder::new();
        encoder.fit_column("Brand_Preference", ["A", "B", "C"]);

        assert_eq!(encoder.lookup("Brand_Preference", "D"), None);
        assert_eq!(encoder.transform("Brand_Preference", "D"), FALLBACK_CODE);
        // the fallback aliases the smallest fitted category
        assert_eq!(encoder.decode("Brand_Preference", FALLBACK_CODE), Some("A"));
    }

    #[test]
    fn test_unknown_column_maps_to_fallback() {
        let encoder = FeatureEncoder::new();
        assert!(!encoder.is_categorical("Preferred_OS"));
        assert_eq!(encoder.transform("Preferred_OS", "iOS"), FALLBACK_CODE);
    }

    #[test]
    fn test_serde_preserves_codes() {
        let mut encoder = FeatureEncoder::new();
        encoder.fit_column("Preferred_OS", ["iOS", "Android"]);
        let json = serde_json::to_string(&encoder).unwrap();
        let restored: FeatureEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, encoder);
        assert_eq!(restored.transform("Preferred_OS", "iOS"), 1);
    }
}
