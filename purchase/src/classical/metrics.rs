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

use ndarray::Array1;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub support: usize,
}

/// Held-out evaluation of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    /// Absent when the evaluated labels contain a single class.
    pub roc_auc: Option<f64>,
    pub classes: Vec<ClassReport>,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl EvaluationReport {
    /// Builds the report from positive-class probabilities and 0/1 labels,
    /// thresholding probabilities at 0.5.
    pub fn from_probabilities(
        probabilities: &Array1<f64>,
        actuals: &Array1<f64>,
        train_rows: usize,
    ) -> Self {
        let predictions = probabilities.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 });
        EvaluationReport {
            accuracy: calculate_accuracy(&predictions, actuals),
            roc_auc: roc_auc(probabilities, actuals),
            classes: [0u8, 1u8]
                .into_iter()
                .map(|label| class_report(label, &predictions, actuals))
                .collect(),
            train_rows,
            test_rows: actuals.len(),
        }
    }
}

impl std::fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Accuracy: {:.4}", self.accuracy)?;
        match self.roc_auc {
            Some(auc) => writeln!(f, "ROC-AUC: {:.4}", auc)?,
            None => writeln!(f, "ROC-AUC: undefined (single class in held-out split)")?,
        }
        writeln!(f, "{:>8} {:>10} {:>10} {:>10}", "class", "precision", "recall", "support")?;
        for class in &self.classes {
            writeln!(
                f,
                "{:>8} {:>10.2} {:>10.2} {:>10}",
                class.label, class.precision, class.recall, class.support
            )?;
        }
        write!(f, "train rows: {}, test rows: {}", self.train_rows, self.test_rows)
    }
}

/// Fraction of predictions equal to the actual labels.
pub fn calculate_accuracy(predictions: &Array1<f64>, actuals: &Array1<f64>) -> f64 {
    if actuals.is_empty() {
        return 0.0;
    }
    let correct = predictions.iter().zip(actuals.iter()).filter(|(p, a)| p == a).count();
    correct as f64 / actuals.len() as f64
}

/// Area under the ROC curve via the rank-sum statistic, averaging ranks of
/// tied scores. `None` unless both classes are present.
pub fn roc_auc(scores: &Array1<f64>, actuals: &Array1<f64>) -> Option<f64> {
    let positives = actuals.iter().filter(|&&a| a == 1.0).count();
    let negatives = actuals.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based average rank of the tie group
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }

    let positive_rank_sum: f64 =
        ranks.iter().zip(actuals.iter()).filter(|(_, &a)| a == 1.0).map(|(r, _)| r).sum();
    let p = positives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

fn class_report(label: u8, predictions: &Array1<f64>, actuals: &Array1<f64>) -> ClassReport {
    let target = f64::from(label);
    let pairs = || predictions.iter().zip(actuals.iter());
    let true_positives = pairs().filter(|(&p, &a)| p == target && a == target).count();
    let predicted = predictions.iter().filter(|&&p| p == target).count();
    let support = actuals.iter().filter(|&&a| a == target).count();

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    ClassReport {
        label,
        precision: ratio(true_positives, predicted),
        recall: ratio(true_positives, support),
        support,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_calculate_accuracy() {
        let predictions = array![1.0, 0.0, 1.0, 1.0];
        let actuals = array![1.0, 0.0, 0.0, 1.0];
        assert_eq!(calculate_accuracy(&predictions, &actuals), 0.75);
    }

    #[test]
    fn test_roc_auc_perfect_and_reversed() {
        let actuals = array![0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(&array![0.1, 0.2, 0.8, 0.9], &actuals), Some(1.0));
        assert_eq!(roc_auc(&array![0.9, 0.8, 0.2, 0.1], &actuals), Some(0.0));
    }

    #[test]
    fn test_roc_auc_ties_count_half() {
        let actuals = array![0.0, 1.0];
        assert_eq!(roc_auc(&array![0.5, 0.5], &actuals), Some(0.5));

        // one positive above both negatives, one tied with a negative
        let actuals = array![0.0, 0.0, 1.0, 1.0];
        let scores = array![0.2, 0.6, 0.6, 0.9];
        assert_eq!(roc_auc(&scores, &actuals), Some(0.875));
    }

    #[test]
    fn test_roc_auc_single_class() {
        assert_eq!(roc_auc(&array![0.1, 0.7], &array![1.0, 1.0]), None);
    }

    #[test]
    fn test_report_per_class_precision_recall() {
        let probabilities = array![0.9, 0.6, 0.4, 0.1, 0.7];
        let actuals = array![1.0, 0.0, 1.0, 0.0, 1.0];
        let report = EvaluationReport::from_probabilities(&probabilities, &actuals, 20);

        // predictions: 1, 1, 0, 0, 1
        assert_eq!(report.accuracy, 0.6);
        assert_eq!(report.test_rows, 5);
        assert_eq!(report.train_rows, 20);

        let negative = &report.classes[0];
        assert_eq!(negative.label, 0);
        assert_eq!(negative.support, 2);
        assert_eq!(negative.precision, 0.5);
        assert_eq!(negative.recall, 0.5);

        let positive = &report.classes[1];
        assert_eq!(positive.support, 3);
        assert!((positive.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((positive.recall - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_report_display_mentions_metrics() {
        let report =
            EvaluationReport::from_probabilities(&array![0.9, 0.1], &array![1.0, 0.0], 8);
        let text = report.to_string();
        assert!(text.contains("Accuracy: 1.0000"));
        assert!(text.contains("ROC-AUC: 1.0000"));
    }
}
