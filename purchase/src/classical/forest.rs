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

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// How many features each split considers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// `ceil(sqrt(n_features))`
    Sqrt,
    All,
    Count(usize),
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(k) => k,
        };
        k.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    /// `None` grows every tree until its leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            seed: 42,
        }
    }
}

pub struct RandomForestBuilder {
    params: ForestParams,
}

impl RandomForestBuilder {
    pub fn n_trees(mut self, n_trees: usize) -> Self {
        self.params.n_trees = n_trees.max(1);
        self
    }

    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.params.max_depth = max_depth;
        self
    }

    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.params.min_samples_split = min_samples_split.max(2);
        self
    }

    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.params.min_samples_leaf = min_samples_leaf.max(1);
        self
    }

    pub fn max_features(mut self, max_features: MaxFeatures) -> Self {
        self.params.max_features = max_features;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    pub fn params(mut self, params: ForestParams) -> Self {
        self.params = params;
        self
    }

    pub fn build(self) -> RandomForest {
        RandomForest { params: self.params, trees: Vec::new(), n_features: 0, importances: Vec::new() }
    }
}

/// Random forest binary classifier.
///
/// Each tree is grown on a bootstrap sample with gini impurity, considering a
/// random subset of features at every split. The positive-class probability of
/// a row is the mean of the positive fraction of the leaves it lands in. All
/// randomness comes from a single `StdRng` seeded with `params.seed`, so equal
/// inputs always produce the same forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    n_features: usize,
    importances: Vec<f64>,
}

impl RandomForest {
    pub fn new() -> RandomForestBuilder {
        RandomForestBuilder { params: ForestParams::default() }
    }

    /// Fits the forest. Labels must be 0 or 1.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        if x.is_empty() || y.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        if x.nrows() != y.len() {
            return Err(ModelError::DimensionMismatch { expected: x.nrows(), actual: y.len() });
        }
        let labels = y
            .iter()
            .map(|&v| match v {
                v if v == 0.0 => Ok(false),
                v if v == 1.0 => Ok(true),
                v => Err(ModelError::InvalidLabel(v)),
            })
            .collect::<Result<Vec<bool>, _>>()?;

        let (n_samples, n_features) = x.dim();
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut trees = Vec::with_capacity(self.params.n_trees);
        let mut importances = vec![0.0; n_features];

        for _ in 0..self.params.n_trees {
            let indices: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            let mut grower = TreeGrower {
                x,
                labels: &labels,
                params: &self.params,
                n_candidates: self.params.max_features.resolve(n_features),
                rng: &mut rng,
                impurity_decrease: vec![0.0; n_features],
            };
            let root = grower.grow(indices, 0);
            let tree_total: f64 = grower.impurity_decrease.iter().sum();
            if tree_total > 0.0 {
                for (total, decrease) in importances.iter_mut().zip(&grower.impurity_decrease) {
                    *total += decrease / tree_total;
                }
            }
            trees.push(DecisionTree { root });
        }

        let forest_total: f64 = importances.iter().sum();
        if forest_total > 0.0 {
            importances.iter_mut().for_each(|w| *w /= forest_total);
        }

        debug!("Fitted {} trees on {} samples x {} features", trees.len(), n_samples, n_features);
        self.trees = trees;
        self.n_features = n_features;
        self.importances = importances;
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Mean decrease in gini impurity per feature, normalized to sum to 1
    /// (all zeros when no tree ever split).
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    /// Positive-class probability of a single row.
    pub fn predict_proba_row(&self, row: ArrayView1<f64>) -> Result<f64, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        if row.len() != self.n_features {
            return Err(ModelError::DimensionMismatch { expected: self.n_features, actual: row.len() });
        }
        let total: f64 = self.trees.iter().map(|tree| tree.positive_fraction(row)).sum();
        Ok(total / self.trees.len() as f64)
    }

    /// Positive-class probabilities for every row of `x`.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        x.axis_iter(Axis(0)).map(|row| self.predict_proba_row(row)).collect()
    }

    /// Class labels (0.0 or 1.0) using a 0.5 probability threshold.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        Ok(self.predict_proba(x)?.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DecisionTree {
    root: TreeNode,
}

impl DecisionTree {
    fn positive_fraction(&self, row: ArrayView1<f64>) -> f64 {
        let mut current = &self.root;
        loop {
            match current {
                TreeNode::Leaf { positive_fraction, .. } => return *positive_fraction,
                TreeNode::Internal { feature, threshold, left, right } => {
                    current = if row[*feature] < *threshold { left } else { right };
                }
            }
        }
    }
}

/// A node of a fitted tree. Rows with `value < threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    Internal { feature: usize, threshold: f64, left: Box<TreeNode>, right: Box<TreeNode> },
    Leaf { positive_fraction: f64, samples: usize },
}

struct Split {
    feature: usize,
    threshold: f64,
    weighted_impurity: f64,
}

struct TreeGrower<'a> {
    x: &'a Array2<f64>,
    labels: &'a [bool],
    params: &'a ForestParams,
    n_candidates: usize,
    rng: &'a mut StdRng,
    impurity_decrease: Vec<f64>,
}

impl TreeGrower<'_> {
    /// Recursively splits `indices` on the best candidate feature and threshold.
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n = indices.len();
        let positives = indices.iter().filter(|&&idx| self.labels[idx]).count();
        let impurity = gini(positives, n);
        let leaf = TreeNode::Leaf { positive_fraction: positives as f64 / n as f64, samples: n };

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || n < self.params.min_samples_split || impurity <= 0.0 {
            return leaf;
        }

        let Some(split) = self.find_best_split(&indices) else {
            return leaf;
        };
        let decrease = n as f64 * impurity - split.weighted_impurity;
        self.impurity_decrease[split.feature] += decrease.max(0.0);

        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.into_iter().partition(|&idx| self.x[[idx, split.feature]] < split.threshold);

        TreeNode::Internal {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.grow(left, depth + 1)),
            right: Box::new(self.grow(right, depth + 1)),
        }
    }

    fn find_best_split(&mut self, indices: &[usize]) -> Option<Split> {
        let n = indices.len();
        let total_positives = indices.iter().filter(|&&idx| self.labels[idx]).count();
        let min_leaf = self.params.min_samples_leaf;

        let mut candidates =
            rand::seq::index::sample(self.rng, self.x.ncols(), self.n_candidates).into_vec();
        // ties between features resolve to the lowest index
        candidates.sort_unstable();

        let mut best: Option<Split> = None;
        for feature in candidates {
            let mut sorted: Vec<(f64, bool)> =
                indices.iter().map(|&idx| (self.x[[idx, feature]], self.labels[idx])).collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_positives = 0;
            for i in 1..n {
                if sorted[i - 1].1 {
                    left_positives += 1;
                }
                // no threshold separates equal values
                if sorted[i - 1].0 == sorted[i].0 || i < min_leaf || n - i < min_leaf {
                    continue;
                }
                let right_positives = total_positives - left_positives;
                let weighted = i as f64 * gini(left_positives, i)
                    + (n - i) as f64 * gini(right_positives, n - i);
                if best.as_ref().map_or(true, |b| weighted < b.weighted_impurity) {
                    let (lower, upper) = (sorted[i - 1].0, sorted[i].0);
                    // the midpoint of adjacent floats can round down onto `lower`
                    let midpoint = (lower + upper) / 2.0;
                    let threshold = if midpoint > lower { midpoint } else { upper };
                    best = Some(Split { feature, threshold, weighted_impurity: weighted });
                }
            }
        }
        best
    }
}

fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}
