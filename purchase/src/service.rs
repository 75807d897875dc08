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

//! The prediction service: the only entry point external callers use.
//!
//! The service owns the single cached [`ArtifactBundle`]. [`PredictionService::ensure_ready`]
//! loads it from the store or trains it on first use. At most one load-or-train
//! attempt is in flight at a time. Callers arriving while an attempt runs block
//! on a condition variable and share its outcome, whether a bundle or an error.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::artifacts::{ArtifactBundle, ArtifactStore, ColumnOrder};
use crate::data::{RawRow, RawTable, Scalar, TableSource, MISSING_CATEGORY};
use crate::encoders::{FeatureEncoder, FALLBACK_CODE};
use crate::errors::{ModelError, ServiceError, StoreError, TrainingDataError};
use crate::summary::{summarize, DataSummary};
use crate::trainer::{ModelTrainer, TrainerConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    trainer: TrainerConfig,
    retrain_on_corrupt: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig { trainer: TrainerConfig::default(), retrain_on_corrupt: true }
    }
}

impl ServiceConfig {
    pub fn with_trainer(mut self, trainer: TrainerConfig) -> Self {
        self.trainer = trainer;
        self
    }

    /// When off, a corrupt stored bundle is reported instead of retrained.
    pub fn with_retrain_on_corrupt(mut self, retrain: bool) -> Self {
        self.retrain_on_corrupt = retrain;
        self
    }

    pub fn trainer(&self) -> &TrainerConfig {
        &self.trainer
    }

    pub fn retrain_on_corrupt(&self) -> bool {
        self.retrain_on_corrupt
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: bool,
    pub probability: f64,
    /// Global ranking of the model, not an attribution for this row.
    #[serde(rename = "feature_importances")]
    pub ranked_importances: Vec<FeatureImportance>,
}

/// A request row laid out in training column order, plus the schema
/// divergences found while aligning it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedRow {
    pub values: Vec<f64>,
    /// Expected columns that were absent, null or unparseable.
    pub missing: Vec<String>,
    /// `(column, value)` pairs whose category was never seen in training.
    pub unknown_categories: Vec<(String, String)>,
    /// Fields of the request that are not model features, sorted.
    pub ignored: Vec<String>,
}

/// Lays `row` out as `order`.
///
/// Absent, null or unparseable numeric values become `0.0`. Blank categorical
/// text takes the code of [`MISSING_CATEGORY`] when training saw blank cells.
/// Otherwise absent categorical values and unseen categories become
/// [`FALLBACK_CODE`]. Fields outside `order` are dropped.
pub fn align(row: &RawRow, order: &ColumnOrder, encoder: &FeatureEncoder) -> AlignedRow {
    let mut aligned = AlignedRow { values: Vec::with_capacity(order.len()), ..Default::default() };

    for name in order.names() {
        let raw = row.get(name).filter(|v| !matches!(v, Scalar::Null));
        let value = if encoder.is_categorical(name) {
            // blank text reads as the category blank training cells were given
            let category = match raw {
                Some(value) if value.is_blank() => Some(MISSING_CATEGORY.to_string()),
                other => other.and_then(Scalar::as_category),
            };
            let code = match category {
                Some(category) => match encoder.lookup(name, &category) {
                    Some(code) => code,
                    None if category == MISSING_CATEGORY => {
                        aligned.missing.push(name.clone());
                        FALLBACK_CODE
                    }
                    None => {
                        aligned.unknown_categories.push((name.clone(), category));
                        FALLBACK_CODE
                    }
                },
                None => {
                    aligned.missing.push(name.clone());
                    FALLBACK_CODE
                }
            };
            f64::from(code)
        } else {
            match raw.and_then(Scalar::as_f64) {
                Some(value) => value,
                None => {
                    aligned.missing.push(name.clone());
                    0.0
                }
            }
        };
        aligned.values.push(value);
    }

    aligned.ignored = row.keys().filter(|k| !order.contains(k)).cloned().collect();
    aligned.ignored.sort_unstable();
    aligned
}

/// Pairs importances with their columns, strictly by weight descending and
/// ties by feature name ascending.
pub fn rank_importances(order: &ColumnOrder, weights: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = order
        .iter()
        .zip(weights)
        .map(|(feature, &importance)| FeatureImportance { feature: feature.clone(), importance })
        .collect();
    ranked.sort_by(|a, b| match b.importance.total_cmp(&a.importance) {
        CmpOrdering::Equal => a.feature.cmp(&b.feature),
        other => other,
    });
    ranked
}

/// Schema divergence observed since start-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftStats {
    pub predictions: u64,
    pub unknown_categories: u64,
    pub missing_columns: u64,
    pub ignored_fields: u64,
    pub training_runs: u64,
}

#[derive(Debug, Default)]
struct DriftCounters {
    predictions: AtomicU64,
    unknown_categories: AtomicU64,
    missing_columns: AtomicU64,
    ignored_fields: AtomicU64,
}

impl DriftCounters {
    fn record(&self, aligned: &AlignedRow) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        self.unknown_categories.fetch_add(aligned.unknown_categories.len() as u64, Ordering::Relaxed);
        self.missing_columns.fetch_add(aligned.missing.len() as u64, Ordering::Relaxed);
        self.ignored_fields.fetch_add(aligned.ignored.len() as u64, Ordering::Relaxed);

        for (column, value) in &aligned.unknown_categories {
            debug!("Unseen category '{}' in column '{}', using fallback code", value, column);
        }
        if !aligned.missing.is_empty() {
            debug!("Request is missing columns {:?}, using defaults", aligned.missing);
        }
        if !aligned.ignored.is_empty() {
            debug!("Ignoring non-feature fields {:?}", aligned.ignored);
        }
    }
}

#[derive(Default)]
struct Slot {
    bundle: Option<Arc<ArtifactBundle>>,
    in_flight: bool,
    /// Incremented whenever a leader starts an attempt.
    generation: u64,
    /// Failure of the attempt with the tagged generation.
    failure: Option<(u64, ServiceError)>,
}

pub struct PredictionService {
    store: Arc<dyn ArtifactStore>,
    source: Arc<dyn TableSource>,
    config: ServiceConfig,
    slot: Mutex<Slot>,
    ready: Condvar,
    drift: DriftCounters,
    training_runs: AtomicU64,
}

impl PredictionService {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        source: Arc<dyn TableSource>,
        config: ServiceConfig,
    ) -> Self {
        PredictionService {
            store,
            source,
            config,
            slot: Mutex::new(Slot::default()),
            ready: Condvar::new(),
            drift: DriftCounters::default(),
            training_runs: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The cached bundle, without loading or training.
    pub fn current_bundle(&self) -> Option<Arc<ArtifactBundle>> {
        self.slot.lock().bundle.clone()
    }

    /// Returns the cached bundle, loading or training it first if needed.
    ///
    /// Idempotent. Concurrent callers during a cold start wait for the single
    /// leader and all receive the same `Arc`, or a clone of its error. After a
    /// failed attempt the next call starts a fresh one.
    pub fn ensure_ready(&self) -> Result<Arc<ArtifactBundle>, ServiceError> {
        let mut slot = self.slot.lock();
        loop {
            if let Some(bundle) = &slot.bundle {
                return Ok(Arc::clone(bundle));
            }
            if !slot.in_flight {
                break;
            }

            let generation = slot.generation;
            debug!("Waiting for in-flight preparation attempt {}", generation);
            while slot.in_flight && slot.generation == generation {
                self.ready.wait(&mut slot);
            }
            if let Some((failed, err)) = &slot.failure {
                if *failed == generation {
                    return Err(err.clone());
                }
            }
        }

        slot.in_flight = true;
        slot.generation += 1;
        let leader = Leader { service: self, generation: slot.generation, armed: true };
        drop(slot);

        let outcome = self.load_or_train();
        leader.finish(outcome)
    }

    fn load_or_train(&self) -> Result<ArtifactBundle, ServiceError> {
        if self.store.exists() {
            match self.store.load() {
                Ok(bundle) => return Ok(bundle),
                Err(StoreError::Corrupt(err)) if self.config.retrain_on_corrupt => {
                    warn!("Stored artifacts are corrupt, retraining: {}", err);
                }
                Err(StoreError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
        } else {
            info!("No stored artifacts, training a new bundle");
        }
        self.train_and_store()
    }

    fn train_and_store(&self) -> Result<ArtifactBundle, ServiceError> {
        let run = self.training_runs.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Starting training run #{} of this service", run);

        let table = self.source.load_table().map_err(TrainingDataError::from)?;
        let (bundle, report) = ModelTrainer::new(self.config.trainer.clone()).train(&table)?;
        debug!("Evaluation of run {}:\n{}", bundle.run_id(), report);
        self.store.save(&bundle)?;
        Ok(bundle)
    }

    /// Scores a raw row with the cached bundle, preparing it first if needed.
    pub fn predict(&self, row: &RawRow) -> Result<PredictionResult, ServiceError> {
        let bundle = self.ensure_ready()?;
        let order = bundle.column_order();

        let aligned = align(row, order, bundle.encoder());
        self.drift.record(&aligned);

        let scaled = bundle.scaler().transform_row(order.names(), &aligned.values).map_err(ModelError::from)?;
        let probability = bundle.model().predict_proba_row(scaled.view())?;

        Ok(PredictionResult {
            label: probability >= 0.5,
            probability,
            ranked_importances: rank_importances(order, bundle.model().feature_importances()),
        })
    }

    pub fn importance_ranking(&self) -> Result<Vec<FeatureImportance>, ServiceError> {
        let bundle = self.ensure_ready()?;
        Ok(rank_importances(bundle.column_order(), bundle.model().feature_importances()))
    }

    /// Aggregates `table`, skipping the configured target and excluded columns.
    pub fn summary_statistics(&self, table: &RawTable) -> DataSummary {
        let trainer = &self.config.trainer;
        summarize(table, trainer.target_column(), trainer.excluded_columns())
    }

    /// Summarizes the training data. Does not touch the model.
    pub fn data_summary(&self) -> Result<DataSummary, ServiceError> {
        let table = self.source.load_table().map_err(TrainingDataError::from)?;
        Ok(self.summary_statistics(&table))
    }

    pub fn drift_stats(&self) -> DriftStats {
        DriftStats {
            predictions: self.drift.predictions.load(Ordering::Relaxed),
            unknown_categories: self.drift.unknown_categories.load(Ordering::Relaxed),
            missing_columns: self.drift.missing_columns.load(Ordering::Relaxed),
            ignored_fields: self.drift.ignored_fields.load(Ordering::Relaxed),
            training_runs: self.training_runs(),
        }
    }

    /// Training executions started by this service.
    pub fn training_runs(&self) -> u64 {
        self.training_runs.load(Ordering::SeqCst)
    }
}

/// The caller running the current attempt. Dropping it without `finish`
/// (a panic while training) fails the attempt so waiters wake up.
struct Leader<'a> {
    service: &'a PredictionService,
    generation: u64,
    armed: bool,
}

impl Leader<'_> {
    fn finish(
        mut self,
        outcome: Result<ArtifactBundle, ServiceError>,
    ) -> Result<Arc<ArtifactBundle>, ServiceError> {
        self.armed = false;
        let mut slot = self.service.slot.lock();
        slot.in_flight = false;
        let result = match outcome {
            Ok(bundle) => {
                let bundle = Arc::new(bundle);
                slot.bundle = Some(Arc::clone(&bundle));
                Ok(bundle)
            }
            Err(err) => {
                slot.failure = Some((self.generation, err.clone()));
                Err(err)
            }
        };
        drop(slot);
        self.service.ready.notify_all();
        result
    }
}

impl Drop for Leader<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = self.service.slot.lock();
        slot.in_flight = false;
        slot.failure = Some((self.generation, ServiceError::Interrupted));
        drop(slot);
        self.service.ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::AtomicBool;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use tempfile::{tempdir, TempDir};

    use crate::artifacts::DirectoryStore;
    use crate::data::csv::read_table;
    use crate::data::{Column, RawTable};
    use crate::errors::{ArtifactCorruptError, DataError};
    use crate::testing::{sample_row, synthetic_table, SlowSource, SYNTHETIC_ROWS};

    fn service_with(store: &DirectoryStore, source: Arc<dyn TableSource>) -> PredictionService {
        PredictionService::new(Arc::new(store.clone()), source, ServiceConfig::default())
    }

    fn fresh_service(source: Arc<dyn TableSource>) -> (TempDir, PredictionService) {
        let dir = tempdir().unwrap();
        let service = service_with(&DirectoryStore::new(dir.path()), source);
        (dir, service)
    }

    fn table_without_target() -> RawTable {
        let columns =
            synthetic_table().columns().iter().filter(|c| c.name != "Purchased").cloned().collect();
        RawTable::new(columns).unwrap()
    }

    #[test]
    fn test_predict_trains_once_and_persists() {
        let _ =
            env_logger::builder().is_test(true).filter_level(log::LevelFilter::Debug).try_init();
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let service = service_with(&store, Arc::new(synthetic_table()));

        let first = service.predict(&sample_row()).unwrap();
        let second = service.predict(&sample_row()).unwrap();

        assert!((0.0..=1.0).contains(&first.probability));
        assert_eq!(first.label, first.probability >= 0.5);
        assert_eq!(first, second);
        assert_eq!(first.ranked_importances.len(), 6);
        assert_eq!(service.training_runs(), 1);
        assert!(store.exists());
        assert_eq!(store.load().unwrap().run_id(), service.current_bundle().unwrap().run_id());
    }

    #[test]
    fn test_reloaded_bundle_equals_trained_bundle() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let service = service_with(&store, Arc::new(synthetic_table()));
        let trained = service.ensure_ready().unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(&reloaded, trained.as_ref());

        let fresh = service_with(&store, Arc::new(synthetic_table()));
        assert_eq!(fresh.predict(&sample_row()).unwrap(), service.predict(&sample_row()).unwrap());
        assert_eq!(fresh.training_runs(), 0);
    }

    #[test]
    fn test_young_high_income_row_is_a_purchaser() {
        let (_dir, service) = fresh_service(Arc::new(synthetic_table()));
        let result = service.predict(&sample_row()).unwrap();
        assert!(result.label, "probability was {}", result.probability);
    }

    #[test]
    fn test_existing_bundle_is_loaded_not_retrained() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let (bundle, _) = ModelTrainer::default().train(&synthetic_table()).unwrap();
        store.save(&bundle).unwrap();

        let source = Arc::new(SlowSource::new(synthetic_table(), Duration::ZERO));
        let service = service_with(&store, source.clone());
        let ready = service.ensure_ready().unwrap();

        assert_eq!(ready.run_id(), bundle.run_id());
        assert_eq!(service.training_runs(), 0);
        assert_eq!(source.loads(), 0);
    }

    #[test]
    fn test_concurrent_cold_start_trains_once() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let source = Arc::new(SlowSource::new(synthetic_table(), Duration::from_millis(200)));
        let service = service_with(&store, source.clone());
        let callers = 8;
        let barrier = Barrier::new(callers);

        let bundles: Vec<Arc<ArtifactBundle>> = thread::scope(|s| {
            let handles: Vec<_> = (0..callers)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        service.predict(&sample_row()).unwrap();
                        service.ensure_ready().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(service.training_runs(), 1);
        assert_eq!(source.loads(), 1);
        assert!(bundles.iter().all(|b| Arc::ptr_eq(b, &bundles[0])));
        assert_eq!(service.drift_stats().predictions, callers as u64);
    }

    #[test]
    fn test_failed_training_reaches_every_waiter() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let source = Arc::new(SlowSource::new(table_without_target(), Duration::from_millis(200)));
        let service = service_with(&store, source.clone());
        let callers = 4;
        let barrier = Barrier::new(callers);

        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..callers)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        service.ensure_ready()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(service.training_runs(), 1);
        for result in results {
            assert!(matches!(
                result,
                Err(ServiceError::TrainingData(TrainingDataError::MissingTarget(_)))
            ));
        }
        assert!(!store.exists());

        // the failure is not cached, the next call tries again
        assert!(service.ensure_ready().is_err());
        assert_eq!(service.training_runs(), 2);
    }

    #[test]
    fn test_corrupt_store_is_retrained() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let (old, _) = ModelTrainer::default().train(&synthetic_table()).unwrap();
        store.save(&old).unwrap();
        fs::write(dir.path().join("model.json"), b"{}").unwrap();

        let service = service_with(&store, Arc::new(synthetic_table()));
        let result = service.predict(&sample_row()).unwrap();

        assert!((0.0..=1.0).contains(&result.probability));
        assert_eq!(service.training_runs(), 1);
        let fresh = store.load().unwrap();
        assert_ne!(fresh.run_id(), old.run_id());
    }

    #[test]
    fn test_corrupt_store_is_reported_when_retraining_is_off() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let (bundle, _) = ModelTrainer::default().train(&synthetic_table()).unwrap();
        store.save(&bundle).unwrap();
        fs::remove_file(dir.path().join("scaler.json")).unwrap();

        let service = PredictionService::new(
            Arc::new(store),
            Arc::new(synthetic_table()),
            ServiceConfig::default().with_retrain_on_corrupt(false),
        );
        assert!(matches!(
            service.ensure_ready(),
            Err(ServiceError::ArtifactCorrupt(ArtifactCorruptError::MissingMember("scaler")))
        ));
        assert_eq!(service.training_runs(), 0);
    }

    struct PanicOnceSource {
        panicked: AtomicBool,
    }

    impl TableSource for PanicOnceSource {
        fn load_table(&self) -> Result<RawTable, DataError> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("source exploded");
            }
            Ok(synthetic_table())
        }
    }

    #[test]
    fn test_leader_panic_releases_the_slot() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let service =
            service_with(&store, Arc::new(PanicOnceSource { panicked: AtomicBool::new(false) }));

        let first = panic::catch_unwind(AssertUnwindSafe(|| service.ensure_ready()));
        assert!(first.is_err());

        assert!(service.ensure_ready().is_ok());
        assert_eq!(service.training_runs(), 2);
    }

    #[test]
    fn test_unseen_category_uses_fallback_code() {
        let (_dir, service) = fresh_service(Arc::new(synthetic_table()));
        let mut unseen = sample_row();
        unseen.insert("Brand_Preference".to_string(), Scalar::from("D"));
        let mut fallback = sample_row();
        fallback.insert("Brand_Preference".to_string(), Scalar::from("A"));

        let result = service.predict(&unseen).unwrap();
        assert!((0.0..=1.0).contains(&result.probability));
        assert_eq!(service.drift_stats().unknown_categories, 1);

        // "A" holds code 0, the fallback
        assert_eq!(result, service.predict(&fallback).unwrap());
        assert_eq!(service.drift_stats().unknown_categories, 1);
    }

    #[test]
    fn test_missing_column_keeps_result_shape() {
        let (_dir, service) = fresh_service(Arc::new(synthetic_table()));
        let complete = service.predict(&sample_row()).unwrap();
        let mut partial = sample_row();
        partial.remove("Preferred_OS");

        let first = service.predict(&partial).unwrap();
        let second = service.predict(&partial).unwrap();

        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first.probability));
        assert_eq!(first.ranked_importances, complete.ranked_importances);
        assert_eq!(service.drift_stats().missing_columns, 2);
    }

    #[test]
    fn test_align_ignores_field_order_and_extras() {
        let (bundle, _) = ModelTrainer::default().train(&synthetic_table()).unwrap();
        let fields = [
            ("Online_Activity_Score", Scalar::Int(64)),
            ("Tech_Savvy", Scalar::Bool(true)),
            ("Preferred_OS", Scalar::from("iOS")),
            ("Brand_Preference", Scalar::from("B")),
            ("Income", Scalar::Float(72_000.0)),
            ("Age", Scalar::Int(27)),
        ];
        let forward: RawRow = fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        let mut backward: RawRow =
            fields.iter().rev().map(|(k, v)| (k.to_string(), v.clone())).collect();
        backward.insert("Phone_Color".to_string(), Scalar::from("blue"));
        backward.insert("User_ID".to_string(), Scalar::Int(7));

        let a = align(&forward, bundle.column_order(), bundle.encoder());
        let b = align(&backward, bundle.column_order(), bundle.encoder());

        assert_eq!(a.values, b.values);
        assert_eq!(a.values, vec![27.0, 72_000.0, 1.0, 1.0, 1.0, 64.0]);
        assert!(a.ignored.is_empty());
        assert_eq!(b.ignored, ["Phone_Color", "User_ID"]);
    }

    #[test]
    fn test_align_defaults_for_missing_and_unparseable() {
        let (bundle, _) = ModelTrainer::default().train(&synthetic_table()).unwrap();
        let row = RawRow::from([
            ("Age".to_string(), Scalar::from("not a number")),
            ("Preferred_OS".to_string(), Scalar::Null),
            ("Brand_Preference".to_string(), Scalar::from("Z")),
        ]);

        let aligned = align(&row, bundle.column_order(), bundle.encoder());

        assert_eq!(aligned.values, vec![0.0; 6]);
        assert_eq!(
            aligned.missing,
            ["Age", "Income", "Preferred_OS", "Tech_Savvy", "Online_Activity_Score"]
        );
        assert_eq!(
            aligned.unknown_categories,
            vec![("Brand_Preference".to_string(), "Z".to_string())]
        );
    }

    #[test]
    fn test_align_blank_category_matches_blank_training_cell() {
        let mut csv_content = String::from("Age,Income,Brand_Preference,Purchased\n");
        for i in 0..40 {
            let brand = if i % 4 == 0 { "" } else { ["A", "B", "C"][i % 3] };
            csv_content.push_str(&format!("{},{},{},{}\n", 20 + i, 30_000 + 1_000 * i, brand, i % 2));
        }
        let table = read_table(csv_content.as_bytes()).unwrap();
        let (bundle, _) = ModelTrainer::default().train(&table).unwrap();

        let blank_code = bundle.encoder().lookup("Brand_Preference", MISSING_CATEGORY);
        assert_eq!(blank_code, Some(3));

        for blank in ["", "   "] {
            let row = RawRow::from([
                ("Age".to_string(), Scalar::Int(30)),
                ("Income".to_string(), Scalar::Int(40_000)),
                ("Brand_Preference".to_string(), Scalar::from(blank)),
            ]);
            let aligned = align(&row, bundle.column_order(), bundle.encoder());
            assert_eq!(aligned.values, vec![30.0, 40_000.0, 3.0]);
            assert!(aligned.missing.is_empty());
            assert!(aligned.unknown_categories.is_empty());
        }

        // null is absent, not blank
        let row = RawRow::from([("Brand_Preference".to_string(), Scalar::Null)]);
        let aligned = align(&row, bundle.column_order(), bundle.encoder());
        assert_eq!(aligned.values[2], f64::from(FALLBACK_CODE));
        assert_eq!(aligned.missing, ["Age", "Income", "Brand_Preference"]);
    }

    #[test]
    fn test_align_blank_category_without_blank_training_cells() {
        let (bundle, _) = ModelTrainer::default().train(&synthetic_table()).unwrap();
        let mut row = sample_row();
        row.insert("Brand_Preference".to_string(), Scalar::from(""));

        let aligned = align(&row, bundle.column_order(), bundle.encoder());

        assert_eq!(aligned.values[2], f64::from(FALLBACK_CODE));
        assert_eq!(aligned.missing, ["Brand_Preference"]);
        assert!(aligned.unknown_categories.is_empty());
    }

    #[test]
    fn test_rank_importances_order() {
        let order = ColumnOrder::new(["Income", "Age", "Brand_Preference", "Tech_Savvy"]);
        let ranked = rank_importances(&order, &[0.2, 0.4, 0.2, 0.2]);
        let names: Vec<&str> = ranked.iter().map(|f| f.feature.as_str()).collect();

        assert_eq!(names, ["Age", "Brand_Preference", "Income", "Tech_Savvy"]);
        assert!(ranked.windows(2).all(|w| w[0].importance >= w[1].importance));
    }

    #[test]
    fn test_importance_ranking_matches_model() {
        let (_dir, service) = fresh_service(Arc::new(synthetic_table()));
        let ranking = service.importance_ranking().unwrap();
        let total: f64 = ranking.iter().map(|f| f.importance).sum();

        assert_eq!(ranking.len(), 6);
        assert!((total - 1.0).abs() < 1e-9);
        assert!(ranking.windows(2).all(|w| w[0].importance >= w[1].importance));
    }

    #[test]
    fn test_data_summary_positive_rate() {
        let source = Arc::new(SlowSource::new(synthetic_table(), Duration::ZERO));
        let (_dir, service) = fresh_service(source);

        let summary = service.data_summary().unwrap();

        assert_eq!(summary.record_count, SYNTHETIC_ROWS);
        assert_eq!(summary.positive_rate, Some(0.40));
        assert_eq!(summary.counts("Brand_Preference").unwrap().len(), 3);
        assert_eq!(summary.counts("Preferred_OS").unwrap().len(), 2);
        assert!(service.current_bundle().is_none());
        assert_eq!(service.training_runs(), 0);
    }

    #[test]
    fn test_summary_statistics_skips_target_and_identifier() {
        let (_dir, service) = fresh_service(Arc::new(synthetic_table()));
        let table = RawTable::new(vec![
            Column::numeric("User_ID", vec![1.0, 2.0]),
            Column::numeric("Age", vec![30.0, 40.0]),
            Column::numeric("Purchased", vec![0.0, 1.0]),
        ])
        .unwrap();

        let summary = service.summary_statistics(&table);
        assert_eq!(summary.positive_rate, Some(0.5));
        assert_eq!(summary.features.keys().collect::<Vec<_>>(), ["Age"]);
    }
}
