use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use purchase::{DataSummary, FeatureSummary};
use serde::Serialize;

use crate::app::AppState;
use crate::error::AppResult;

const AGE: &str = "Age";
const BRAND: &str = "Brand_Preference";
const OS: &str = "Preferred_OS";
const TECH_SAVVY: &str = "Tech_Savvy";

#[derive(Debug, Serialize, PartialEq)]
pub struct AgeDistribution {
    mean: f64,
    min: f64,
    max: f64,
}

/// Dashboard view of the training data. Fields whose column is absent from
/// the dataset are `null`.
#[derive(Debug, Serialize, PartialEq)]
pub struct DashboardSummary {
    total_records: usize,
    purchase_rate: Option<f64>,
    age_distribution: Option<AgeDistribution>,
    brand_distribution: Option<BTreeMap<String, usize>>,
    os_distribution: Option<BTreeMap<String, usize>>,
    tech_savvy_rate: Option<f64>,
}

impl From<&DataSummary> for DashboardSummary {
    fn from(summary: &DataSummary) -> Self {
        let age_distribution = match summary.feature(AGE) {
            Some(FeatureSummary::Numeric { mean, min, max, .. }) => {
                Some(AgeDistribution { mean: *mean, min: *min, max: *max })
            }
            _ => None,
        };
        DashboardSummary {
            total_records: summary.record_count,
            purchase_rate: summary.positive_rate,
            age_distribution,
            brand_distribution: summary.counts(BRAND).cloned(),
            os_distribution: summary.counts(OS).cloned(),
            tech_savvy_rate: summary.mean(TECH_SAVVY),
        }
    }
}

pub async fn data_summary(State(state): State<AppState>) -> AppResult<Json<DashboardSummary>> {
    let service = Arc::clone(&state.service);
    let summary = tokio::task::spawn_blocking(move || service.data_summary()).await??;
    Ok(Json(DashboardSummary::from(&summary)))
}
