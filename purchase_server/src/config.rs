//! Configuration module

use std::env;
use std::path::PathBuf;

use purchase::{ServiceConfig, TrainerConfig};

/// Server configuration, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Listening port
    pub port: u16,

    /// Training data CSV
    pub data_path: PathBuf,

    /// Directory holding the artifact bundle
    pub artifact_dir: PathBuf,

    pub target_column: String,

    /// Identifier columns never used as features
    pub excluded_columns: Vec<String>,

    /// Retrain instead of failing when the stored bundle is corrupt
    pub retrain_on_corrupt: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(5000),

            data_path: lookup("DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/smartphone_purchase_data.csv")),

            artifact_dir: lookup("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models")),

            target_column: lookup("TARGET_COLUMN").unwrap_or_else(|| "Purchased".to_string()),

            excluded_columns: lookup("EXCLUDED_COLUMNS")
                .map(|raw| {
                    raw.split(',').map(str::trim).filter(|c| !c.is_empty()).map(String::from).collect()
                })
                .unwrap_or_else(|| vec!["User_ID".to_string()]),

            retrain_on_corrupt: lookup("RETRAIN_ON_CORRUPT").and_then(|v| parse_flag(&v)).unwrap_or(true),
        }
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig::default()
            .with_target_column(&self.target_column)
            .with_excluded_columns(&self.excluded_columns)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::default()
            .with_trainer(self.trainer_config())
            .with_retrain_on_corrupt(self.retrain_on_corrupt)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 5000);
        assert_eq!(config.data_path, PathBuf::from("data/smartphone_purchase_data.csv"));
        assert_eq!(config.artifact_dir, PathBuf::from("models"));
        assert_eq!(config.target_column, "Purchased");
        assert_eq!(config.excluded_columns, ["User_ID"]);
        assert!(config.retrain_on_corrupt);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8081"),
            ("ARTIFACT_DIR", "/var/lib/purchase"),
            ("EXCLUDED_COLUMNS", "User_ID, Session_ID,"),
            ("RETRAIN_ON_CORRUPT", "off"),
        ]);
        assert_eq!(config.port, 8081);
        assert_eq!(config.artifact_dir, PathBuf::from("/var/lib/purchase"));
        assert_eq!(config.excluded_columns, ["User_ID", "Session_ID"]);
        assert!(!config.retrain_on_corrupt);
        assert!(!config.service_config().retrain_on_corrupt());
        assert_eq!(config.trainer_config().excluded_columns(), ["User_ID", "Session_ID"]);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[("PORT", "http"), ("RETRAIN_ON_CORRUPT", "maybe")]);
        assert_eq!(config.port, 5000);
        assert!(config.retrain_on_corrupt);
    }
}
