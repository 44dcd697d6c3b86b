//! Transaction amount forecasting using deep learning
//!
//! An LSTM sequence model trained on historical bank transactions, used to
//! forecast future transaction amounts and classify their trend.

pub mod auth;
pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::predict::forecaster::Perturbation;

/// A single bank transaction as read from the input dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub sender: String,
    pub transaction_type: String,
    pub transaction_amount: f64,
    pub balance: f64,
}

/// Directional trend of a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Positive,
    Negative,
}

impl Trend {
    /// Classify a fitted slope. A flat slope counts as negative.
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            Trend::Positive
        } else {
            Trend::Negative
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Positive => write!(f, "Positive"),
            Trend::Negative => write!(f, "Negative"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Malformed value on row {row}: {message}")]
    Parse { row: usize, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Not enough history: have {records} records, need more than {window}")]
    InsufficientHistory { records: usize, window: usize },

    #[error("No training windows available")]
    NoTrainingWindows,

    #[error("Training failed at epoch {epoch}: loss is {loss}")]
    TrainingFailed { epoch: usize, loss: f64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ForecastError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seed for parameter init, dropout, batch shuffling and forecast perturbation
    pub seed: u64,
    pub training: TrainingConfig,
    pub model: ModelConfig,
    pub forecast: ForecastConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub dropout: f64,
    pub early_stopping_patience: usize,
    pub shuffle: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub hidden_size: usize,
    pub window_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Number of future steps
    pub horizon: usize,
    /// Independent generation passes averaged together
    pub repeats: usize,
    /// Value written to non-target channels of fed-back steps
    pub placeholder: f32,
    pub perturbation: Perturbation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub input_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,
    /// Salted bcrypt hash of the password
    pub password_bcrypt: Option<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 50,
            batch_size: 90,
            learning_rate: 1e-3,
            dropout: 0.2,
            early_stopping_patience: 10,
            shuffle: true,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            hidden_size: 50,
            window_size: 60,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            horizon: 90,
            repeats: 5,
            placeholder: 0.0,
            perturbation: Perturbation::Gaussian { std_dev: 0.01 },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            seed: 42,
            training: TrainingConfig::default(),
            model: ModelConfig::default(),
            forecast: ForecastConfig::default(),
            data: DataConfig {
                input_path: "synthetic_bank_transactions.csv".to_string(),
            },
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ForecastError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ForecastError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.model.window_size == 0 {
            return Err(ForecastError::Config("model.window_size must be at least 1".into()));
        }
        if self.model.hidden_size == 0 {
            return Err(ForecastError::Config("model.hidden_size must be at least 1".into()));
        }
        if self.training.epochs == 0 {
            return Err(ForecastError::Config("training.epochs must be at least 1".into()));
        }
        if self.training.batch_size == 0 {
            return Err(ForecastError::Config("training.batch_size must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&self.training.dropout) {
            return Err(ForecastError::Config(format!(
                "training.dropout must be in [0, 1), got {}",
                self.training.dropout
            )));
        }
        if self.forecast.horizon == 0 {
            return Err(ForecastError::Config("forecast.horizon must be at least 1".into()));
        }
        if self.forecast.repeats == 0 {
            return Err(ForecastError::Config("forecast.repeats must be at least 1".into()));
        }
        if let Perturbation::Gaussian { std_dev } = self.forecast.perturbation {
            if !std_dev.is_finite() || std_dev < 0.0 {
                return Err(ForecastError::Config(format!(
                    "forecast.perturbation.std_dev must be a non-negative number, got {}",
                    std_dev
                )));
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_from_slope() {
        assert_eq!(Trend::from_slope(0.5), Trend::Positive);
        assert_eq!(Trend::from_slope(-0.5), Trend::Negative);
        assert_eq!(Trend::from_slope(0.0), Trend::Negative);
        assert_eq!(Trend::Positive.to_string(), "Positive");
    }

    #[test]
    fn test_config_roundtrip_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.forecast.perturbation = Perturbation::None;
        config.save(path).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded.seed, 42);
        assert_eq!(loaded.model.window_size, 60);
        assert_eq!(loaded.forecast.horizon, 90);
        assert_eq!(loaded.forecast.perturbation, Perturbation::None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.forecast.repeats = 0;
        assert!(matches!(config.validate(), Err(ForecastError::Config(_))));

        let mut config = Config::default();
        config.training.dropout = 1.0;
        assert!(config.validate().is_err());
    }
}
