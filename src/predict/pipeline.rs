//! End-to-end forecasting run
//!
//! records -> encoder -> windows -> trained model -> iterative forecast ->
//! rescaled amounts -> trend. Every run owns its encoder, scaler and model.

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use serde::Serialize;
use std::marker::PhantomData;

use crate::data::dataset::WindowDataset;
use crate::features::encoding::FeatureEncoder;
use crate::model::lstm::LSTMConfig;
use crate::predict::forecaster::IterativeForecaster;
use crate::predict::trend::{fit_trend, TrendFit};
use crate::training::metrics::TrainingHistory;
use crate::training::progress::ProgressObserver;
use crate::training::trainer::LSTMTrainer;
use crate::{Config, ForecastError, Result, TransactionRecord};

/// Summary of the training phase
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub epochs_run: usize,
    /// 1-based
    pub best_epoch: usize,
    pub best_loss: f64,
    /// 1-based epoch at which early stopping halted training
    pub stopped_early_at: Option<usize>,
}

impl From<&TrainingHistory> for TrainingSummary {
    fn from(history: &TrainingHistory) -> Self {
        TrainingSummary {
            epochs_run: history.epochs_run(),
            best_epoch: history.best_epoch + 1,
            best_loss: history.best_loss,
            stopped_early_at: history.stopped_epoch.map(|e| e + 1),
        }
    }
}

/// Everything the presentation layer needs from one run
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    /// Forecast transaction amounts, one per future step
    pub forecast: Vec<f64>,
    pub trend: TrendFit,
    /// Last `window_size` observed amounts
    pub past: Vec<f64>,
    /// `past` followed by `forecast`
    pub combined: Vec<f64>,
    /// Index in `combined` of the last observed amount
    pub boundary_index: usize,
    /// Generation passes averaged into the forecast
    pub passes: usize,
    pub training: TrainingSummary,
}

/// Forecasting pipeline over one dataset
pub struct ForecastPipeline<B: AutodiffBackend> {
    config: Config,
    device: B::Device,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ForecastPipeline<B> {
    pub fn new(config: Config, device: B::Device) -> Self {
        ForecastPipeline {
            config,
            device,
            _backend: PhantomData,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Train on `records` and forecast the configured horizon
    pub fn run<O>(&self, records: &[TransactionRecord], observer: &mut O) -> Result<ForecastReport>
    where
        O: ProgressObserver + ?Sized,
    {
        self.config.validate()?;

        let window_size = self.config.model.window_size;
        if records.len() <= window_size {
            return Err(ForecastError::InsufficientHistory {
                records: records.len(),
                window: window_size,
            });
        }

        // Encoding
        let (encoder, matrix) = FeatureEncoder::fit_transform(records);
        log::info!(
            "Encoded {} records into {} features: {:?}",
            matrix.len(),
            matrix.width(),
            matrix.columns
        );

        // Windowing
        let dataset = WindowDataset::from_rows(&matrix.rows, window_size, FeatureEncoder::TARGET_INDEX);
        log::info!("Created {} windows of {} steps", dataset.len(), window_size);

        // The forecast starts from the most recent training window
        let last_window = dataset
            .last()
            .map(|window| window.steps.clone())
            .ok_or(ForecastError::NoTrainingWindows)?;

        // Training
        let model_config = LSTMConfig::new(
            encoder.feature_dim(),
            self.config.model.hidden_size,
            self.config.training.dropout,
        );
        let mut trainer = LSTMTrainer::<B>::new(
            self.device.clone(),
            &model_config,
            self.config.training.clone(),
            self.config.seed,
        );
        let (model, history) = trainer.train(dataset, observer)?;

        // Forecasting runs on the inner backend, where dropout is inactive
        let model = model.valid();
        let forecaster = IterativeForecaster::new(
            &self.config.forecast,
            FeatureEncoder::TARGET_INDEX,
            self.config.seed,
        );
        let forecast = forecaster.forecast(&model, &last_window, &self.device)?;

        // Rescaling and trend
        let amounts = encoder.rescale_target(&forecast.values);
        let trend = fit_trend(&amounts);
        log::info!(
            "The trend of future transactions is: {} (slope {:.4})",
            trend.trend,
            trend.slope
        );

        let past: Vec<f64> = records[records.len() - window_size..]
            .iter()
            .map(|r| r.transaction_amount)
            .collect();
        let combined: Vec<f64> = past.iter().chain(amounts.iter()).copied().collect();

        Ok(ForecastReport {
            forecast: amounts,
            trend,
            boundary_index: past.len() - 1,
            past,
            combined,
            passes: forecast.passes,
            training: TrainingSummary::from(&history),
        })
    }
}
