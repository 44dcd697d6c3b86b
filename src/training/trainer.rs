//! Training loop for the LSTM regressor
//!
//! Mean squared error on the scaled target, Adam updates, and early stopping
//! on the training loss with rollback to the best epoch's parameters.

use burn::data::dataloader::DataLoaderBuilder;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};

use crate::data::dataset::{WindowBatch, WindowBatcher, WindowDataset};
use crate::model::lstm::{LSTMConfig, LSTMRegressor};
use crate::training::metrics::TrainingHistory;
use crate::training::progress::{EpochProgress, ProgressObserver};
use crate::{ForecastError, Result, TrainingConfig};

/// Mean squared error between predictions [batch, 1] and targets [batch]
pub fn mse_loss<B: Backend>(predictions: Tensor<B, 2>, targets: Tensor<B, 1>) -> Tensor<B, 1> {
    let targets = targets.unsqueeze_dim(1);
    (predictions - targets).powf_scalar(2.0).mean()
}

/// Trainer for the LSTM regressor
pub struct LSTMTrainer<B: AutodiffBackend> {
    model: LSTMRegressor<B>,
    optimizer: burn::optim::adaptor::OptimizerAdaptor<burn::optim::Adam, LSTMRegressor<B>, B>,
    config: TrainingConfig,
    seed: u64,
    device: B::Device,
}

impl<B: AutodiffBackend> LSTMTrainer<B> {
    /// Create a new trainer.
    ///
    /// Seeds the backend RNG before the model is built so parameter
    /// initialization and dropout masks are reproducible for a given seed.
    pub fn new(device: B::Device, model_config: &LSTMConfig, config: TrainingConfig, seed: u64) -> Self {
        <B as Backend>::seed(seed);

        let model = LSTMRegressor::new(&device, model_config);
        let optimizer = AdamConfig::new().init();

        LSTMTrainer {
            model,
            optimizer,
            config,
            seed,
            device,
        }
    }

    /// Train the model and return the best-loss snapshot with its history.
    ///
    /// Afterwards [`model`](Self::model) holds the last epoch's parameters.
    pub fn train<O>(
        &mut self,
        dataset: WindowDataset,
        observer: &mut O,
    ) -> Result<(LSTMRegressor<B>, TrainingHistory)>
    where
        O: ProgressObserver + ?Sized,
    {
        if dataset.is_empty() {
            return Err(ForecastError::NoTrainingWindows);
        }

        let window_count = dataset.len();
        let batch_size = self.config.batch_size.clamp(1, window_count);
        let epochs = self.config.epochs;
        let patience = self.config.early_stopping_patience;

        let batcher = WindowBatcher::<B>::new(self.device.clone());
        let mut builder = DataLoaderBuilder::new(batcher).batch_size(batch_size);
        if self.config.shuffle {
            builder = builder.shuffle(self.seed);
        }
        let loader = builder.build(dataset);

        let mut history = TrainingHistory::new();
        let mut best_model = self.model.clone();

        log::info!(
            "Starting LSTM training for {} epochs on {} windows (batch size {})",
            epochs,
            window_count,
            batch_size
        );

        for epoch in 0..epochs {
            let loss = self.train_epoch(loader.iter());

            if !loss.is_finite() {
                log::error!("Loss diverged at epoch {}: {}", epoch + 1, loss);
                return Err(ForecastError::TrainingFailed {
                    epoch: epoch + 1,
                    loss,
                });
            }

            if history.record_epoch(epoch, loss) {
                best_model = self.model.clone();
                log::debug!("  New best model (loss: {:.6})", loss);
            }

            observer.on_epoch_end(&EpochProgress {
                epoch: epoch + 1,
                total_epochs: epochs,
                loss,
            });

            if history.should_early_stop(patience) {
                history.stopped_epoch = Some(epoch);
                log::info!(
                    "Early stopping at epoch {} (best was epoch {})",
                    epoch + 1,
                    history.best_epoch + 1
                );
                observer.on_early_stop(epoch + 1, history.best_epoch + 1);
                break;
            }
        }

        log::info!("Training complete: {}", history);

        Ok((best_model, history))
    }

    /// Train one epoch, returning the window-weighted mean loss
    fn train_epoch(&mut self, loader: impl Iterator<Item = WindowBatch<B>>) -> f64 {
        let mut loss_sum = 0.0f64;
        let mut seen = 0usize;

        for batch in loader {
            let batch_size = batch.targets.dims()[0];

            // Forward pass
            let predictions = self.model.forward(batch.inputs);
            let loss = mse_loss(predictions, batch.targets);

            // Get loss value before backward pass
            let loss_val: f32 = loss.clone().into_scalar().elem();

            // Backward pass
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);

            // Update weights
            self.model = self
                .optimizer
                .step(self.config.learning_rate, self.model.clone(), grads);

            loss_sum += loss_val as f64 * batch_size as f64;
            seen += batch_size;
        }

        if seen == 0 {
            f64::NAN
        } else {
            loss_sum / seen as f64
        }
    }

    /// Model as of the last completed epoch
    pub fn model(&self) -> &LSTMRegressor<B> {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::backend_guard;
    use crate::training::progress::NoProgress;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    #[derive(Default)]
    struct Recorder {
        epochs: Vec<EpochProgress>,
        early_stop: Option<(usize, usize)>,
    }

    impl ProgressObserver for Recorder {
        fn on_epoch_end(&mut self, progress: &EpochProgress) {
            self.epochs.push(*progress);
        }

        fn on_early_stop(&mut self, epoch: usize, best_epoch: usize) {
            self.early_stop = Some((epoch, best_epoch));
        }
    }

    /// Sine-like target in channel 0, a ramp in channel 1
    fn toy_dataset(rows: usize, window: usize) -> WindowDataset {
        let data: Vec<Vec<f32>> = (0..rows)
            .map(|i| {
                let t = i as f32;
                vec![0.5 + 0.4 * (t * 0.3).sin(), t / rows as f32]
            })
            .collect();
        WindowDataset::from_rows(&data, window, 0)
    }

    fn config(epochs: usize) -> TrainingConfig {
        TrainingConfig {
            epochs,
            batch_size: 16,
            learning_rate: 1e-2,
            dropout: 0.2,
            early_stopping_patience: 10,
            shuffle: true,
        }
    }

    #[test]
    fn test_mse_loss() {
        let device = Default::default();
        let predictions = Tensor::<NdArray<f32>, 1>::from_floats([1.0, 2.0, 3.0], &device).reshape([3, 1]);
        let targets = Tensor::<NdArray<f32>, 1>::from_floats([1.0, 0.0, 5.0], &device);

        let loss: f32 = mse_loss(predictions, targets).into_scalar().elem();
        assert!((loss - 8.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_training_reports_every_epoch() {
        let _guard = backend_guard();
        let device = Default::default();
        let mut trainer = LSTMTrainer::<TestBackend>::new(device, &LSTMConfig::new(2, 8, 0.2), config(5), 7);

        let mut recorder = Recorder::default();
        let (_, history) = trainer.train(toy_dataset(40, 6), &mut recorder).unwrap();

        assert_eq!(history.epochs_run(), 5);
        assert_eq!(recorder.epochs.len(), 5);
        assert_eq!(recorder.epochs[0].epoch, 1);
        assert_eq!(recorder.epochs[4].fraction(), 1.0);
        assert!(recorder.epochs.iter().all(|p| p.loss.is_finite()));
        assert!(recorder.early_stop.is_none());
    }

    #[test]
    fn test_training_reduces_loss() {
        let _guard = backend_guard();
        let device = Default::default();
        let mut cfg = config(30);
        cfg.dropout = 0.0;
        let mut trainer = LSTMTrainer::<TestBackend>::new(device, &LSTMConfig::new(2, 8, 0.0), cfg, 3);

        let (_, history) = trainer.train(toy_dataset(60, 8), &mut NoProgress).unwrap();

        assert!(history.best_loss < history.losses[0]);
    }

    #[test]
    fn test_plateau_triggers_early_stop() {
        let _guard = backend_guard();
        let device = Default::default();
        // Zero learning rate and no dropout: every epoch sees the same loss
        let cfg = TrainingConfig {
            epochs: 50,
            batch_size: 64,
            learning_rate: 0.0,
            dropout: 0.0,
            early_stopping_patience: 3,
            shuffle: false,
        };
        let mut trainer = LSTMTrainer::<TestBackend>::new(device, &LSTMConfig::new(2, 4, 0.0), cfg, 11);

        let mut recorder = Recorder::default();
        let (_, history) = trainer.train(toy_dataset(30, 5), &mut recorder).unwrap();

        assert_eq!(history.best_epoch, 0);
        assert_eq!(history.stopped_epoch, Some(3));
        assert_eq!(history.epochs_run(), 4);
        assert_eq!(recorder.early_stop, Some((4, 1)));
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let _guard = backend_guard();
        let device = Default::default();

        let run = || {
            let mut trainer =
                LSTMTrainer::<TestBackend>::new(device, &LSTMConfig::new(2, 8, 0.2), config(4), 42);
            trainer.train(toy_dataset(40, 6), &mut NoProgress).unwrap()
        };

        let (model_a, history_a) = run();
        let (model_b, history_b) = run();

        assert_eq!(history_a.losses, history_b.losses);
        assert_eq!(model_a.parameter_values(), model_b.parameter_values());
    }

    #[test]
    fn test_returns_best_snapshot_not_last_epoch() {
        let _guard = backend_guard();
        let device = Default::default();
        let dataset = || toy_dataset(30, 5);
        // One full batch per epoch; a huge step size overshoots after the first update
        let cfg = |epochs| TrainingConfig {
            epochs,
            batch_size: 64,
            learning_rate: 50.0,
            dropout: 0.0,
            early_stopping_patience: 100,
            shuffle: false,
        };
        let model_config = LSTMConfig::new(2, 4, 0.0);

        let mut trainer = LSTMTrainer::<TestBackend>::new(device, &model_config, cfg(6), 5);
        let (best, history) = trainer.train(dataset(), &mut NoProgress).unwrap();

        assert_eq!(history.epochs_run(), 6);
        assert!(history.best_epoch + 1 < history.epochs_run());
        assert!(history.final_loss() > Some(history.best_loss));

        // Replaying up to the best epoch reproduces the returned parameters
        let mut replay =
            LSTMTrainer::<TestBackend>::new(device, &model_config, cfg(history.best_epoch + 1), 5);
        replay.train(dataset(), &mut NoProgress).unwrap();

        assert_eq!(best.parameter_values(), replay.model().parameter_values());
        assert_ne!(best.parameter_values(), trainer.model().parameter_values());
    }

    #[test]
    fn test_divergence_is_fatal() {
        let _guard = backend_guard();
        let device = Default::default();
        let mut cfg = config(5);
        cfg.learning_rate = f64::NAN;
        let mut trainer = LSTMTrainer::<TestBackend>::new(device, &LSTMConfig::new(2, 4, 0.0), cfg, 1);

        let err = trainer.train(toy_dataset(30, 5), &mut NoProgress).unwrap_err();
        assert!(matches!(err, ForecastError::TrainingFailed { .. }));
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let _guard = backend_guard();
        let device = Default::default();
        let mut trainer = LSTMTrainer::<TestBackend>::new(device, &LSTMConfig::new(2, 4, 0.0), config(5), 1);

        let err = trainer.train(WindowDataset::default(), &mut NoProgress).unwrap_err();
        assert!(matches!(err, ForecastError::NoTrainingWindows));
    }
}
