//! Training progress reporting
//!
//! The trainer hands read-only progress snapshots to an observer once per
//! epoch. Observers never see the model or the data.

use std::fmt;

/// Snapshot emitted after each full pass over the training windows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochProgress {
    /// 1-based epoch number
    pub epoch: usize,
    pub total_epochs: usize,
    /// Mean training loss of the epoch
    pub loss: f64,
}

impl EpochProgress {
    /// Completed fraction in [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.total_epochs == 0 {
            1.0
        } else {
            (self.epoch as f64 / self.total_epochs as f64).min(1.0)
        }
    }
}

impl fmt::Display for EpochProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Epoch {}/{}, Loss: {}", self.epoch, self.total_epochs, self.loss)
    }
}

/// Receives training progress
pub trait ProgressObserver {
    fn on_epoch_end(&mut self, progress: &EpochProgress);

    /// Training halted before the configured epoch count. Epochs are 1-based.
    fn on_early_stop(&mut self, _epoch: usize, _best_epoch: usize) {}
}

/// Writes progress through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_epoch_end(&mut self, progress: &EpochProgress) {
        if progress.epoch % 10 == 0 || progress.epoch == progress.total_epochs {
            log::info!("{}", progress);
        } else {
            log::debug!("{}", progress);
        }
    }

    fn on_early_stop(&mut self, epoch: usize, best_epoch: usize) {
        log::info!(
            "Early stopping triggered at epoch {} (best was epoch {})",
            epoch,
            best_epoch
        );
    }
}

/// Discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_epoch_end(&mut self, _progress: &EpochProgress) {}
}
