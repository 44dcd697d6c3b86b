//! Training history and early stopping

use std::fmt;

/// Per-epoch training loss history with best-epoch tracking
#[derive(Debug, Clone)]
pub struct TrainingHistory {
    /// Mean training loss of each completed epoch
    pub losses: Vec<f64>,
    pub best_loss: f64,
    pub best_epoch: usize,
    /// Epoch (0-based) at which early stopping halted training
    pub stopped_epoch: Option<usize>,
}

impl Default for TrainingHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingHistory {
    pub fn new() -> Self {
        TrainingHistory {
            losses: Vec::new(),
            best_loss: f64::INFINITY,
            best_epoch: 0,
            stopped_epoch: None,
        }
    }

    /// Record the loss of `epoch`. Returns true when it is a new best.
    pub fn record_epoch(&mut self, epoch: usize, loss: f64) -> bool {
        self.losses.push(loss);

        if loss < self.best_loss {
            self.best_loss = loss;
            self.best_epoch = epoch;
            true
        } else {
            false
        }
    }

    /// True once `patience` epochs have passed without improving on the best loss
    pub fn should_early_stop(&self, patience: usize) -> bool {
        let Some(current_epoch) = self.losses.len().checked_sub(1) else {
            return false;
        };
        current_epoch > self.best_epoch && current_epoch - self.best_epoch >= patience
    }

    /// Number of completed epochs
    pub fn epochs_run(&self) -> usize {
        self.losses.len()
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }

    pub fn stopped_early(&self) -> bool {
        self.stopped_epoch.is_some()
    }

    /// Get improvement from last epoch
    pub fn last_improvement(&self) -> Option<f64> {
        if self.losses.len() < 2 {
            return None;
        }
        let n = self.losses.len();
        Some(self.losses[n - 2] - self.losses[n - 1])
    }
}

impl fmt::Display for TrainingHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} epochs, best loss {:.6} at epoch {}",
            self.epochs_run(),
            self.best_loss,
            self.best_epoch + 1
        )?;
        if let Some(stopped) = self.stopped_epoch {
            write!(f, " (stopped early at epoch {})", stopped + 1)?;
        }
        Ok(())
    }
}
