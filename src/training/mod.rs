//! Model training
//!
//! Training loop, early stopping, and progress reporting.

pub mod metrics;
pub mod progress;
pub mod trainer;

pub use metrics::TrainingHistory;
pub use progress::{EpochProgress, LogProgress, NoProgress, ProgressObserver};
pub use trainer::LSTMTrainer;
