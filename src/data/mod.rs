//! Data ingestion and windowing
//!
//! CSV loading of transaction records and the sliding-window dataset used
//! for training.

pub mod dataset;
pub mod loader;

pub use dataset::{create_windows, Window, WindowBatch, WindowBatcher, WindowDataset};
pub use loader::{load_transactions, read_transactions};
