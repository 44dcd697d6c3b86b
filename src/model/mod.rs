//! Neural network architecture
//!
//! Recurrent regressor over windows of encoded transactions.

pub mod lstm;

pub use lstm::{LSTMConfig, LSTMRegressor};
