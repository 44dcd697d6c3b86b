//! Forecasting and trend analysis
//!
//! Roll a trained model forward over the horizon, rescale, and fit a trend.

pub mod forecaster;
pub mod pipeline;
pub mod trend;

pub use forecaster::{Forecast, IterativeForecaster, Perturbation};
pub use pipeline::{ForecastPipeline, ForecastReport, TrainingSummary};
pub use trend::{fit_trend, TrendFit};
