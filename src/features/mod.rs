//! Feature extraction and encoding
//!
//! Converts raw transaction records into model-ready features.

pub mod calendar;
pub mod encoding;
pub mod scaling;

pub use calendar::CalendarFeatures;
pub use encoding::{FeatureEncoder, FeatureMatrix, OneHotVocabulary};
pub use scaling::{MinMaxRange, MinMaxScaler};
