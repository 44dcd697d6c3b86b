//! Min-max scaling of continuous attributes
//!
//! The scaler is fit once over the full dataset and then reused unchanged for
//! both forward scaling and rescaling of forecasts.

use serde::{Deserialize, Serialize};

/// Observed range of one continuous attribute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxRange {
    pub min: f64,
    pub max: f64,
}

impl MinMaxRange {
    /// Fit to the finite values in `values`. An empty input yields `0..0`.
    pub fn fit(values: &[f64]) -> Self {
        let mut finite = values.iter().copied().filter(|v| v.is_finite());
        let Some(first) = finite.next() else {
            return MinMaxRange { min: 0.0, max: 0.0 };
        };
        let (min, max) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        MinMaxRange { min, max }
    }

    /// True when every fitted value was identical
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// `(x - min) / (max - min)`; a degenerate range maps everything to 0
    pub fn scale(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }

    /// Inverse of [`scale`](Self::scale); a degenerate range maps back to `min`
    pub fn inverse(&self, scaled: f64) -> f64 {
        if self.is_degenerate() {
            self.min
        } else {
            scaled * (self.max - self.min) + self.min
        }
    }
}

/// Fitted per-attribute ranges (the scaler state of one forecasting run)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    columns: Vec<(String, MinMaxRange)>,
}

impl MinMaxScaler {
    /// Fit one range per named column
    pub fn fit(columns: &[(&str, &[f64])]) -> Self {
        let columns = columns
            .iter()
            .map(|(name, values)| {
                let range = MinMaxRange::fit(values);
                if range.is_degenerate() {
                    log::warn!(
                        "Column {} has a constant value ({}); it will scale to 0",
                        name,
                        range.min
                    );
                }
                (name.to_string(), range)
            })
            .collect();
        MinMaxScaler { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Range fitted for column `index`
    pub fn range(&self, index: usize) -> Option<MinMaxRange> {
        self.columns.get(index).map(|(_, range)| *range)
    }

    /// Position of a named column
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    /// Scale a full row of continuous values (one per fitted column)
    pub fn transform_row(&self, values: &[f64]) -> Vec<f64> {
        self.columns
            .iter()
            .zip(values)
            .map(|((_, range), v)| range.scale(*v))
            .collect()
    }

    /// Rescale model outputs of one column back to original units.
    ///
    /// Only the requested column is inverted; the other columns play no part.
    ///
    /// # Panics
    /// Panics if `index` is not a fitted column.
    pub fn inverse_column(&self, index: usize, scaled: &[f32]) -> Vec<f64> {
        let range = self.columns[index].1;
        scaled.iter().map(|&s| range.inverse(s as f64)).collect()
    }
}
