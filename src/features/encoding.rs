//! Feature encoder
//!
//! Turns transaction records into fixed-width numeric rows:
//!
//! `[transaction_amount, balance, day_of_week, month, day, sender_*, transaction_type_*]`
//!
//! Continuous columns are min-max scaled, calendar columns stay as integers,
//! and each categorical attribute is one-hot encoded with its first (sorted)
//! level dropped as the reference.

use std::collections::BTreeSet;

use super::calendar::CalendarFeatures;
use super::scaling::MinMaxScaler;
use crate::TransactionRecord;

/// One-hot vocabulary for a single categorical attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneHotVocabulary {
    attribute: String,
    /// All observed levels, sorted; `levels[0]` is the dropped reference
    levels: Vec<String>,
}

impl OneHotVocabulary {
    /// Fit from the observed levels
    pub fn fit<'a>(attribute: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        let levels: BTreeSet<&str> = values.into_iter().collect();
        OneHotVocabulary {
            attribute: attribute.to_string(),
            levels: levels.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Reference level encoded as all zeros
    pub fn reference(&self) -> Option<&str> {
        self.levels.first().map(String::as_str)
    }

    /// Levels that get their own indicator column
    pub fn encoded_levels(&self) -> &[String] {
        self.levels.get(1..).unwrap_or(&[])
    }

    /// Number of indicator columns
    pub fn width(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Indicator column names, e.g. `sender_bob`
    pub fn column_names(&self) -> Vec<String> {
        self.encoded_levels()
            .iter()
            .map(|level| format!("{}_{}", self.attribute, level))
            .collect()
    }

    /// Indicator values for `level`. The reference level and unseen levels
    /// encode as all zeros.
    pub fn encode(&self, level: &str) -> Vec<f32> {
        self.encoded_levels()
            .iter()
            .map(|l| if l == level { 1.0 } else { 0.0 })
            .collect()
    }
}

/// Encoded rows with their column names
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f32>>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Values of one column, top to bottom
    pub fn column(&self, index: usize) -> Vec<f32> {
        self.rows.iter().map(|row| row[index]).collect()
    }
}

/// Fitted encoder: vocabularies and scaler state, frozen after [`fit`](Self::fit)
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEncoder {
    sender: OneHotVocabulary,
    transaction_type: OneHotVocabulary,
    scaler: MinMaxScaler,
}

impl FeatureEncoder {
    /// Column holding the scaled transaction amount (the forecast target)
    pub const TARGET_INDEX: usize = 0;

    /// Continuous columns, in scaler order
    pub const CONTINUOUS: [&'static str; 2] = ["transaction_amount", "balance"];

    /// Fit vocabularies and scaler over the full record set
    pub fn fit(records: &[TransactionRecord]) -> Self {
        let sender = OneHotVocabulary::fit("sender", records.iter().map(|r| r.sender.as_str()));
        let transaction_type = OneHotVocabulary::fit(
            "transaction_type",
            records.iter().map(|r| r.transaction_type.as_str()),
        );

        let amounts: Vec<f64> = records.iter().map(|r| r.transaction_amount).collect();
        let balances: Vec<f64> = records.iter().map(|r| r.balance).collect();
        let scaler = MinMaxScaler::fit(&[
            (Self::CONTINUOUS[0], amounts.as_slice()),
            (Self::CONTINUOUS[1], balances.as_slice()),
        ]);

        log::debug!(
            "Fitted encoder: {} sender levels (reference {:?}), {} transaction types (reference {:?})",
            sender.width() + 1,
            sender.reference(),
            transaction_type.width() + 1,
            transaction_type.reference()
        );

        FeatureEncoder {
            sender,
            transaction_type,
            scaler,
        }
    }

    /// Fit on `records` and encode them in one step
    pub fn fit_transform(records: &[TransactionRecord]) -> (Self, FeatureMatrix) {
        let encoder = Self::fit(records);
        let matrix = encoder.transform(records);
        (encoder, matrix)
    }

    /// Encode records with the frozen vocabularies and scaler
    pub fn transform(&self, records: &[TransactionRecord]) -> FeatureMatrix {
        FeatureMatrix {
            columns: self.column_names(),
            rows: records.iter().map(|r| self.encode(r)).collect(),
        }
    }

    /// Encode a single record
    pub fn encode(&self, record: &TransactionRecord) -> Vec<f32> {
        let mut row = Vec::with_capacity(self.feature_dim());

        let scaled = self
            .scaler
            .transform_row(&[record.transaction_amount, record.balance]);
        row.extend(scaled.into_iter().map(|v| v as f32));
        row.extend(CalendarFeatures::from_date(record.date).to_vec());
        row.extend(self.sender.encode(&record.sender));
        row.extend(self.transaction_type.encode(&record.transaction_type));

        row
    }

    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Self::CONTINUOUS.iter().map(|s| s.to_string()).collect();
        names.extend(CalendarFeatures::NAMES.iter().map(|s| s.to_string()));
        names.extend(self.sender.column_names());
        names.extend(self.transaction_type.column_names());
        names
    }

    /// Width of every encoded row
    pub fn feature_dim(&self) -> usize {
        Self::CONTINUOUS.len()
            + CalendarFeatures::DIM
            + self.sender.width()
            + self.transaction_type.width()
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    pub fn sender_vocabulary(&self) -> &OneHotVocabulary {
        &self.sender
    }

    pub fn transaction_type_vocabulary(&self) -> &OneHotVocabulary {
        &self.transaction_type
    }

    /// Rescale target-channel predictions to transaction-amount units
    pub fn rescale_target(&self, scaled: &[f32]) -> Vec<f64> {
        self.scaler.inverse_column(Self::TARGET_INDEX, scaled)
    }
}
