//! Calendar feature extraction
//!
//! Integer-valued date components used as unscaled model inputs.

use chrono::{Datelike, NaiveDate};

/// Calendar components of a transaction date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    /// 0 = Monday ... 6 = Sunday
    pub day_of_week: u32,
    /// 1..=12
    pub month: u32,
    /// Day of month, 1..=31
    pub day: u32,
}

impl CalendarFeatures {
    /// Number of columns produced
    pub const DIM: usize = 3;

    /// Column names, in [`to_vec`](Self::to_vec) order
    pub const NAMES: [&'static str; Self::DIM] = ["day_of_week", "month", "day"];

    pub fn from_date(date: NaiveDate) -> Self {
        CalendarFeatures {
            day_of_week: date.weekday().num_days_from_monday(),
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn to_vec(&self) -> Vec<f32> {
        vec![self.day_of_week as f32, self.month as f32, self.day as f32]
    }
}
