use chrono::NaiveDate;
use tracing::debug;

use crate::errors::RangeError;
use crate::records::{Dataset, Transaction};

/// Closed interval of purchase dates selected for one interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// The selector's default: every date the dataset spans.
    pub fn full(dataset: &Dataset) -> Self {
        Self {
            start: dataset.min_date(),
            end: dataset.max_date(),
        }
    }

    /// Builds a selection bounded by the dataset span, defaulting either end to that span.
    pub fn within(
        dataset: &Dataset,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, RangeError> {
        let (min, max) = (dataset.min_date(), dataset.max_date());
        let range = Self::new(start.unwrap_or(min), end.unwrap_or(max))?;
        if range.start < min || range.end > max {
            return Err(RangeError::OutOfBounds {
                start: range.start,
                end: range.end,
                min,
                max,
            });
        }
        Ok(range)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Rows whose purchase date, ignoring time of day, falls in `range`.
pub fn filter_range<'a>(rows: &'a [Transaction], range: &DateRange) -> Vec<&'a Transaction> {
    let kept: Vec<&Transaction> = rows
        .iter()
        .filter(|row| range.contains(row.purchase_date()))
        .collect();
    debug!(
        start = %range.start,
        end = %range.end,
        kept = kept.len(),
        total = rows.len(),
        "applied date range"
    );
    kept
}
