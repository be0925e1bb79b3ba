use chrono::NaiveDateTime;
use std::{fmt, str::FromStr};
use tracing::debug;

use crate::aggregate::{AggregateTable, Measure, Ranking, SortOrder};
use crate::records::{parse_timestamp, Transaction};

pub const DEFAULT_TOP_N: usize = 5;

pub fn sellers_by_orders(rows: &[&Transaction], top_n: usize) -> Ranking {
    seller_table(rows).rank(Measure::DistinctOrders, SortOrder::Descending, top_n)
}

pub fn sellers_by_sales(rows: &[&Transaction], top_n: usize) -> Ranking {
    seller_table(rows).rank(Measure::Sales, SortOrder::Descending, top_n)
}

fn seller_table(rows: &[&Transaction]) -> AggregateTable {
    let table = AggregateTable::build(rows, |row| row.seller_id.as_deref());
    debug!(sellers = table.len(), "grouped by seller");
    table
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRankings {
    pub best: Ranking,
    pub worst: Ranking,
}

/// Best and worst categories by distinct orders, both taken from one grouped table.
pub fn category_rankings(rows: &[&Transaction], top_n: usize) -> CategoryRankings {
    let table = AggregateTable::build(rows, |row| row.product_category.as_deref());
    debug!(categories = table.len(), "grouped by product category");

    CategoryRankings {
        best: table.rank(Measure::DistinctOrders, SortOrder::Descending, top_n),
        worst: table.rank(Measure::DistinctOrders, SortOrder::Ascending, top_n),
    }
}

/// Point in time that RFM recency is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecencyReference {
    /// Latest purchase in the whole dataset, whatever range is selected.
    #[default]
    DatasetMax,
    /// Latest purchase inside the selected range.
    FilteredMax,
    At(NaiveDateTime),
}

impl RecencyReference {
    pub fn resolve(&self, dataset_max: NaiveDateTime, rows: &[&Transaction]) -> NaiveDateTime {
        match self {
            RecencyReference::DatasetMax => dataset_max,
            RecencyReference::FilteredMax => rows
                .iter()
                .map(|row| row.purchased_at)
                .max()
                .unwrap_or(dataset_max),
            RecencyReference::At(reference) => *reference,
        }
    }
}

impl FromStr for RecencyReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dataset_max" => Ok(RecencyReference::DatasetMax),
            "filtered_max" => Ok(RecencyReference::FilteredMax),
            other => parse_timestamp(other).map(RecencyReference::At).ok_or_else(|| {
                format!(
                    "unknown recency reference '{other}': expected dataset_max, filtered_max or a timestamp"
                )
            }),
        }
    }
}

impl fmt::Display for RecencyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecencyReference::DatasetMax => write!(f, "dataset_max"),
            RecencyReference::FilteredMax => write!(f, "filtered_max"),
            RecencyReference::At(reference) => write!(f, "{reference}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RfmProfile {
    pub customer_unique_id: String,
    pub recency_days: i64,
    pub frequency: usize,
    pub monetary: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RfmRankings {
    pub monetary: Ranking,
    pub frequency: Ranking,
    /// Smallest recency first: the most recent customers.
    pub recency: Ranking,
}

/// Per-customer recency, frequency and monetary measures over the filtered rows.
#[derive(Debug, Clone)]
pub struct RfmTable {
    table: AggregateTable,
    reference: NaiveDateTime,
}

impl RfmTable {
    pub fn build(rows: &[&Transaction], reference: NaiveDateTime) -> Self {
        let table = AggregateTable::build(rows, |row| Some(row.customer_unique_id.as_str()));
        debug!(customers = table.len(), %reference, "built rfm table");
        Self { table, reference }
    }

    pub fn reference(&self) -> NaiveDateTime {
        self.reference
    }

    pub fn profiles(&self) -> Vec<RfmProfile> {
        self.table
            .records()
            .iter()
            .map(|record| RfmProfile {
                customer_unique_id: record.key.clone(),
                recency_days: record.recency_days(self.reference),
                frequency: record.order_count,
                monetary: record.sales(),
            })
            .collect()
    }

    pub fn rankings(&self, top_n: usize) -> RfmRankings {
        let recency = Measure::RecencyDays {
            reference: self.reference,
        };
        RfmRankings {
            monetary: self.table.rank(Measure::Sales, SortOrder::Descending, top_n),
            frequency: self
                .table
                .rank(Measure::DistinctOrders, SortOrder::Descending, top_n),
            recency: self.table.rank(recency, SortOrder::Ascending, top_n),
        }
    }
}

pub fn rfm_rankings(rows: &[&Transaction], reference: NaiveDateTime, top_n: usize) -> RfmRankings {
    RfmTable::build(rows, reference).rankings(top_n)
}
