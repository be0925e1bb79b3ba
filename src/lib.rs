//! Ranked seller, product category and RFM customer views over a pre-joined
//! e-commerce transactions table, filtered by purchase date.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod filter;
pub mod pipelines;
pub mod records;
pub mod render;
pub mod session;

pub use aggregate::{
    AggregateRecord, AggregateTable, Measure, MeasureValue, RankedEntry, Ranking, SortOrder,
};
pub use dashboard::{Chart, Dashboard, DashboardView, Layout, Section};
pub use errors::{DataError, RangeError, SelectionError};
pub use filter::{filter_range, DateRange};
pub use pipelines::{RecencyReference, RfmProfile, RfmTable};
pub use records::{read_csv, Dataset, Transaction};
