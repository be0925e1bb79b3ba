use std::io;

use chrono::NaiveDate;
use thiserror::Error;

/// Failures while loading the transactions table. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum DataError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("line {line}: cannot parse purchase timestamp '{value}'")]
    InvalidTimestamp { line: u64, value: String },
    #[error("line {line}: invalid {column} '{value}'")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("line {line}: {column} is empty")]
    MissingValue { line: u64, column: &'static str },
    #[error("dataset contains no rows")]
    Empty,
}

/// A date selection the user can correct.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("start date {start} is after end date {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    #[error("range {start}..={end} is outside the data span {min}..={max}")]
    OutOfBounds {
        start: NaiveDate,
        end: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },
}

/// A line typed during an interactive session that could not be applied.
#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("expected 'START END', 'all' or 'quit', got '{0}'")]
    Syntax(String),
    #[error("cannot parse date '{value}': {source}")]
    Date {
        value: String,
        source: chrono::ParseError,
    },
    #[error(transparent)]
    Range(#[from] RangeError),
}
