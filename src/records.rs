use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path};
use tracing::{debug, info};

use crate::errors::DataError;

pub const ORDER_ID: &str = "order_id";
pub const SELLER_ID: &str = "seller_id";
pub const CUSTOMER_ID: &str = "customer_id";
pub const CUSTOMER_UNIQUE_ID: &str = "customer_unique_id";
pub const PRODUCT_CATEGORY: &str = "product_category_name_english";
pub const PRICE: &str = "price";
pub const FREIGHT_VALUE: &str = "freight_value";
pub const PURCHASE_TIMESTAMP: &str = "order_purchase_timestamp";

pub const REQUIRED_COLUMNS: [&str; 8] = [
    ORDER_ID,
    SELLER_ID,
    CUSTOMER_ID,
    CUSTOMER_UNIQUE_ID,
    PRODUCT_CATEGORY,
    PRICE,
    FREIGHT_VALUE,
    PURCHASE_TIMESTAMP,
];

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// One order line item of the pre-joined orders/sellers/products/customers table.
///
/// Seller, category and amounts are optional because orders without items
/// survive the join with those cells empty.
#[derive(Debug, PartialEq, Clone)]
pub struct Transaction {
    pub order_id: String,
    pub customer_id: String,
    pub customer_unique_id: String,
    pub seller_id: Option<String>,
    pub product_category: Option<String>,
    pub price: Option<f64>,
    pub freight_value: Option<f64>,
    pub purchased_at: NaiveDateTime,
}

impl Transaction {
    pub fn purchase_date(&self) -> NaiveDate {
        self.purchased_at.date()
    }
}

/// Row as it appears in the file, before typed validation.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(deserialize_with = "trim_string")]
    order_id: String,
    #[serde(deserialize_with = "trim_string")]
    customer_id: String,
    #[serde(deserialize_with = "trim_string")]
    customer_unique_id: String,
    #[serde(deserialize_with = "trim_optional_string")]
    seller_id: Option<String>,
    #[serde(
        rename = "product_category_name_english",
        deserialize_with = "trim_optional_string"
    )]
    product_category: Option<String>,
    #[serde(deserialize_with = "trim_optional_string")]
    price: Option<String>,
    #[serde(deserialize_with = "trim_optional_string")]
    freight_value: Option<String>,
    #[serde(
        rename = "order_purchase_timestamp",
        deserialize_with = "trim_string"
    )]
    purchased_at: String,
}

impl RawRecord {
    fn into_transaction(self, line: u64) -> Result<Transaction, DataError> {
        require(&self.order_id, ORDER_ID, line)?;
        require(&self.customer_id, CUSTOMER_ID, line)?;
        require(&self.customer_unique_id, CUSTOMER_UNIQUE_ID, line)?;

        let purchased_at =
            parse_timestamp(&self.purchased_at).ok_or_else(|| DataError::InvalidTimestamp {
                line,
                value: self.purchased_at.clone(),
            })?;

        Ok(Transaction {
            price: parse_amount(self.price, PRICE, line)?,
            freight_value: parse_amount(self.freight_value, FREIGHT_VALUE, line)?,
            order_id: self.order_id,
            customer_id: self.customer_id,
            customer_unique_id: self.customer_unique_id,
            seller_id: self.seller_id,
            product_category: self.product_category,
            purchased_at,
        })
    }
}

/// The full, immutable table loaded once per session.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<Transaction>,
    min_timestamp: NaiveDateTime,
    max_timestamp: NaiveDateTime,
}

impl Dataset {
    pub fn from_rows(rows: Vec<Transaction>) -> Result<Self, DataError> {
        let mut stamps = rows.iter().map(|row| row.purchased_at);
        let first = stamps.next().ok_or(DataError::Empty)?;
        let (min_timestamp, max_timestamp) =
            stamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));

        Ok(Self {
            rows,
            min_timestamp,
            max_timestamp,
        })
    }

    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn min_timestamp(&self) -> NaiveDateTime {
        self.min_timestamp
    }

    pub fn max_timestamp(&self) -> NaiveDateTime {
        self.max_timestamp
    }

    pub fn min_date(&self) -> NaiveDate {
        self.min_timestamp.date()
    }

    pub fn max_date(&self) -> NaiveDate {
        self.max_timestamp.date()
    }
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Dataset, DataError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let dataset = from_reader(file)?;
    info!(
        path = %path.display(),
        rows = dataset.len(),
        min = %dataset.min_timestamp(),
        max = %dataset.max_timestamp(),
        "dataset loaded"
    );
    Ok(dataset)
}

pub fn from_reader<R: Read>(reader: R) -> Result<Dataset, DataError> {
    // The CSV reader is buffered automatically, so there is no need to wrap
    // the source in an io::BufReader.
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DataError::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let raw: RawRecord = record.deserialize(Some(&headers))?;
        rows.push(raw.into_transaction(line)?);
    }
    debug!(rows = rows.len(), "parsed transaction rows");

    Dataset::from_rows(rows)
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn require(value: &str, column: &'static str, line: u64) -> Result<(), DataError> {
    if value.is_empty() {
        return Err(DataError::MissingValue { line, column });
    }
    Ok(())
}

fn parse_amount(
    value: Option<String>,
    column: &'static str,
    line: u64,
) -> Result<Option<f64>, DataError> {
    let Some(value) = value else {
        return Ok(None);
    };

    match value.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => Ok(Some(amount)),
        _ => Err(DataError::InvalidNumber {
            line,
            column,
            value,
        }),
    }
}

fn trim_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    Ok(s.trim().to_owned())
}

fn trim_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_owned()))
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::at;
    use super::*;
    use std::io::Write;

    const HEADER: &str = "order_id,customer_id,order_status,order_purchase_timestamp,customer_unique_id,seller_id,product_category_name_english,price,freight_value";

    fn load(body: &str) -> Result<Dataset, DataError> {
        from_reader(format!("{HEADER}\n{body}").as_bytes())
    }

    #[test]
    fn test_read_csv() {
        let dataset = read_csv("test-inputs/orders.csv").unwrap();

        assert_eq!(dataset.len(), 6);
        assert_eq!(dataset.min_timestamp(), at("2017-01-05 10:00:00"));
        assert_eq!(dataset.max_timestamp(), at("2017-04-01 12:00:00"));
        assert_eq!(
            dataset.rows()[0],
            Transaction {
                order_id: "o1".to_owned(),
                customer_id: "c1".to_owned(),
                customer_unique_id: "u1".to_owned(),
                seller_id: Some("s1".to_owned()),
                product_category: Some("bed_bath_table".to_owned()),
                price: Some(10.0),
                freight_value: Some(2.0),
                purchased_at: at("2017-01-05 10:00:00"),
            }
        );

        let itemless = &dataset.rows()[4];
        assert_eq!(itemless.order_id, "o4");
        assert_eq!(itemless.seller_id, None);
        assert_eq!(itemless.product_category, None);
        assert_eq!(itemless.price, None);
        assert_eq!(itemless.freight_value, None);
    }

    #[test]
    fn unreadable_source_is_io_error() {
        let err = read_csv("test-inputs/does_not_exist.csv").unwrap_err();
        assert!(matches!(err, DataError::Io(_)));
    }

    #[test]
    fn missing_columns_are_all_reported() {
        let err = from_reader("order_id,seller_id,price\no1,s1,1.0\n".as_bytes()).unwrap_err();
        match err {
            DataError::MissingColumns(columns) => assert_eq!(
                columns,
                vec![
                    CUSTOMER_ID,
                    CUSTOMER_UNIQUE_ID,
                    PRODUCT_CATEGORY,
                    FREIGHT_VALUE,
                    PURCHASE_TIMESTAMP
                ]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_timestamp_is_fatal() {
        let err = load("o1,c1,delivered,not-a-date,u1,s1,toys,1.0,1.0\n").unwrap_err();
        match err {
            DataError::InvalidTimestamp { line, value } => {
                assert_eq!(line, 2);
                assert_eq!(value, "not-a-date");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn negative_amount_is_rejected() {
        let err = load("o1,c1,delivered,2018-01-01 00:00:00,u1,s1,toys,-3.5,1.0\n").unwrap_err();
        assert!(matches!(
            err,
            DataError::InvalidNumber { column: PRICE, .. }
        ));
    }

    #[test]
    fn non_numeric_freight_is_rejected() {
        let err = load("o1,c1,delivered,2018-01-01 00:00:00,u1,s1,toys,3.5,abc\n").unwrap_err();
        match err {
            DataError::InvalidNumber {
                line,
                column,
                value,
            } => {
                assert_eq!(line, 2);
                assert_eq!(column, FREIGHT_VALUE);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ragged_row_is_csv_error() {
        let err = load("o1,c1,delivered,2018-01-01 00:00:00,u1,s1\n").unwrap_err();
        assert!(matches!(err, DataError::Csv(_)));
    }

    #[test]
    fn empty_order_id_is_rejected() {
        let err = load(" ,c1,delivered,2018-01-01 00:00:00,u1,s1,toys,3.5,1.0\n").unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingValue { column: ORDER_ID, .. }
        ));
    }

    #[test]
    fn header_only_file_is_empty() {
        let err = load("").unwrap_err();
        assert!(matches!(err, DataError::Empty));
    }

    #[test]
    fn accepts_date_only_and_iso_timestamps() {
        let dataset = load(
            "o1,c1,delivered,2018-01-01,u1,s1,toys,1.0,1.0\n\
             o2,c2,delivered,2018-01-02T08:15:00,u2,s1,toys,1.0,1.0\n",
        )
        .unwrap();

        assert_eq!(dataset.min_timestamp(), at("2018-01-01 00:00:00"));
        assert_eq!(dataset.max_timestamp(), at("2018-01-02 08:15:00"));
    }

    #[test]
    fn reads_from_file_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "o9,c9,shipped,2018-05-05 05:05:05,u9,s9,garden_tools,12.5,0").unwrap();

        let dataset = read_csv(file.path()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.rows()[0].freight_value, Some(0.0));
    }
}
