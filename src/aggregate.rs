//! Group-by, reduce, sort and truncate over a filtered slice of transactions.
//!
//! An [`AggregateTable`] is built once per grouping key and keeps its groups in
//! the order they were first encountered. Every [`Ranking`] taken from it uses a
//! stable sort, so ties always resolve to that encounter order and several
//! views over the same table stay consistent with each other.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use std::{cmp::Ordering, collections::HashSet, fmt};

use crate::records::Transaction;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A reduction evaluated per group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    /// Count of distinct order ids.
    DistinctOrders,
    Price,
    Freight,
    /// Summed price plus summed freight.
    Sales,
    /// Whole days between `reference` and the group's latest purchase.
    RecencyDays { reference: NaiveDateTime },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureValue {
    Count(usize),
    Amount(f64),
    Days(i64),
}

impl MeasureValue {
    pub fn as_f64(self) -> f64 {
        match self {
            MeasureValue::Count(count) => count as f64,
            MeasureValue::Amount(amount) => amount,
            MeasureValue::Days(days) => days as f64,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (MeasureValue::Count(a), MeasureValue::Count(b)) => a.cmp(b),
            (MeasureValue::Days(a), MeasureValue::Days(b)) => a.cmp(b),
            (a, b) => a.as_f64().total_cmp(&b.as_f64()),
        }
    }
}

impl fmt::Display for MeasureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureValue::Count(count) => write!(f, "{count}"),
            MeasureValue::Amount(amount) => write!(f, "{amount:.2}"),
            MeasureValue::Days(days) => write!(f, "{days}"),
        }
    }
}

/// Measures of one group. Never mutated once the table is built.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    pub key: String,
    pub order_count: usize,
    pub price: f64,
    pub freight: f64,
    pub last_purchase: NaiveDateTime,
}

impl AggregateRecord {
    pub fn sales(&self) -> f64 {
        self.price + self.freight
    }

    pub fn recency_days(&self, reference: NaiveDateTime) -> i64 {
        (reference - self.last_purchase)
            .num_seconds()
            .div_euclid(SECONDS_PER_DAY)
    }

    pub fn measure(&self, measure: Measure) -> MeasureValue {
        match measure {
            Measure::DistinctOrders => MeasureValue::Count(self.order_count),
            Measure::Price => MeasureValue::Amount(self.price),
            Measure::Freight => MeasureValue::Amount(self.freight),
            Measure::Sales => MeasureValue::Amount(self.sales()),
            Measure::RecencyDays { reference } => {
                MeasureValue::Days(self.recency_days(reference))
            }
        }
    }
}

struct Accumulator<'a> {
    orders: HashSet<&'a str>,
    price: f64,
    freight: f64,
    last_purchase: NaiveDateTime,
}

impl<'a> Accumulator<'a> {
    fn new(first_seen: NaiveDateTime) -> Self {
        Self {
            orders: HashSet::new(),
            price: 0.0,
            freight: 0.0,
            last_purchase: first_seen,
        }
    }

    fn add(&mut self, row: &'a Transaction) {
        self.orders.insert(row.order_id.as_str());
        self.price += row.price.unwrap_or_default();
        self.freight += row.freight_value.unwrap_or_default();
        self.last_purchase = self.last_purchase.max(row.purchased_at);
    }

    fn finish(self, key: &str) -> AggregateRecord {
        AggregateRecord {
            key: key.to_owned(),
            order_count: self.orders.len(),
            price: self.price,
            freight: self.freight,
            last_purchase: self.last_purchase,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateTable {
    records: Vec<AggregateRecord>,
}

impl AggregateTable {
    /// Groups `rows` by `key`. Rows whose key is absent are left out of every group.
    pub fn build<'a, F>(rows: &[&'a Transaction], key: F) -> Self
    where
        F: Fn(&'a Transaction) -> Option<&'a str>,
    {
        let mut groups: IndexMap<&'a str, Accumulator<'a>> = IndexMap::new();
        for &row in rows {
            let Some(group) = key(row) else {
                continue;
            };
            groups
                .entry(group)
                .or_insert_with(|| Accumulator::new(row.purchased_at))
                .add(row);
        }

        Self {
            records: groups
                .into_iter()
                .map(|(group, acc)| acc.finish(group))
                .collect(),
        }
    }

    pub fn records(&self) -> &[AggregateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorts groups by `measure` in `order` and keeps the first `limit`.
    pub fn rank(&self, measure: Measure, order: SortOrder, limit: usize) -> Ranking {
        let mut scored: Vec<(MeasureValue, &AggregateRecord)> = self
            .records
            .iter()
            .map(|record| (record.measure(measure), record))
            .collect();

        // sort_by is stable: equal values keep first-encountered order.
        scored.sort_by(|(a, _), (b, _)| match order {
            SortOrder::Ascending => a.compare(b),
            SortOrder::Descending => b.compare(a),
        });

        let entries = scored
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, (value, record))| RankedEntry {
                rank: index + 1,
                key: record.key.clone(),
                value,
                is_leader: index == 0,
            })
            .collect();

        Ranking {
            measure,
            order,
            entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub rank: usize,
    pub key: String,
    pub value: MeasureValue,
    /// Set on the rank-1 entry only; renderers highlight it.
    pub is_leader: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub measure: Measure,
    pub order: SortOrder,
    pub entries: Vec<RankedEntry>,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.key.as_str()).collect()
    }

    pub fn leader(&self) -> Option<&RankedEntry> {
        self.entries.first()
    }
}
