//! One interaction's worth of charts.
//!
//! [`Dashboard::view`] re-runs the whole pipeline for a date selection: filter
//! the loaded rows, run every ranking over the subset and attach the titles and
//! axis labels the renderers print. Nothing is cached between calls.

use chrono::NaiveDateTime;
use tracing::info;

use crate::aggregate::Ranking;
use crate::filter::{filter_range, DateRange};
use crate::pipelines::{
    category_rankings, sellers_by_orders, sellers_by_sales, RecencyReference, RfmTable,
};
use crate::records::Dataset;

const SELLER_AXIS: &str = "Seller ID";
const CUSTOMER_AXIS: &str = "Customer Unique ID";
const ORDERS_AXIS: &str = "Orders";
const SALES_AXIS: &str = "Price + Freight";
const DAYS_AXIS: &str = "Days Since Last Order";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Tabs,
    SideBySide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Tab or panel name.
    pub label: &'static str,
    pub title: &'static str,
    pub label_axis: &'static str,
    pub value_axis: &'static str,
    /// Bars grow right-to-left with labels on the right.
    pub mirrored: bool,
    pub ranking: Ranking,
}

impl Chart {
    fn new(
        label: &'static str,
        title: &'static str,
        label_axis: &'static str,
        ranking: Ranking,
    ) -> Self {
        Self {
            label,
            title,
            label_axis,
            value_axis: "",
            mirrored: false,
            ranking,
        }
    }

    fn with_value_axis(mut self, value_axis: &'static str) -> Self {
        self.value_axis = value_axis;
        self
    }

    fn mirrored(mut self) -> Self {
        self.mirrored = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: &'static str,
    pub caption: Option<&'static str>,
    pub layout: Layout,
    pub charts: Vec<Chart>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub range: DateRange,
    pub rows: usize,
    pub recency_reference: NaiveDateTime,
    pub sections: Vec<Section>,
}

impl DashboardView {
    pub fn charts(&self) -> impl Iterator<Item = (&Section, &Chart)> {
        self.sections
            .iter()
            .flat_map(|section| section.charts.iter().map(move |chart| (section, chart)))
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard<'a> {
    dataset: &'a Dataset,
    top_n: usize,
    recency_reference: RecencyReference,
}

impl<'a> Dashboard<'a> {
    pub fn new(dataset: &'a Dataset, top_n: usize, recency_reference: RecencyReference) -> Self {
        Self {
            dataset,
            top_n,
            recency_reference,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        self.dataset
    }

    pub fn view(&self, range: &DateRange) -> DashboardView {
        let rows = filter_range(self.dataset.rows(), range);
        let reference = self
            .recency_reference
            .resolve(self.dataset.max_timestamp(), &rows);
        info!(
            start = %range.start(),
            end = %range.end(),
            rows = rows.len(),
            %reference,
            "computing dashboard"
        );

        let categories = category_rankings(&rows, self.top_n);
        let rfm = RfmTable::build(&rows, reference).rankings(self.top_n);

        let sections = vec![
            Section {
                title: "Best Performing Sellers",
                caption: None,
                layout: Layout::Tabs,
                charts: vec![
                    Chart::new(
                        "Best Sellers by Orders",
                        "Best Performing Sellers by Total Orders",
                        SELLER_AXIS,
                        sellers_by_orders(&rows, self.top_n),
                    )
                    .with_value_axis(ORDERS_AXIS),
                    Chart::new(
                        "Best Sellers by Sales",
                        "Best Performing Sellers by Total Sales",
                        SELLER_AXIS,
                        sellers_by_sales(&rows, self.top_n),
                    )
                    .with_value_axis(SALES_AXIS),
                ],
            },
            Section {
                title: "Best and Worst Performing Product Categories",
                caption: Some("Best and Worst Performing Product Categories by Total Orders"),
                layout: Layout::SideBySide,
                charts: vec![
                    Chart::new(
                        "Best",
                        "Best Performing Product Categories",
                        "",
                        categories.best,
                    )
                    .with_value_axis(ORDERS_AXIS),
                    Chart::new(
                        "Worst",
                        "Worst Performing Product Categories",
                        "",
                        categories.worst,
                    )
                    .with_value_axis(ORDERS_AXIS)
                    .mirrored(),
                ],
            },
            Section {
                title: "RFM Analysis for Best Customers",
                caption: None,
                layout: Layout::Tabs,
                charts: vec![
                    Chart::new("Monetary", "By Monetary", CUSTOMER_AXIS, rfm.monetary)
                        .with_value_axis(SALES_AXIS),
                    Chart::new("Frequency", "By Frequency", CUSTOMER_AXIS, rfm.frequency)
                        .with_value_axis(ORDERS_AXIS),
                    Chart::new("Recency", "By Recency (days)", CUSTOMER_AXIS, rfm.recency)
                        .with_value_axis(DAYS_AXIS),
                ],
            },
        ];

        DashboardView {
            range: *range,
            rows: rows.len(),
            recency_reference: reference,
            sections,
        }
    }
}
