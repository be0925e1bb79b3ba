use serde::{Serialize, Serializer};
use std::io::{self, Write};

use crate::aggregate::RankedEntry;
use crate::dashboard::{Chart, DashboardView, Layout, Section};

const LEADER_FILL: char = '#';
const BAR_FILL: char = '-';
const NO_DATA: &str = "(no data)";

/// A drawing backend. The dashboard calls `chart` once per ranking.
pub trait ChartRenderer {
    fn begin(&mut self, _view: &DashboardView) -> io::Result<()> {
        Ok(())
    }

    fn section(&mut self, _section: &Section) -> io::Result<()> {
        Ok(())
    }

    fn chart(&mut self, section: &Section, chart: &Chart) -> io::Result<()>;

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn render_dashboard<R>(renderer: &mut R, view: &DashboardView) -> io::Result<()>
where
    R: ChartRenderer + ?Sized,
{
    renderer.begin(view)?;
    for section in &view.sections {
        renderer.section(section)?;
        for chart in &section.charts {
            renderer.chart(section, chart)?;
        }
    }
    renderer.finish()
}

/// Horizontal bar charts as plain text. The leader's bar uses a distinct fill.
pub struct TextRenderer<W: Write> {
    out: W,
    bar_width: usize,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, bar_width: usize) -> Self {
        Self { out, bar_width }
    }

    fn bar(&self, entry: &RankedEntry, scale: f64) -> String {
        let magnitude = entry.value.as_f64().abs();
        let mut len = if scale > 0.0 {
            (magnitude / scale * self.bar_width as f64).round() as usize
        } else {
            0
        };
        if magnitude > 0.0 {
            len = len.max(1);
        }
        let fill = if entry.is_leader { LEADER_FILL } else { BAR_FILL };
        std::iter::repeat(fill).take(len).collect()
    }
}

impl<W: Write> ChartRenderer for TextRenderer<W> {
    fn begin(&mut self, view: &DashboardView) -> io::Result<()> {
        writeln!(self.out, "E-Commerce Dashboard")?;
        writeln!(
            self.out,
            "Date range: {} .. {} ({} rows, recency from {})",
            view.range.start(),
            view.range.end(),
            view.rows,
            view.recency_reference
        )
    }

    fn section(&mut self, section: &Section) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "== {} ==", section.title)?;
        if let Some(caption) = section.caption {
            writeln!(self.out, "{caption}")?;
        }
        Ok(())
    }

    fn chart(&mut self, section: &Section, chart: &Chart) -> io::Result<()> {
        match section.layout {
            Layout::Tabs => writeln!(self.out, "-- [{}] {} --", chart.label, chart.title)?,
            Layout::SideBySide => writeln!(self.out, "-- {} --", chart.title)?,
        }
        if !chart.label_axis.is_empty() {
            writeln!(self.out, "{}", chart.label_axis)?;
        }

        let entries = &chart.ranking.entries;
        if entries.is_empty() {
            return writeln!(self.out, "  {NO_DATA}");
        }

        let scale = entries
            .iter()
            .map(|entry| entry.value.as_f64().abs())
            .fold(0.0_f64, f64::max);
        let key_width = entries
            .iter()
            .map(|e| e.key.chars().count())
            .max()
            .unwrap_or(0);
        let value_width = entries
            .iter()
            .map(|e| e.value.to_string().len())
            .max()
            .unwrap_or(0);

        for entry in entries {
            let marker = if entry.is_leader { '>' } else { ' ' };
            let bar = self.bar(entry, scale);
            let value = entry.value.to_string();
            if chart.mirrored {
                writeln!(
                    self.out,
                    "  {value:>value_width$} {bar:>bar_width$} {key:<key_width$} {marker}{rank}",
                    bar_width = self.bar_width,
                    key = entry.key,
                    rank = entry.rank,
                )?;
            } else {
                writeln!(
                    self.out,
                    "{marker}{rank:>2} {key:<key_width$} {bar:<bar_width$} {value:>value_width$}",
                    bar_width = self.bar_width,
                    key = entry.key,
                    rank = entry.rank,
                )?;
            }
        }
        if !chart.value_axis.is_empty() {
            writeln!(self.out, "{}", chart.value_axis)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[derive(Debug, Serialize)]
struct ChartRow<'a> {
    section: &'a str,
    chart: &'a str,
    rank: usize,
    key: &'a str,
    #[serde(serialize_with = "serialize_f64_2dp")]
    value: f64,
    leader: bool,
}

/// One CSV row per ranked entry. Empty rankings emit no rows.
pub struct CsvRenderer<W: Write> {
    wtr: csv::Writer<W>,
}

impl<W: Write> CsvRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            wtr: csv::WriterBuilder::new().from_writer(out),
        }
    }
}

impl<W: Write> ChartRenderer for CsvRenderer<W> {
    fn chart(&mut self, section: &Section, chart: &Chart) -> io::Result<()> {
        for entry in &chart.ranking.entries {
            self.wtr.serialize(ChartRow {
                section: section.title,
                chart: chart.title,
                rank: entry.rank,
                key: &entry.key,
                value: entry.value.as_f64(),
                leader: entry.is_leader,
            })?;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }
}

fn serialize_f64_2dp<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{:.2}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Measure, MeasureValue, Ranking, SortOrder};
    use crate::filter::DateRange;
    use crate::records::fixtures::{at, day};

    fn entry(rank: usize, key: &str, value: MeasureValue) -> RankedEntry {
        RankedEntry {
            rank,
            key: key.to_owned(),
            value,
            is_leader: rank == 1,
        }
    }

    fn chart(title: &'static str, entries: Vec<RankedEntry>) -> Chart {
        Chart {
            label: "Tab",
            title,
            label_axis: "Seller ID",
            value_axis: "",
            mirrored: false,
            ranking: Ranking {
                measure: Measure::DistinctOrders,
                order: SortOrder::Descending,
                entries,
            },
        }
    }

    fn view(charts: Vec<Chart>) -> DashboardView {
        DashboardView {
            range: DateRange::new(day("2018-01-01"), day("2018-01-31")).unwrap(),
            rows: 4,
            recency_reference: at("2018-01-31 10:00:00"),
            sections: vec![Section {
                title: "Sellers",
                caption: None,
                layout: Layout::Tabs,
                charts,
            }],
        }
    }

    fn render_text(view: &DashboardView) -> String {
        let mut out = Vec::new();
        render_dashboard(&mut TextRenderer::new(&mut out, 10), view).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn leader_bar_is_distinguished() {
        let view = view(vec![chart(
            "By Orders",
            vec![
                entry(1, "s1", MeasureValue::Count(4)),
                entry(2, "s2", MeasureValue::Count(2)),
            ],
        )]);

        let text = render_text(&view);

        assert!(text.contains("-- [Tab] By Orders --"));
        assert!(text.contains("> 1 s1 ########## 4"));
        assert!(text.contains("  2 s2 -----      2"));
    }

    #[test]
    fn non_ascii_keys_stay_aligned() {
        let view = view(vec![chart(
            "By Orders",
            vec![
                entry(1, "saúde", MeasureValue::Count(2)),
                entry(2, "toys", MeasureValue::Count(1)),
            ],
        )]);

        let text = render_text(&view);

        assert!(text.contains("> 1 saúde ########## 2\n"));
        assert!(text.contains("  2 toys  -----      1\n"));
    }

    #[test]
    fn value_axis_follows_the_bars() {
        let mut by_orders = chart("By Orders", vec![entry(1, "s1", MeasureValue::Count(3))]);
        by_orders.value_axis = "Orders";

        let text = render_text(&view(vec![by_orders]));

        assert!(text.contains("> 1 s1 ########## 3\nOrders\n"));
    }

    #[test]
    fn empty_ranking_renders_no_data() {
        let text = render_text(&view(vec![chart("By Orders", Vec::new())]));

        assert!(text.contains("Date range: 2018-01-01 .. 2018-01-31 (4 rows"));
        assert!(text.contains("  (no data)"));
    }

    #[test]
    fn mirrored_chart_puts_labels_on_the_right() {
        let mut worst = chart("Worst", vec![entry(1, "toys", MeasureValue::Count(1))]);
        worst.mirrored = true;

        let text = render_text(&view(vec![worst]));

        assert!(text.contains("  1 ########## toys >1"));
    }

    #[test]
    fn csv_rows_per_entry() {
        let view = view(vec![
            chart(
                "By Sales",
                vec![
                    entry(1, "s2", MeasureValue::Amount(55.0)),
                    entry(2, "s1", MeasureValue::Amount(47.126)),
                ],
            ),
            chart("Empty", Vec::new()),
        ]);

        let mut out = Vec::new();
        {
            let mut renderer = CsvRenderer::new(&mut out);
            render_dashboard(&mut renderer, &view).unwrap();
        }

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "section,chart,rank,key,value,leader\n\
             Sellers,By Sales,1,s2,55.00,true\n\
             Sellers,By Sales,2,s1,47.13,false\n"
        );
    }
}
