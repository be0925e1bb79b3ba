use chrono::NaiveDate;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

use crate::dashboard::Dashboard;
use crate::errors::SelectionError;
use crate::filter::DateRange;
use crate::records::Dataset;
use crate::render::{render_dashboard, ChartRenderer};

const OPEN_BOUND: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select(DateRange),
    Quit,
}

/// Reads one selector line: `START END` (either may be `-` for the data bound),
/// `all` for the full span, and `quit` or a blank line to leave.
pub fn parse_command(line: &str, dataset: &Dataset) -> Result<Command, SelectionError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [] | ["quit"] | ["q"] | ["exit"] => Ok(Command::Quit),
        ["all"] => Ok(Command::Select(DateRange::full(dataset))),
        [start, end] => {
            let range = DateRange::within(dataset, parse_bound(start)?, parse_bound(end)?)?;
            Ok(Command::Select(range))
        }
        _ => Err(SelectionError::Syntax(line.trim().to_owned())),
    }
}

fn parse_bound(value: &str) -> Result<Option<NaiveDate>, SelectionError> {
    if value == OPEN_BOUND {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|source| SelectionError::Date {
            value: value.to_owned(),
            source,
        })
}

/// Re-runs the full dashboard for every selection read from `input`.
///
/// Invalid selections are reported on `messages` and the session carries on.
pub fn run_interactive<R, W>(
    dashboard: &Dashboard<'_>,
    renderer: &mut dyn ChartRenderer,
    input: R,
    messages: &mut W,
) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
{
    let dataset = dashboard.dataset();
    writeln!(
        messages,
        "Enter a date range between {} and {} as 'START END' (blank line to quit)",
        dataset.min_date(),
        dataset.max_date()
    )?;

    for line in input.lines() {
        let line = line?;
        match parse_command(&line, dataset) {
            Ok(Command::Quit) => break,
            Ok(Command::Select(range)) => {
                debug!(start = %range.start(), end = %range.end(), "selection changed");
                render_dashboard(renderer, &dashboard.view(&range))?;
            }
            Err(err) => {
                warn!(%err, "rejected selection");
                writeln!(messages, "invalid selection: {err}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RangeError;
    use crate::pipelines::{RecencyReference, DEFAULT_TOP_N};
    use crate::records::fixtures::day;
    use crate::records::read_csv;
    use crate::render::CsvRenderer;
    use std::io::Cursor;

    #[test]
    fn parses_selector_lines() {
        let dataset = read_csv("test-inputs/orders.csv").unwrap();

        assert_eq!(parse_command("", &dataset), Ok(Command::Quit));
        assert_eq!(parse_command("  quit ", &dataset), Ok(Command::Quit));
        assert_eq!(
            parse_command("all", &dataset),
            Ok(Command::Select(DateRange::full(&dataset)))
        );
        assert_eq!(
            parse_command("2017-02-01 -", &dataset),
            Ok(Command::Select(
                DateRange::new(day("2017-02-01"), day("2017-04-01")).unwrap()
            ))
        );
    }

    #[test]
    fn rejects_bad_selector_lines() {
        let dataset = read_csv("test-inputs/orders.csv").unwrap();

        assert_eq!(
            parse_command("2017-03-01", &dataset),
            Err(SelectionError::Syntax("2017-03-01".to_owned()))
        );
        assert!(matches!(
            parse_command("2017-13-01 2017-03-01", &dataset),
            Err(SelectionError::Date { .. })
        ));
        assert_eq!(
            parse_command("2017-03-01 2017-02-01", &dataset),
            Err(SelectionError::Range(RangeError::Inverted {
                start: day("2017-03-01"),
                end: day("2017-02-01"),
            }))
        );
    }

    #[test]
    fn session_survives_invalid_selection() {
        let dataset = read_csv("test-inputs/orders.csv").unwrap();
        let dashboard = Dashboard::new(&dataset, DEFAULT_TOP_N, RecencyReference::DatasetMax);
        let input = Cursor::new("2017-03-01 2017-02-01\n2017-02-01 2017-02-28\nquit\nall\n");

        let mut out = Vec::new();
        let mut messages = Vec::new();
        {
            let mut renderer = CsvRenderer::new(&mut out);
            run_interactive(&dashboard, &mut renderer, input, &mut messages).unwrap();
        }

        let messages = String::from_utf8(messages).unwrap();
        assert!(messages
            .contains("invalid selection: start date 2017-03-01 is after end date 2017-02-01"));

        let out = String::from_utf8(out).unwrap();
        let seller_rows: Vec<&str> = out
            .lines()
            .filter(|line| line.contains("Total Orders"))
            .collect();
        assert_eq!(
            seller_rows,
            vec!["Best Performing Sellers,Best Performing Sellers by Total Orders,1,s2,1.00,true"]
        );
    }
}
