use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::{io, num::NonZeroUsize, path::PathBuf};
use tracing_subscriber::EnvFilter;

use olist_dashboard::config::load_settings;
use olist_dashboard::render::{render_dashboard, ChartRenderer, CsvRenderer, TextRenderer};
use olist_dashboard::session::run_interactive;
use olist_dashboard::{read_csv, Dashboard, DateRange, RecencyReference};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "olist-dashboard")]
#[command(about = "Top sellers, product categories and RFM customers for a date range")]
#[command(version)]
struct Cli {
    /// Pre-joined transactions CSV (defaults to the configured dataset path)
    dataset: Option<PathBuf>,

    /// First purchase date to include, YYYY-MM-DD
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last purchase date to include, YYYY-MM-DD
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Entries per ranking
    #[arg(long)]
    top: Option<NonZeroUsize>,

    /// dataset_max, filtered_max or a timestamp
    #[arg(long)]
    recency_reference: Option<RecencyReference>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Settings file (defaults to ./dashboard.toml, then built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep the session open and read further date ranges from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = load_settings(cli.config.as_deref())?;
    let path = cli.dataset.unwrap_or(settings.dataset.path);
    let dataset =
        read_csv(&path).with_context(|| format!("cannot load dataset {}", path.display()))?;

    let top_n = cli.top.map_or(settings.ranking.top_n, NonZeroUsize::get);
    let recency_reference = cli
        .recency_reference
        .unwrap_or(settings.rfm.recency_reference);
    let dashboard = Dashboard::new(&dataset, top_n, recency_reference);

    let mut renderer: Box<dyn ChartRenderer> = match cli.format {
        OutputFormat::Text => Box::new(TextRenderer::new(
            io::stdout().lock(),
            settings.chart.bar_width,
        )),
        OutputFormat::Csv => Box::new(CsvRenderer::new(io::stdout().lock())),
    };

    match DateRange::within(&dataset, cli.start, cli.end) {
        Ok(range) => render_dashboard(renderer.as_mut(), &dashboard.view(&range))?,
        Err(err) if cli.interactive => eprintln!("invalid date range: {err}"),
        Err(err) => {
            eprintln!("Error: invalid date range: {err}");
            std::process::exit(2);
        }
    }

    if cli.interactive {
        run_interactive(
            &dashboard,
            renderer.as_mut(),
            io::stdin().lock(),
            &mut io::stderr(),
        )?;
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
