//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::chart_svg::render_price_chart;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_export::CsvExporter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::date_range::DATE_FORMAT;
use crate::domain::error::AnalyzerError;
use crate::domain::metrics::{
    DEFAULT_MOMENTUM_PERIOD, DEFAULT_SMA_LONG, DEFAULT_SMA_SHORT, MetricsConfig,
};
use crate::domain::ohlcv::Bar;
use crate::domain::pipeline::{AnalysisOutcome, AnalysisRequest, fetch_series};
use crate::logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::export_port::ExportPort;
use crate::ports::store_port::StorePort;
use crate::report::{format_metrics, format_preview};
use crate::worker::{AnalysisWorker, WorkerResponse};

#[derive(Parser, Debug)]
#[command(name = "stockanalyzer", about = "Daily stock price analysis")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, analyze and store daily bars for a ticker
    Analyze {
        #[arg(short, long)]
        ticker: String,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: String,
        /// Day after the last one, YYYY-MM-DD
        #[arg(long)]
        end: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write an SVG price chart with the short SMA overlay
        #[arg(long)]
        chart: Option<PathBuf>,
        /// Write the fetched bars as CSV
        #[arg(long)]
        export: Option<PathBuf>,
        /// Print the first N rows
        #[arg(long)]
        preview: Option<usize>,
    },
    /// Download daily bars to a CSV file without analysis
    Download {
        #[arg(short, long)]
        ticker: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show company information
    Info {
        #[arg(short, long)]
        ticker: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show the stored data range for a ticker
    Stored {
        #[arg(short, long)]
        ticker: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Command {
    fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Analyze { config, .. }
            | Command::Download { config, .. }
            | Command::Info { config, .. }
            | Command::Stored { config, .. } => config.as_deref(),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(cli.command.config_path()) {
        Ok(c) => c,
        Err(code) => return code,
    };
    logging::init(&config);

    let result = match cli.command {
        Command::Analyze {
            ticker,
            start,
            end,
            chart,
            export,
            preview,
            ..
        } => run_analyze(
            &config,
            &ticker,
            &start,
            &end,
            chart.as_deref(),
            export.as_deref(),
            preview,
        ),
        Command::Download {
            ticker,
            start,
            end,
            output,
            ..
        } => run_download(&config, &ticker, &start, &end, &output),
        Command::Info { ticker, .. } => run_info(&config, &ticker),
        Command::Stored { ticker, .. } => run_stored(&config, &ticker),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, ExitCode> {
    if let Some(path) = path {
        eprintln!("Loading config from {}", path.display());
    }
    FileConfigAdapter::load_optional(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn window(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, AnalyzerError> {
    let value = config.get_int("analysis", key, default as i64);
    if value < 1 {
        return Err(AnalyzerError::ConfigInvalid {
            section: "analysis".into(),
            key: key.into(),
            reason: format!("must be at least 1, got {value}"),
        });
    }
    Ok(value as usize)
}

pub fn build_metrics_config(config: &dyn ConfigPort) -> Result<MetricsConfig, AnalyzerError> {
    Ok(MetricsConfig {
        sma_short: window(config, "sma_short", DEFAULT_SMA_SHORT)?,
        sma_long: window(config, "sma_long", DEFAULT_SMA_LONG)?,
        momentum_period: window(config, "momentum_period", DEFAULT_MOMENTUM_PERIOD)?,
    })
}

/// Market data source named by `[data] source` (default `yahoo`).
pub fn build_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort + Send>, AnalyzerError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "yahoo".to_string())
        .to_lowercase();

    match source.as_str() {
        "csv" => {
            let dir = config
                .get_string("data", "csv_dir")
                .ok_or_else(|| AnalyzerError::ConfigMissing {
                    section: "data".into(),
                    key: "csv_dir".into(),
                })?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "yahoo")]
        "yahoo" => {
            let adapter = crate::adapters::yahoo_adapter::YahooAdapter::from_config(config)?;
            Ok(Box::new(adapter))
        }
        other => Err(AnalyzerError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unsupported data source: {other}"),
        }),
    }
}

/// Postgres when `[postgres] connection_string` is set and the feature is
/// enabled, SQLite otherwise.
pub fn build_store(config: &dyn ConfigPort) -> Result<Box<dyn StorePort + Send>, AnalyzerError> {
    #[cfg(feature = "postgres")]
    {
        if config.get_string("postgres", "connection_string").is_some() {
            let adapter = crate::adapters::postgres_adapter::PostgresAdapter::from_config(config)?;
            return Ok(Box::new(adapter));
        }
    }

    #[cfg(feature = "sqlite")]
    {
        let adapter = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
        Ok(Box::new(adapter))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = config;
        Err(AnalyzerError::storage(
            "no persistence backend enabled (build with the sqlite feature)",
        ))
    }
}

fn run_analyze(
    config: &dyn ConfigPort,
    ticker: &str,
    start: &str,
    end: &str,
    chart: Option<&Path>,
    export: Option<&Path>,
    preview: Option<usize>,
) -> Result<(), AnalyzerError> {
    let request = AnalysisRequest::parse(ticker, start, end)?;
    let metrics_config = build_metrics_config(config)?;
    let data = build_data_port(config)?;
    let store = build_store(config)?;

    eprintln!(
        "Analyzing {} from {} to {} ({})...",
        request.instrument,
        request.range.start.format(DATE_FORMAT),
        request.range.end.format(DATE_FORMAT),
        data.name()
    );

    let mut worker = AnalysisWorker::spawn(data, store, metrics_config)?;
    worker.submit(request)?;
    let response = worker.recv().ok_or(AnalyzerError::Cancelled)?;
    worker.shutdown();

    let outcome = match response {
        WorkerResponse::Completed { outcome, .. } => outcome,
        WorkerResponse::Failed { error, .. } => return Err(error),
    };

    if let Some(rows) = preview {
        println!("{}", format_preview(&outcome.series, &outcome.momentum, rows));
    }
    print!("{}", format_metrics(&outcome.metrics));

    report_persistence(&outcome);

    if let Some(path) = chart {
        fs::write(path, render_price_chart(&outcome.series, &outcome.overlay))?;
        eprintln!("Chart written to {}", path.display());
    }
    if let Some(path) = export {
        CsvExporter.export(&outcome.series, path)?;
        eprintln!("Data exported to {}", path.display());
    }

    Ok(())
}

fn report_persistence(outcome: &AnalysisOutcome) {
    match &outcome.storage_warning {
        Some(warning) => eprintln!("warning: results not saved: {warning}"),
        None => eprintln!("Saved {} rows", outcome.rows_persisted),
    }
}

fn run_download(
    config: &dyn ConfigPort,
    ticker: &str,
    start: &str,
    end: &str,
    output: &Path,
) -> Result<(), AnalyzerError> {
    let request = AnalysisRequest::parse(ticker, start, end)?;
    let data = build_data_port(config)?;
    let series = fetch_series(data.as_ref(), &request)?;

    CsvExporter.export(&series, output)?;
    eprintln!(
        "Data for {} downloaded successfully: {} rows written to {}",
        series.instrument(),
        series.len(),
        output.display()
    );
    Ok(())
}

#[cfg(feature = "yahoo")]
fn run_info(config: &dyn ConfigPort, ticker: &str) -> Result<(), AnalyzerError> {
    use crate::adapters::yahoo_adapter::YahooAdapter;
    use crate::ports::metadata_port::MetadataPort;

    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(AnalyzerError::InvalidInstrument {
            instrument: String::new(),
            reason: "instrument must not be empty".into(),
        });
    }
    let info = YahooAdapter::from_config(config)?.lookup(ticker)?;
    for line in info.lines() {
        println!("{line}");
    }
    Ok(())
}

#[cfg(not(feature = "yahoo"))]
fn run_info(_config: &dyn ConfigPort, _ticker: &str) -> Result<(), AnalyzerError> {
    Err(AnalyzerError::ConfigInvalid {
        section: "data".into(),
        key: "source".into(),
        reason: "company lookup requires the yahoo feature".into(),
    })
}

#[cfg_attr(not(any(feature = "sqlite", feature = "postgres")), allow(dead_code))]
fn print_stored(
    ticker: &str,
    range: Option<(chrono::NaiveDate, chrono::NaiveDate, usize)>,
    bars: &[Bar],
) {
    match range {
        Some((first, last, count)) => {
            println!(
                "{}: {} rows from {} to {}",
                ticker,
                count,
                first.format(DATE_FORMAT),
                last.format(DATE_FORMAT)
            );
            if let Some(bar) = bars.last() {
                let change = bar
                    .change
                    .map(|c| format!("{:.4}%", c * 100.0))
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "Latest: {} close {:.2} adj close {:.2} change {}",
                    bar.date.format(DATE_FORMAT),
                    bar.close,
                    bar.adj_close,
                    change
                );
            }
        }
        None => println!("No stored data for {ticker}"),
    }
}

fn run_stored(config: &dyn ConfigPort, ticker: &str) -> Result<(), AnalyzerError> {
    let ticker = ticker.trim().to_uppercase();

    #[cfg(feature = "postgres")]
    {
        if config.get_string("postgres", "connection_string").is_some() {
            let adapter = crate::adapters::postgres_adapter::PostgresAdapter::from_config(config)?;
            print_stored(&ticker, adapter.get_data_range(&ticker)?, &adapter.load_bars(&ticker)?);
            return Ok(());
        }
    }

    #[cfg(feature = "sqlite")]
    {
        let adapter = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
        print_stored(&ticker, adapter.get_data_range(&ticker)?, &adapter.load_bars(&ticker)?);
        Ok(())
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config, &ticker);
        Err(AnalyzerError::storage(
            "no persistence backend enabled (build with the sqlite feature)",
        ))
    }
}
