use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clipflux_core::{
    parse_range_date, report, AnalysisConfig, Artifact, ClippingPolicy, Pipeline, Storage,
};
use comfy_table::{presets::UTF8_FULL, Table};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Clipping loss analysis for metered generation", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults to $CLIPFLUX_CONFIG, then ./clipflux.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the CSV artifacts
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,
    /// Rule used for loss with clipping
    #[arg(long, global = true, value_enum)]
    policy: Option<PolicyArg>,
    /// Clipping threshold in MWh per interval
    #[arg(long, global = true)]
    threshold: Option<f64>,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy a raw CSV export into the storage root as data.csv
    Import(ImportArgs),
    /// data.csv -> cleaned_data.csv
    Clean,
    /// cleaned_data.csv -> calculated_data.csv
    Calculate(RangeArgs),
    /// calculated_data.csv -> analysed_data.csv
    Analyse,
    /// Import a raw CSV and run every step
    Run(RunArgs),
    /// Print the daily loss table
    Report(ReportArgs),
    /// Print one day's energy curve against the clipping line
    Curve(CurveArgs),
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Raw CSV with a `Time` column and the power reading in the second column
    input: PathBuf,
}

#[derive(Args, Debug)]
struct RangeArgs {
    /// Capacity increment applied to measured energy
    #[arg(long)]
    increment_value: i32,
    /// First day kept, dd-mm-yyyy
    #[arg(long)]
    start_date: String,
    /// Last day kept, dd-mm-yyyy
    #[arg(long)]
    end_date: String,
}

#[derive(Args, Debug)]
struct RunArgs {
    input: PathBuf,
    #[command(flatten)]
    range: RangeArgs,
}

#[derive(Args, Debug, Default)]
struct ReportArgs {
    /// Restrict to one month, e.g. "January 2023"
    #[arg(long)]
    month: Option<String>,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct CurveArgs {
    /// Day to plot, yyyy-mm-dd
    #[arg(long)]
    day: NaiveDate,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PolicyArg {
    Simple,
    Piecewise,
}

impl From<PolicyArg> for ClippingPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Simple => ClippingPolicy::Simple,
            PolicyArg::Piecewise => ClippingPolicy::Piecewise,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = resolve_config(&cli)?;
    let storage = config.storage();
    let pipeline = Pipeline::new(config);

    match cli.command {
        Command::Import(args) => {
            let path = storage
                .import_raw(&args.input)
                .with_context(|| format!("failed to import {}", args.input.display()))?;
            info!(path = %path.display(), "raw data imported");
            Ok(())
        }
        Command::Clean => {
            pipeline.clean(&storage)?;
            Ok(())
        }
        Command::Calculate(range) => {
            let params = projection(&pipeline, &range)?;
            pipeline.calculate(&storage, &params)?;
            Ok(())
        }
        Command::Analyse => {
            let output = pipeline.analyse(&storage)?;
            print_daily(&report::daily_aggregates(&output.daily)?);
            Ok(())
        }
        Command::Run(args) => {
            let params = projection(&pipeline, &args.range)?;
            storage
                .import_raw(&args.input)
                .with_context(|| format!("failed to import {}", args.input.display()))?;
            let output = pipeline.run_stored(&storage, &params)?;
            print_daily(&report::daily_aggregates(&output.daily)?);
            Ok(())
        }
        Command::Report(args) => handle_report(&storage, args),
        Command::Curve(args) => handle_curve(&pipeline, &storage, args),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn resolve_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config =
        AnalysisConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    if let Some(root) = &cli.storage_root {
        config.storage_root = root.clone();
    }
    if let Some(policy) = cli.policy {
        config.clipping_policy = policy.into();
    }
    if let Some(threshold) = cli.threshold {
        config.clipping_threshold = threshold;
    }
    config.validate()?;

    info!(
        storage_root = %config.storage_root.display(),
        policy = config.clipping_policy.as_str(),
        threshold = config.clipping_threshold,
        interval_hours = config.interval_hours,
        "configuration resolved"
    );
    Ok(config)
}

fn projection(
    pipeline: &Pipeline,
    range: &RangeArgs,
) -> Result<clipflux_core::ProjectionParams> {
    let start = parse_range_date(&range.start_date)?;
    let end = parse_range_date(&range.end_date)?;
    if start > end {
        warn!(%start, %end, "start date is after end date; the range is empty");
    }
    Ok(pipeline.projection(range.increment_value, start, end))
}

fn handle_report(storage: &Storage, args: ReportArgs) -> Result<()> {
    let daily = storage.read(Artifact::Analysed)?;
    let mut rows = report::daily_aggregates(&daily)?;

    let months = report::months(&rows);
    if let Some(month) = &args.month {
        rows = report::filter_month(&rows, month);
        if rows.is_empty() {
            bail!("no days in '{month}'; available months: {}", months.join(", "));
        }
    } else if months.len() > 1 {
        info!(months = %months.join(", "), "analysis spans several months; use --month to narrow");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_daily(&rows);
    }
    Ok(())
}

fn handle_curve(pipeline: &Pipeline, storage: &Storage, args: CurveArgs) -> Result<()> {
    let calculated = storage.read(Artifact::Calculated)?;
    let threshold = pipeline.config().clipping_threshold;
    let points = report::day_curve(&calculated, args.day, threshold)?;
    if points.is_empty() {
        bail!("no readings for {} in the calculated data", args.day);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Time Interval",
        "Energy MWh",
        "Incremented Energy MWh",
        "Clipping Line",
    ]);
    for point in &points {
        table.add_row(vec![
            point.time_interval.clone(),
            format_value(point.energy),
            format_value(point.incremented_energy),
            format!("{:.3}", point.clipping_line),
        ]);
    }
    println!("Energy curve for {}", args.day);
    println!("{table}");
    Ok(())
}

fn print_daily(rows: &[report::DailyAggregate]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Day",
        "Loss Without Clipping",
        "Loss With Clipping",
        "Loss Difference",
    ]);
    for row in rows {
        table.add_row(vec![
            row.day.to_string(),
            format!("{:.3}", row.loss_without_clipping_total),
            format!("{:.3}", row.loss_with_clipping_total),
            format!("{:.3}", row.loss_difference_total),
        ]);
    }
    println!("{table}");
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_else(|| "-".to_string())
}
