use chrono::{DateTime, NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use health_core::catalog::HEALTH_METRICS;
use health_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "health-exporter")]
#[command(about = "Export health measurements to CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override config file location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export samples from a health data file to CSV
    #[command(group(
        ArgGroup::new("range")
            .args(["last_days", "last_records", "from", "all"])
            .multiple(false)
    ))]
    Export {
        /// JSON file with quantity samples and lab records
        #[arg(long, short)]
        input: PathBuf,

        /// Metrics to export (weight, steps, glucose, a1c); defaults to config
        #[arg(long, value_delimiter = ',')]
        metrics: Vec<String>,

        /// Only today and the previous N-1 days
        #[arg(long)]
        last_days: Option<u32>,

        /// Only the N most recent records per metric
        #[arg(long)]
        last_records: Option<usize>,

        /// First day of a specific range (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Last day of a specific range (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Export all records (default)
        #[arg(long)]
        all: bool,

        /// Weight unit (kg or lbs); defaults to config
        #[arg(long)]
        unit: Option<String>,

        /// Render the Date column in UTC instead of local time
        #[arg(long)]
        utc: bool,

        /// Directory to write the CSV into; defaults to config
        #[arg(long, conflicts_with = "stdout")]
        output_dir: Option<PathBuf>,

        /// Write the CSV to stdout instead of a file
        #[arg(long)]
        stdout: bool,
    },

    /// List exportable metrics and their availability
    Metrics,

    /// Show or change preferences
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Set a value, e.g. `units.weight lbs` or `export.glucose true`
    Set { key: String, value: String },
}

/// Export options after clap parsing
struct ExportArgs {
    input: PathBuf,
    metrics: Vec<String>,
    selection: DateRangeSelection,
    unit: Option<String>,
    utc: bool,
    output_dir: Option<PathBuf>,
    stdout: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    health_core::logging::init();

    let cli = Cli::parse();
    run(cli).await?;
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_or_default(path)?,
        None => Config::load()?,
    };
    let config_path = cli.config.unwrap_or_else(Config::default_config_path);

    match cli.command {
        Commands::Export {
            input,
            metrics,
            last_days,
            last_records,
            from,
            to,
            all: _,
            unit,
            utc,
            output_dir,
            stdout,
        } => {
            let selection = match (last_days, last_records, from, to) {
                (Some(days), _, _, _) => DateRangeSelection::LastDays { days },
                (_, Some(count), _, _) => DateRangeSelection::LastRecords { count },
                (_, _, Some(start), Some(end)) => DateRangeSelection::Between { start, end },
                _ => DateRangeSelection::All,
            };
            let args = ExportArgs {
                input,
                metrics,
                selection,
                unit,
                utc,
                output_dir,
                stdout,
            };
            cmd_export(args, &config).await
        }
        Commands::Metrics => cmd_metrics(&config),
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&config, &config_path),
            ConfigAction::Set { key, value } => cmd_config_set(config, &config_path, &key, &value),
        },
    }
}

fn resolve_metrics(requested: &[String], config: &Config) -> Result<Vec<MetricKind>> {
    if requested.is_empty() {
        return Ok(config.enabled_metrics());
    }

    let mut metrics = Vec::with_capacity(requested.len());
    for name in requested {
        let kind: MetricKind = name.parse()?;
        let entry = catalog::metric_config(kind);
        if !entry.is_available(config.features.paid_account) {
            return Err(Error::Config(format!(
                "{} requires a paid account",
                entry.name
            )));
        }
        metrics.push(kind);
    }
    Ok(metrics)
}

async fn cmd_export(args: ExportArgs, config: &Config) -> Result<()> {
    let metrics = resolve_metrics(&args.metrics, config)?;

    let weight_unit = match args.unit.as_deref() {
        Some(raw) => WeightDisplayUnit::parse(raw)
            .ok_or_else(|| Error::Config(format!("Unknown weight unit: {}", raw)))?,
        None => config.units.weight,
    };
    let zone = if args.utc {
        DisplayZone::Utc
    } else {
        config.export.time_zone
    };

    let request = ExportRequest {
        metrics,
        selection: args.selection,
        formatter: RowFormatter::new(zone, weight_unit),
    };

    let source = JsonFileSource::new(&args.input, zone);
    let started = Utc::now();
    let mut exporter = Exporter::new(&source);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.cancel_on(async {
        let received = tokio::signal::ctrl_c().await.is_ok();
        if received {
            tracing::warn!("Received Ctrl+C, cancelling export");
        }
        received
    });
    let result = exporter.export_at(&request, started, &cancel).await;
    drop(ctrl_c);
    let report = result?;

    // Nothing checks the token past this point; an interrupt ends the process
    let interrupt = tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C while saving, exiting");
            std::process::exit(130);
        }
    });
    let delivered = deliver(&args, config, zone, &started, &request, &report);
    interrupt.abort();
    delivered?;

    for kind in report.failed_metrics() {
        eprintln!("Warning: could not read {} data, exported without it", kind);
    }
    let rejected = report.total_rejected();
    if rejected > 0 {
        eprintln!("Note: skipped {} invalid samples", rejected);
    }

    Ok(())
}

fn deliver(
    args: &ExportArgs,
    config: &Config,
    zone: DisplayZone,
    started: &DateTime<Utc>,
    request: &ExportRequest,
    report: &ExportReport,
) -> Result<()> {
    let filename = export_filename(zone, started);

    if args.stdout {
        WriterSink::stdout().deliver_document(&filename, &report.document)?;
    } else {
        let dir = args
            .output_dir
            .clone()
            .unwrap_or_else(|| config.export.output_dir.clone());
        let mut sink = DirectorySink::new(dir);
        sink.deliver_document(&filename, &report.document)?;
        let path = sink
            .last_written()
            .map(|p| p.display().to_string())
            .unwrap_or(filename);

        println!("✓ Exported {} rows", report.document.len());
        println!("  Range: {}", request.selection.option());
        for (kind, count) in report.document.counts() {
            println!("  {:<16} {}", kind.label(), count);
        }
        println!("  File: {}", path);
    }

    Ok(())
}

fn cmd_metrics(config: &Config) -> Result<()> {
    let paid = config.features.paid_account;
    for metric in HEALTH_METRICS {
        let status = if !metric.is_available(paid) {
            "unavailable (requires paid account)"
        } else if config.export.is_enabled(metric.kind) {
            "enabled"
        } else {
            "disabled"
        };
        println!("{:<16} {}", metric.name, status);
    }
    Ok(())
}

fn cmd_config_show(config: &Config, path: &Path) -> Result<()> {
    let rendered = config.to_toml()?;
    println!("# {}", path.display());
    print!("{}", rendered);
    Ok(())
}

fn cmd_config_set(mut config: Config, path: &Path, key: &str, value: &str) -> Result<()> {
    config.set(key, value)?;
    config.save_to(path)?;
    println!("✓ {} = {}", key, value);
    Ok(())
}
