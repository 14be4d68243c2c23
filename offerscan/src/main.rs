use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use offerscan_core::discovery::find_workbooks;
use offerscan_core::{ColumnSpecs, Extractor, LabelSpecs, OfferscanConfig, ReadStatus};
use regex::RegexBuilder;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod formatter;

#[derive(Parser)]
#[command(name = "offerscan")]
#[command(about = "Extract offer workbooks into one flat row per file", long_about = None)]
#[command(version)]
struct Cli {
    /// Workbooks to extract
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Directory to search for workbooks
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Only search first-level folders of DIR whose name matches this regex
    #[arg(long, value_name = "RE")]
    folder_pattern: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Label spec JSON (overrides the config file)
    #[arg(long, value_name = "JSON")]
    labels: Option<PathBuf>,

    /// Column spec JSON (overrides the config file)
    #[arg(long, value_name = "JSON")]
    columns: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Only output records that are not Success
    #[arg(long)]
    failures_only: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON array of rows
    Json,
    /// CSV with a header row
    Csv,
}

fn main() -> Result<()> {
    // Diagnostics stay silent unless RUST_LOG asks for them
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    let _tracing = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .try_init();

    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        OfferscanConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        let default_config_path = PathBuf::from("offerscan.toml");
        if default_config_path.exists() {
            OfferscanConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            OfferscanConfig::default()
        }
    };

    let Some(labels_path) = cli.labels.as_ref().or(config.specs.labels.as_ref()) else {
        bail!("No label spec given: pass --labels or set [specs] labels in the config");
    };
    let labels = LabelSpecs::from_file(labels_path)?;
    let columns = match cli.columns.as_ref().or(config.specs.columns.as_ref()) {
        Some(path) => ColumnSpecs::from_file(path)?,
        None => ColumnSpecs::default(),
    };

    let extractor =
        Extractor::with_config(&config, labels, columns).context("Invalid configuration")?;

    let files = collect_inputs(&cli, &config)?;
    if files.is_empty() {
        bail!("No workbooks to extract");
    }

    let mut progress = formatter::ProgressPrinter::new(cli.format == OutputFormat::Human);
    let mut batch = extractor.extract_batch_with(&files, &mut progress);
    let summary = formatter::Summary::of(&batch);

    if cli.failures_only {
        batch.records.retain(|r| r.read_status != ReadStatus::Success);
    }

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file {}", path.display())
        })?)),
        None => Box::new(io::stdout().lock()),
    };

    match cli.format {
        OutputFormat::Human => formatter::write_human(&mut out, &batch, &summary)?,
        OutputFormat::Json => formatter::write_json(&mut out, &batch)?,
        OutputFormat::Csv => formatter::write_csv(&mut out, &batch)?,
    }
    out.flush().context("Failed to write output")?;

    // Per-file failures are reported in the output, not in the exit code
    Ok(())
}

/// Explicit files first, then whatever discovery finds
fn collect_inputs(cli: &Cli, config: &OfferscanConfig) -> Result<Vec<PathBuf>> {
    let mut files = cli.files.clone();

    let directory = match &cli.dir {
        Some(dir) => Some(dir),
        None if files.is_empty() => config.discovery.directory.as_ref(),
        None => None,
    };
    let Some(directory) = directory else {
        return Ok(files);
    };

    let folder_pattern = cli
        .folder_pattern
        .as_ref()
        .or(config.discovery.folder_pattern.as_ref())
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("Invalid folder pattern: {}", pattern))
        })
        .transpose()?;

    let found = find_workbooks(
        directory,
        folder_pattern.as_ref(),
        &config.discovery.extensions,
    )
    .with_context(|| format!("Failed to search {}", directory.display()))?;
    files.extend(found);
    Ok(files)
}
