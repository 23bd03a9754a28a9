//! Command-line interface for `shapeload`, a shapefile input normalization tool.
//!
//! This binary provides a thin front end to the [`shapeload_core`] library for
//! inspecting how a shapefile dataset will be read: which input modality it is
//! classified as, which member streams are found, and whether its projection
//! can be resolved.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for structured logging.
//! Library crates log through the `log` facade, which is bridged into `tracing`.
//!
//! # Available Commands
//!
//! - `info` - Resolve a dataset's member streams and projection
//! - `members` - List the shapefile members and their roles

mod display;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use tabled::Table;
use tracing::{Level, debug, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use shapeload_core::{
    BufferCoercion, Modality, ObjectStoreFetcher, ProjectionResolver, ShapefileBundle,
    ShapefileInput, ShapeloadError, SourceResolver, ZipExtractor,
};

use crate::display::{DatasetReport, ProjectionStatus, display_dataset_report, member_rows};

#[derive(Parser)]
#[command(
    name = "shapeload",
    version,
    about = "Shapefile input normalization and feature assembly",
    long_about = "shapeload resolves shapefile datasets supplied as URLs, local paths, zip archives\n\
                  or individual member files into the streams a loader decodes."
)]
/// Command-line arguments and options for the `shapeload` CLI.
///
/// This struct defines the top-level CLI interface, including global flags for
/// logging verbosity and the subcommand to execute.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `shapeload` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Displays the members and projection of a shapefile dataset.
    ///
    /// The dataset is a URL or path, a zip archive given with `--archive`, or
    /// individual member files given with `--shp` and friends.
    Info(InfoArgs),

    /// Lists the shapefile members and their roles.
    Members,
}

/// Dataset selection for the `info` subcommand.
#[derive(Args, Debug, Default)]
struct InfoArgs {
    /// URL or path of the dataset or its `.shp` file.
    #[arg(
        value_name = "DATASET",
        required_unless_present_any = ["archive", "shp"],
        conflicts_with_all = ["archive", "shp"]
    )]
    input: Option<String>,

    /// Zip archive holding the dataset.
    #[arg(long, value_name = "ZIP", conflicts_with = "shp")]
    archive: Option<PathBuf>,

    /// Geometry (`.shp`) file.
    #[arg(long, value_name = "FILE")]
    shp: Option<PathBuf>,

    /// Attribute (`.dbf`) file.
    #[arg(long, value_name = "FILE", requires = "shp")]
    dbf: Option<PathBuf>,

    /// Projection (`.prj`) file.
    #[arg(long, value_name = "FILE", requires = "shp")]
    prj: Option<PathBuf>,

    /// Code page (`.cpg`) file.
    #[arg(long, value_name = "FILE", requires = "shp")]
    cpg: Option<PathBuf>,
}

/// Entry point for the `shapeload` command-line interface.
///
/// This function parses command-line arguments, configures the logging system based on
/// verbosity flags, and dispatches to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if command execution fails or if the logging system cannot be initialized.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity flags
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true) // Show module paths for better context
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Info(args) => {
            let report = handle_info(&args).await?;
            display_dataset_report(&report);
        },
        Commands::Members => handle_members(),
    }

    Ok(())
}

/// Resolves the dataset selected by `args` into a report.
async fn handle_info(args: &InfoArgs) -> Result<DatasetReport> {
    let (dataset, input) = dataset_input(args).await?;
    info!("Resolving {dataset}");

    let coercion = BufferCoercion::default();
    let modality = Modality::classify(input, &coercion).map_err(user_error)?;
    let kind = modality.name();
    debug!("Classified {dataset} as {kind} input");

    let resolver = SourceResolver::new(ObjectStoreFetcher::default(), ZipExtractor, coercion);
    let streams = resolver.resolve(modality).await.map_err(user_error)?;

    let projection =
        projection_status(&ProjectionResolver::default(), streams.projection.as_deref());

    Ok(DatasetReport {
        dataset,
        modality: kind,
        streams,
        projection,
    })
}

/// Handles the `members` subcommand by printing the member reference table.
fn handle_members() {
    let rows = member_rows();
    println!("\nShapefile Members ({} total):\n", rows.len());
    println!("{}", Table::new(rows));
}

async fn dataset_input(args: &InfoArgs) -> Result<(String, ShapefileInput)> {
    if let Some(path) = &args.archive {
        let archive = read_file(path).await?;
        return Ok((path.display().to_string(), archive.into()));
    }

    if let Some(shp) = &args.shp {
        let mut bundle = ShapefileBundle::new(read_file(shp).await?);
        if let Some(path) = &args.dbf {
            bundle = bundle.with_dbf(read_file(path).await?);
        }
        if let Some(path) = &args.prj {
            bundle = bundle.with_prj(read_file(path).await?);
        }
        if let Some(path) = &args.cpg {
            bundle = bundle.with_cpg(read_file(path).await?);
        }
        return Ok((shp.display().to_string(), bundle.into()));
    }

    let location = args
        .input
        .clone()
        .context("A dataset, --archive or --shp is required")?;
    Ok((location.clone(), location.into()))
}

async fn read_file(path: &Path) -> Result<Bytes> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Bytes::from(bytes))
}

fn projection_status(resolver: &ProjectionResolver, text: Option<&str>) -> ProjectionStatus {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return ProjectionStatus::Absent;
    };
    match resolver.try_resolve_transform(text) {
        Ok(transform) => ProjectionStatus::Resolved {
            source: transform.source_definition().to_string(),
            target: transform.target_definition().to_string(),
        },
        Err(e) => ProjectionStatus::Ignored {
            reason: e.to_string(),
        },
    }
}

fn user_error(e: ShapeloadError) -> anyhow::Error {
    let message = match e.recovery_suggestion() {
        Some(hint) => format!("{}\nHint: {hint}", e.user_message()),
        None => e.user_message(),
    };
    anyhow::Error::new(e).context(message)
}
