//! CLI entry point for the food desert atlas pipeline.
//!
//! Provides subcommands for labeling tract CSVs, building the state-level
//! dataset behind the dashboard charts, and building the tract-level detail
//! map data for a single state.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use food_desert_atlas::analyzers::analyzer::{
    build_state_level, build_tract_detail, label_file, publish_state_level, publish_tract_detail,
};
use food_desert_atlas::config::{
    DEFAULT_GEO_IDS_SOURCE, DEFAULT_STATE_FIPS, DataPaths, OutputFormat, OutputTarget,
};
use food_desert_atlas::fetch::BasicClient;
use food_desert_atlas::output::{print_diagnostics, print_pretty};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "food_desert_atlas")]
#[command(about = "Builds food desert datasets from USDA atlas and census data", long_about = None)]
struct Cli {
    /// Directory holding the default input files
    #[arg(long, global = true, env = "FOOD_DESERT_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// File to write the dataset to
    #[arg(short, long)]
    output: PathBuf,

    /// Gzip compress the output
    #[arg(long, default_value_t = false)]
    gzip: bool,

    /// Optional: S3 bucket to publish the dataset to (e.g., "my-bucket")
    #[arg(long, env = "S3_BUCKET")]
    s3_bucket: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a food_desert_label column to a CSV with the four LILA indicators
    Label {
        /// CSV to label
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Where to write the labeled CSV
        #[arg(short, long, default_value = "labeled.csv")]
        output: PathBuf,
    },
    /// Build the state-level dataset consumed by the dashboard charts
    StateLevel {
        /// Combined census/economic CSV (defaults to the data directory copy)
        #[arg(long)]
        census: Option<PathBuf>,

        /// State name to id table, as a path or URL
        #[arg(long, env = "GEO_IDS_SOURCE", default_value = DEFAULT_GEO_IDS_SOURCE)]
        geo_ids: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        #[command(flatten)]
        out: OutputArgs,
    },
    /// Build the tract-level detail GeoJSON for one state
    Tracts {
        /// State food-access atlas CSV (defaults to the data directory copy)
        #[arg(long)]
        atlas: Option<PathBuf>,

        /// Tract boundary GeoJSON (defaults to the data directory copy)
        #[arg(long)]
        boundaries: Option<PathBuf>,

        /// State FIPS code to keep
        #[arg(long, env = "STATE_FIPS", default_value_t = DEFAULT_STATE_FIPS)]
        state_fips: u32,

        /// Keep only tracts in this county, e.g. "Wayne County"
        #[arg(long, env = "COUNTY")]
        county: Option<String>,

        #[command(flatten)]
        out: OutputArgs,
    },
}

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/food_desert_atlas.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("food_desert_atlas.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_logging()?;
    let cli = Cli::parse();
    let paths = DataPaths::from_dir(&cli.data_dir);

    match cli.command {
        Commands::Label { input, output } => {
            label_file(&input, &output)?;
        }
        Commands::StateLevel {
            census,
            geo_ids,
            format,
            out,
        } => {
            let paths = paths.with_overrides(census, None, None);
            let client = BasicClient::new().context("Failed to build HTTP client")?;

            let dataset = build_state_level(&client, &paths.census, &geo_ids).await?;
            print_pretty(&dataset);
            print_diagnostics(&dataset)?;

            let target = OutputTarget {
                path: out.output,
                format,
                gzip: out.gzip,
            };
            publish_state_level(&dataset, &target, out.s3_bucket.as_deref()).await?;
        }
        Commands::Tracts {
            atlas,
            boundaries,
            state_fips,
            county,
            out,
        } => {
            let paths = paths.with_overrides(None, atlas, boundaries);
            let client = BasicClient::new().context("Failed to build HTTP client")?;

            let tracts = build_tract_detail(
                &client,
                &paths.food_atlas,
                &paths.tract_boundaries,
                state_fips,
                county.as_deref(),
            )
            .await?;

            let target = OutputTarget {
                path: out.output,
                format: OutputFormat::Json,
                gzip: out.gzip,
            };
            publish_tract_detail(
                &tracts,
                &target,
                out.s3_bucket.as_deref(),
                state_fips,
                county.as_deref(),
            )
            .await?;
        }
    }

    info!("Done");
    Ok(())
}
