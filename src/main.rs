//! CLI entry point for the live update profiler.
//!
//! Provides subcommands for profiling a directory of compressed live update
//! fragments, regrouping their connections per update, and summarizing a
//! saved profile file.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, Subcommand};
use rt_update_profiler::analyzers::summary::summarize;
use rt_update_profiler::analyzers::types::{Granularity, SummaryWindow};
use rt_update_profiler::{
    fragments::{count_updates, split_by_update},
    output::{print_json, print_series, write_buckets_csv},
    profile::{load_profiles, save_profiles},
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "rt_update_profiler")]
#[command(about = "Profile compressed real-time transit update logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count connections and time bounds per update and save them as JSON
    Count {
        /// Directory of gzip-compressed newline-delimited JSON fragments
        #[arg(short, long, default_value = "data/fragments")]
        input_dir: String,

        /// Profile file to write (overwritten)
        #[arg(short, long, default_value = "rt_analysis.json")]
        output: String,
    },
    /// Regroup connections into one file per update
    Split {
        /// Directory of gzip-compressed newline-delimited JSON fragments
        #[arg(short, long, default_value = "data/fragments")]
        input_dir: String,

        /// Directory receiving one `<update>.json` file per update
        #[arg(short, long, default_value = "data/updates")]
        output_dir: String,
    },
    /// Summarize a saved profile file
    Summarize {
        /// Profile file written by `count`
        #[arg(short, long, default_value = "rt_analysis.json")]
        profile: String,

        /// Only include updates at or after this RFC 3339 time
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Only include updates before this RFC 3339 time
        #[arg(long)]
        to: Option<DateTime<Utc>>,

        /// UTC offset used to format day and hour buckets (e.g. +01:00 for Brussels)
        #[arg(long, default_value = "+00:00", allow_hyphen_values = true)]
        utc_offset: FixedOffset,

        /// Bucket size for the printed connection series
        #[arg(long, value_enum, default_value_t = Granularity::Hour)]
        per: Granularity,

        /// Also log the full summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Optional: write the bucketed series to this CSV file
        #[arg(long)]
        csv: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/rt_update_profiler.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("rt_update_profiler.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

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

    let cli = Cli::parse();

    match cli.command {
        Commands::Count { input_dir, output } => {
            let profiles = count_updates(&input_dir).await?;
            save_profiles(&output, &profiles).await?;
        }
        Commands::Split {
            input_dir,
            output_dir,
        } => {
            let lines = split_by_update(&input_dir, &output_dir).await?;
            info!(lines, output_dir = %output_dir, "Connections regrouped per update");
        }
        Commands::Summarize {
            profile,
            from,
            to,
            utc_offset,
            per,
            json,
            csv,
        } => {
            let profiles = load_profiles(&profile).await?;
            let summary = summarize(&profiles, SummaryWindow { from, to }, utc_offset);

            match &summary.largest_update {
                Some(largest) => info!(
                    connections = largest.connections,
                    at = %largest.at.to_rfc3339(),
                    "Maximum amount of connections"
                ),
                None => info!("No updates in the selected window"),
            }
            info!(
                updates = summary.updates,
                avg_connections = summary.avg_connections,
                stddev_connections = summary.stddev_connections,
                avg_window_hours = summary.avg_window_hours,
                "Profile summary"
            );

            if json {
                print_json(&summary)?;
            }

            let buckets = summary.buckets(per);
            print_series(buckets.values())?;

            if let Some(path) = csv {
                write_buckets_csv(&path, buckets)
                    .with_context(|| format!("failed to write bucket CSV {}", path))?;
                info!(path = %path, rows = buckets.len(), "Bucket CSV written");
            }
        }
    }

    Ok(())
}
