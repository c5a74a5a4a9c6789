#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for census profile extraction.
//!
//! Reads a flattened profile worksheet and an area reference list from
//! CSV, runs the extraction engine, upserts the records by natural key,
//! and writes records (CSV) and per-area summaries (JSON).

mod store;
mod table;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use census_profile::config::{builtin_config, parse_config};
use census_profile::extract::extract_profile;
use census_profile_cli_utils::{IndicatifProgress, init_logger};
use census_profile_models::config::ProfileConfig;
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::store::RecordStore;

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Profile(#[from] census_profile::ProfileError),

    /// The worksheet header has no area columns.
    #[error("Table has no area columns")]
    NoAreaColumns,
}

#[derive(Parser)]
#[command(name = "census_profile", about = "Census profile extraction tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract normalized records from a flattened profile worksheet
    Extract {
        /// Worksheet CSV (first column: characteristic, other columns: areas)
        #[arg(long)]
        table: PathBuf,
        /// Area reference CSV with `area_id,area_name` headers
        #[arg(long)]
        areas: PathBuf,
        /// Census year stamped on every record
        #[arg(long)]
        year: u16,
        /// Profile configuration TOML (defaults to the built-in one)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output CSV for profile records
        #[arg(long, default_value = "profile_records.csv")]
        records: PathBuf,
        /// Output JSON for per-area summaries
        #[arg(long)]
        summaries: Option<PathBuf>,
    },
    /// List the configured section anchors
    Sections {
        /// Profile configuration TOML (defaults to the built-in one)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Loads the configuration from `path`, or the built-in one.
fn load_config(path: Option<&Path>) -> Result<ProfileConfig, CliError> {
    let Some(path) = path else {
        return Ok(builtin_config());
    };
    log::info!("Loading profile config from {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Ok(parse_config(&text)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sections { config } => {
            let config = load_config(config.as_deref())?;
            println!("{:<24} ANCHOR", "CATEGORY");
            println!("{}", "-".repeat(72));
            for section in &config.sections {
                println!("{:<24} {}", section.category.as_ref(), section.start_anchor);
            }
            println!();
            println!(
                "City-wide top {}: {}",
                config.city_wide_top_k.k, config.city_wide_top_k.category
            );
            println!(
                "Per-area top {}: {} (always: {})",
                config.per_area_top_k.k,
                config.per_area_top_k.category,
                config.per_area_top_k.always_include.join(", ")
            );
        }
        Commands::Extract {
            table,
            areas,
            year,
            config,
            records,
            summaries,
        } => {
            let config = load_config(config.as_deref())?;
            let rows = table::read_table(BufReader::new(File::open(&table)?))?;
            let areas = table::read_areas(BufReader::new(File::open(&areas)?))?;

            let start = Instant::now();
            let progress = IndicatifProgress::steps_bar(&multi, "Extracting profile");
            let extraction = extract_profile(&rows, &areas, year, &config, progress.as_ref());

            let mut store = RecordStore::default();
            let stats = store.upsert_all(extraction.records);
            log::info!(
                "Upserted {} records ({} new, {} replaced)",
                store.len(),
                stats.inserted,
                stats.updated
            );

            let written =
                table::write_records(BufWriter::new(File::create(&records)?), store.records())?;
            log::info!("Wrote {written} records to {}", records.display());

            if let Some(path) = summaries {
                serde_json::to_writer_pretty(
                    BufWriter::new(File::create(&path)?),
                    &extraction.summaries,
                )?;
                log::info!(
                    "Wrote {} area summaries to {}",
                    extraction.summaries.len(),
                    path.display()
                );
            }

            let report = &extraction.report;
            println!("Sections detected: {}", report.sections_detected);
            println!("Tagged rows:       {}", report.tagged_rows);
            println!("Records emitted:   {}", report.records_emitted);
            println!("Records skipped:   {}", report.records_skipped);
            println!("Areas matched:     {}", report.matched_areas);
            if !report.unmatched_labels.is_empty() {
                println!("Unmatched columns: {}", report.unmatched_labels.join(", "));
            }
            println!("Elapsed:           {:.1}s", start.elapsed().as_secs_f64());
        }
    }

    Ok(())
}
