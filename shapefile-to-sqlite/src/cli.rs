//! Arguments et exécution de la commande

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::ImportOptions;
use crate::crs::Crs;
use crate::export::sqlite::{Database, DEFAULT_BATCH_SIZE};
use crate::import::import_path;
use crate::report::ImportReport;

/// Charger des shapefiles dans une base SQLite (ou SpatiaLite)
#[derive(Debug, Parser)]
#[command(name = "shapefile-to-sqlite")]
#[command(author, version)]
#[command(about = "Load shapefiles into a SQLite (optionally SpatiaLite) database")]
pub struct Cli {
    /// SQLite database file (created if missing)
    #[arg(value_name = "DB_PATH")]
    pub db_path: PathBuf,

    /// Shapefiles to import (.shp or .zip)
    #[arg(value_name = "SHAPEFILE", required = true, num_args = 1.., value_parser = existing_file)]
    pub shapefiles: Vec<PathBuf>,

    /// Table name (default: shapefile name)
    #[arg(long)]
    pub table: Option<String>,

    /// Primary key column, rows are upserted on it
    #[arg(long, default_value = "id")]
    pub pk: String,

    /// Add columns missing from an existing table
    #[arg(long)]
    pub alter: bool,

    /// Store geometries with SpatiaLite
    #[arg(long)]
    pub spatialite: bool,

    /// Path to the SpatiaLite module (implies --spatialite)
    #[arg(long = "spatialite_mod", value_name = "PATH")]
    pub spatialite_mod: Option<PathBuf>,

    /// Reproject to this CRS, e.g. epsg:2227 (default with SpatiaLite: epsg:4326)
    #[arg(long)]
    pub crs: Option<Crs>,

    /// Create a spatial index on the geometry column (SpatiaLite only)
    #[arg(long)]
    pub spatial_index: bool,

    /// Extract values of this column into a lookup table
    #[arg(short = 'c', long = "extract-column", value_name = "COLUMN")]
    pub extract_columns: Vec<String>,

    /// Rows written per transaction
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Write a JSON import report to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Mode silencieux
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            table: self.table.clone(),
            pk: Some(self.pk.clone()),
            alter: self.alter,
            spatialite: self.spatialite,
            spatialite_mod: self.spatialite_mod.clone(),
            crs: self.crs,
            spatial_index: self.spatial_index,
            extract_columns: self.extract_columns.clone(),
            batch_size: self.batch_size,
        }
    }
}

fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("Path '{}' does not exist.", value))
    }
}

fn progress_bar(quiet: bool) -> Result<ProgressBar> {
    if quiet || !std::io::stderr().is_terminal() {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Importe chaque shapefile dans la base
pub fn run(cli: &Cli) -> Result<ImportReport> {
    let start = Instant::now();
    let options = cli.import_options();

    let mut db = Database::open(&cli.db_path)
        .with_context(|| format!("Failed to open database {}", cli.db_path.display()))?;

    let mut report = ImportReport::new(&cli.db_path);

    for path in &cli.shapefiles {
        let progress = progress_bar(cli.quiet)?;
        let summary = import_path(&mut db, path, &options, &progress)?;
        progress.finish_and_clear();

        info!(
            path = %path.display(),
            table = %summary.table,
            rows = summary.rows,
            "Shapefile imported"
        );
        report.record(summary);
    }

    report.set_duration(start.elapsed());
    report.finalize();

    if let Some(path) = &cli.report {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report saved");
    }

    Ok(report)
}
