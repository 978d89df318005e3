//! Point d'entrée CLI pour shapefile-to-sqlite

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use shapefile_to_sqlite::cli::{self, Cli};
use shapefile_to_sqlite::config::load_env;

fn main() -> Result<()> {
    // Charger .env avant tout (SPATIALITE_LIBRARY_PATH)
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    info!(
        db = %cli.db_path.display(),
        files = cli.shapefiles.len(),
        "Import vers SQLite"
    );

    let report = cli::run(&cli)?;

    if !cli.quiet {
        report.display();
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
