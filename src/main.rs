//! Import product rows from a store CSV into the catalog database.
//!
//! Usage: catalog-import <products.csv> [products.db]

use anyhow::Result;
use catalog_import::config::{ColumnLayout, ImportConfig};
use catalog_import::{importer, logging, progress};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "catalog-import")]
#[command(about = "Import product rows from a CSV file, resolving brands as they appear")]
struct Args {
    /// CSV file with a header row and seven columns per product
    csv: PathBuf,

    /// SQLite database (created if missing)
    #[arg(default_value = "products.db")]
    db: PathBuf,

    /// Column order of the CSV, comma-separated
    #[arg(
        long,
        default_value = "category,brand,price,nicotine_amount,bottle_size,description,flavor"
    )]
    columns: ColumnLayout,

    /// Write the run summary as JSON to this file
    #[arg(long)]
    stats_json: Option<PathBuf>,

    /// Hide progress bars and log periodic progress lines instead
    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing("info")?;
    progress::set_log_only(args.log_only);

    let summary = importer::run(ImportConfig {
        csv_path: args.csv,
        db_path: args.db,
        layout: args.columns,
        stats_json: args.stats_json,
    })?;

    summary.print();
    Ok(())
}
