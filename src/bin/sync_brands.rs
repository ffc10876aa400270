//! Register every brand named in a store CSV without importing products.
//!
//! Usage: sync-brands <products.csv> [products.db]

use anyhow::Result;
use catalog_import::config::{BrandSyncConfig, ColumnLayout};
use catalog_import::{brand_sync, logging, progress};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sync-brands")]
#[command(about = "Ensure a brands row exists for every brand in a CSV file")]
struct Args {
    csv: PathBuf,

    #[arg(default_value = "products.db")]
    db: PathBuf,

    /// Column order of the CSV, comma-separated
    #[arg(
        long,
        default_value = "category,brand,price,nicotine_amount,bottle_size,description,flavor"
    )]
    columns: ColumnLayout,

    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing("info")?;
    progress::set_log_only(args.log_only);

    let summary = brand_sync::run(BrandSyncConfig {
        csv_path: args.csv,
        db_path: args.db,
        layout: args.columns,
    })?;

    summary.print();
    Ok(())
}
