//! Merge products sharing brand and flavor into one store inventory row.
//!
//! Usage: normalize-store [products.db] [--store-id N]
//!
//! Run after catalog-import. Existing store_products rows are never changed.

use anyhow::Result;
use catalog_import::config::{NormalizeConfig, DEFAULT_STORE_ID};
use catalog_import::{logging, normalizer, progress};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "normalize-store")]
#[command(about = "Populate store_products with one row per (brand, flavor)")]
struct Args {
    /// Existing catalog database
    #[arg(default_value = "products.db")]
    db: PathBuf,

    #[arg(long, default_value_t = DEFAULT_STORE_ID)]
    store_id: i64,

    /// Write the run summary as JSON to this file
    #[arg(long)]
    stats_json: Option<PathBuf>,

    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing("info")?;
    progress::set_log_only(args.log_only);

    let summary = normalizer::run(NormalizeConfig {
        db_path: args.db,
        store_id: args.store_id,
        stats_json: args.stats_json,
    })?;

    summary.print();
    Ok(())
}
