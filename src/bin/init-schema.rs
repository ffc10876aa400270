//! Create the catalog tables if they do not exist yet.
//!
//! Usage: init-schema [products.db]

use anyhow::Result;
use catalog_import::config::SchemaConfig;
use catalog_import::{logging, schema};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "init-schema")]
#[command(about = "Create brands, products, stores and store_products tables")]
struct Args {
    #[arg(default_value = "products.db")]
    db: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing("info")?;

    schema::run(SchemaConfig { db_path: args.db })
}
