//! Store inventory normalizer.
//!
//! Collapses `products` rows that share (brand_id, flavor) into a single
//! `store_products` entry per store, merging their categories.
//!
//! Inserts are insert-or-ignore: a (store_id, product_id) pair that already
//! exists keeps its original categories. Enrichment happens at most once per
//! product_id, so products imported after a group was written do not extend
//! its category list.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::NormalizeConfig;
use crate::error::RecordError;
use crate::models::{ProductIndex, ProductKey, ProductRow, StoreProductGroup};
use crate::progress::{create_progress_bar, format_duration, log_progress};
use crate::schema::{ensure_store, init_schema, open_existing_database, table_exists};

const WRITE_BATCH_SIZE: usize = 10_000;
const LOG_INTERVAL: u64 = 10_000;

// ============================================================================
// Summary
// ============================================================================

/// Outcome of one normalizer run.
#[derive(Default, Debug, Clone, Serialize)]
pub struct NormalizeSummary {
    pub store_id: i64,
    pub products_read: usize,
    pub products_skipped: usize, // rows without a brand_id
    pub groups: usize,
    pub inserted: usize,
    pub already_present: usize,
    pub failures: usize,
    pub elapsed_seconds: f64,
}

impl NormalizeSummary {
    pub fn print(&self) {
        println!("\n{:=<60}", "");
        println!("Successfully normalized product data into store_products.");
        println!("  Store: {}", self.store_id);
        println!("  Products read: {}", self.products_read);
        if self.products_skipped > 0 {
            println!("  Products skipped (no brand): {}", self.products_skipped);
        }
        println!("  Unique (brand, flavor) groups: {}", self.groups);
        println!("  Inserted: {}", self.inserted);
        println!("  Already present (ignored): {}", self.already_present);
        println!("  Failed: {}", self.failures);
        println!(
            "  Elapsed: {}",
            format_duration(Duration::from_secs_f64(self.elapsed_seconds))
        );
        println!("{:=<60}", "");
    }

    /// Write the summary to a JSON file
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write stats to {:?}", path))?;
        Ok(())
    }
}

// ============================================================================
// Phases
// ============================================================================

/// Phase 1: read every product, oldest first. Rows with a NULL brand_id
/// cannot be grouped and are returned separately as a count.
pub fn read_products(conn: &Connection) -> Result<(Vec<ProductRow>, usize)> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT product_id, brand_id, flavor, category FROM products ORDER BY product_id",
    )?;
    let mut rows = stmt.query([])?;

    let mut products = Vec::with_capacity(count as usize);
    let mut skipped = 0usize;
    while let Some(row) = rows.next()? {
        let product_id: i64 = row.get(0)?;
        let brand_id: Option<i64> = row.get(1)?;
        let Some(brand_id) = brand_id else {
            warn!(product_id, "Skipping product without brand_id");
            skipped += 1;
            continue;
        };
        products.push(ProductRow {
            product_id,
            brand_id,
            flavor: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            category: row.get(3)?,
        });
    }

    Ok((products, skipped))
}

/// Phase 2: group products by (brand_id, flavor), keeping groups in the
/// order their first product was seen.
pub fn group_products(products: Vec<ProductRow>) -> Vec<StoreProductGroup> {
    let mut index = ProductIndex::default();
    let mut groups: Vec<StoreProductGroup> = Vec::new();

    for product in products {
        let key = ProductKey::new(product.brand_id, product.flavor);
        let idx = match index.get(&key) {
            Some(&idx) => idx,
            None => {
                groups.push(StoreProductGroup::new(key.clone(), product.product_id));
                index.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[idx].add_category(product.category.as_deref());
    }

    groups
}

/// Counts from writing groups to `store_products`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteCounts {
    pub inserted: usize,
    pub already_present: usize,
    pub failures: usize,
}

/// Phase 3: insert-or-ignore one row per group. A failed row is logged and
/// skipped; only transaction failures abort.
pub fn write_store_products(
    conn: &mut Connection,
    store_id: i64,
    groups: Vec<StoreProductGroup>,
) -> Result<WriteCounts> {
    let total = groups.len() as u64;
    let pb = create_progress_bar(total, "Writing store products");
    let mut counts = WriteCounts::default();
    let mut done = 0u64;

    let mut groups = groups.into_iter().peekable();
    while groups.peek().is_some() {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO store_products (store_id, product_id, stock_count, categories)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for group in groups.by_ref().take(WRITE_BATCH_SIZE) {
                let sp = group.into_store_product(store_id);
                match stmt.execute(params![sp.store_id, sp.product_id, sp.stock_count, sp.categories]) {
                    Ok(0) => counts.already_present += 1,
                    Ok(_) => counts.inserted += 1,
                    Err(source) => {
                        let err = RecordError::StoreProduct {
                            store_id,
                            product_id: sp.product_id,
                            source,
                        };
                        warn!("{}", err);
                        counts.failures += 1;
                    }
                }
                done += 1;
                pb.inc(1);
                log_progress("WRITE", done, Some(total), LOG_INTERVAL);
            }
        }
        tx.commit().context("Failed to commit store_products batch")?;
    }

    pb.finish_with_message(format!("Wrote {} store products", counts.inserted));
    Ok(counts)
}

/// Read, group and write in one pass against an open connection.
pub fn normalize(conn: &mut Connection, store_id: i64) -> Result<NormalizeSummary> {
    let start = Instant::now();

    ensure_store(conn, store_id)
        .with_context(|| format!("Failed to ensure store {} exists", store_id))?;

    let (products, products_skipped) = read_products(conn)?;
    let products_read = products.len();
    info!(products = products_read, "read products");

    let groups = group_products(products);
    let group_count = groups.len();
    info!(groups = group_count, "found unique (brand, flavor) groups");

    let counts = write_store_products(conn, store_id, groups)?;

    Ok(NormalizeSummary {
        store_id,
        products_read,
        products_skipped,
        groups: group_count,
        inserted: counts.inserted,
        already_present: counts.already_present,
        failures: counts.failures,
        elapsed_seconds: start.elapsed().as_secs_f64(),
    })
}

/// Run the normalizer stage
pub fn run(config: NormalizeConfig) -> Result<NormalizeSummary> {
    info!(db = %config.db_path.display(), store_id = config.store_id, "starting normalization");
    let mut conn = open_existing_database(&config.db_path)?;

    if !table_exists(&conn, "products")? {
        bail!(
            "Database {:?} has no products table; run the importer first",
            config.db_path
        );
    }
    init_schema(&conn)?;

    let summary = normalize(&mut conn, config.store_id)?;

    if let Some(path) = &config.stats_json {
        summary.write_to_file(path)?;
    }
    Ok(summary)
}
