//! Brand pre-registration.
//!
//! Walks a product CSV and makes sure every brand it mentions has a row in
//! `brands`, without importing any products. Useful for seeding the lookup
//! table before several store files are imported.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use rusqlite::Connection;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use tracing::{info, warn};

use crate::brands::{normalize_brand_name, BrandResolver};
use crate::config::{BrandSyncConfig, ColumnLayout};
use crate::error::RecordError;
use crate::progress::create_spinner;
use crate::safety::validate_import_paths;
use crate::schema::{init_schema, open_database};

#[derive(Default, Debug, Clone, Serialize)]
pub struct BrandSyncSummary {
    pub rows_read: usize,
    pub distinct_brands: usize,
    pub created: usize,
    pub already_present: usize,
    pub skipped_malformed: usize,
    pub failures: usize,
}

impl BrandSyncSummary {
    pub fn print(&self) {
        println!("Brands have been processed successfully.");
        println!("  Rows read: {}", self.rows_read);
        println!("  Distinct brands: {}", self.distinct_brands);
        println!("  Created: {}", self.created);
        println!("  Already present: {}", self.already_present);
        println!("  Skipped (malformed): {}", self.skipped_malformed);
        println!("  Failed: {}", self.failures);
    }
}

pub fn sync_reader<R: Read>(
    conn: &Connection,
    reader: R,
    layout: &ColumnLayout,
) -> Result<BrandSyncSummary> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut summary = BrandSyncSummary::default();
    let mut resolver = BrandResolver::new();
    let mut record = StringRecord::new();
    let spinner = create_spinner("Registering brands");

    loop {
        match rdr.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => {
                return Err(err).context("Failed to read CSV input");
            }
            Err(err) => {
                let line = err
                    .position()
                    .map(|p| p.line())
                    .unwrap_or_else(|| rdr.position().line());
                summary.rows_read += 1;
                summary.skipped_malformed += 1;
                warn!("Skipping record, {}", RecordError::Unreadable { line, source: err });
                spinner.inc(1);
                continue;
            }
        }
        summary.rows_read += 1;
        spinner.inc(1);
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let Some(raw) = layout.extract_brand(&record) else {
            let err = RecordError::FieldCount {
                line,
                found: record.len(),
                expected: layout.field_count(),
            };
            warn!("Skipping record, {}", err);
            summary.skipped_malformed += 1;
            continue;
        };

        if normalize_brand_name(raw).is_empty() {
            warn!("Skipping record, {}", RecordError::EmptyBrand { line });
            summary.skipped_malformed += 1;
            continue;
        }

        if let Err(source) = resolver.resolve(conn, raw) {
            let brand = raw.to_string();
            warn!("{}", RecordError::Brand { line, brand, source });
            summary.failures += 1;
        }
    }

    summary.distinct_brands = resolver.len();
    summary.created = resolver.created();
    summary.already_present = resolver.reused();
    spinner.finish_with_message(format!("Registered {} brands", summary.created));
    Ok(summary)
}

/// Run the brand pre-registration stage
pub fn run(config: BrandSyncConfig) -> Result<BrandSyncSummary> {
    validate_import_paths(&config.csv_path, &config.db_path)?;

    let conn = open_database(&config.db_path)?;
    init_schema(&conn)?;

    let file = File::open(&config.csv_path)
        .with_context(|| format!("Failed to open {:?}", config.csv_path))?;
    let summary = sync_reader(&conn, BufReader::new(file), &config.layout)?;
    info!(
        created = summary.created,
        already_present = summary.already_present,
        "brand sync finished"
    );
    Ok(summary)
}
