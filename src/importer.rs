//! CSV product importer.
//!
//! Reads product rows from a CSV file, resolves each brand name to a brand id
//! and inserts one `products` row per valid record. Bad records are logged,
//! counted and skipped; only setup failures abort the run.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::brands::{normalize_brand_name, BrandResolver};
use crate::config::{ColumnLayout, ImportConfig};
use crate::error::RecordError;
use crate::models::NewProduct;
use crate::progress::{create_spinner, format_duration, log_progress};
use crate::safety::validate_import_paths;
use crate::schema::{init_schema, open_database};

const LOG_INTERVAL: u64 = 10_000;

// ============================================================================
// Summary
// ============================================================================

/// Outcome of one import run.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub imported: usize,
    pub skipped_malformed: usize,
    pub brand_failures: usize,
    pub insert_failures: usize,
    pub brands_created: usize,
    pub brands_reused: usize,
    pub elapsed_seconds: f64,
}

impl ImportSummary {
    /// Rows that did not produce a product, for any reason
    pub fn skipped(&self) -> usize {
        self.skipped_malformed + self.brand_failures + self.insert_failures
    }

    fn record_failure(&mut self, err: &RecordError) {
        match err {
            RecordError::Brand { .. } => self.brand_failures += 1,
            RecordError::Insert { .. } => self.insert_failures += 1,
            _ => self.skipped_malformed += 1,
        }
    }

    pub fn print(&self) {
        println!("\n{:=<60}", "");
        println!("Data import completed.");
        println!("  Rows read: {}", self.rows_read);
        println!("  Products imported: {}", self.imported);
        println!("  Skipped (malformed): {}", self.skipped_malformed);
        println!("  Skipped (brand lookup failed): {}", self.brand_failures);
        println!("  Skipped (insert failed): {}", self.insert_failures);
        println!(
            "  Brands: {} created, {} already present",
            self.brands_created, self.brands_reused
        );
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
// Import
// ============================================================================

/// Insert one product row and return its generated id.
pub fn insert_product(conn: &Connection, product: &NewProduct) -> rusqlite::Result<i64> {
    conn.prepare_cached(
        "INSERT INTO products (category, brand_id, price, nicotine_amount, bottle_size, description, flavor)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?
    .execute(params![
        product.category,
        product.brand_id,
        product.price,
        product.nicotine_amount,
        product.bottle_size,
        product.description,
        product.flavor,
    ])?;
    Ok(conn.last_insert_rowid())
}

/// Turn one CSV record into a stored product.
fn import_record(
    conn: &Connection,
    resolver: &mut BrandResolver,
    layout: &ColumnLayout,
    record: &StringRecord,
    line: u64,
) -> std::result::Result<i64, RecordError> {
    let fields = layout.extract(record).ok_or(RecordError::FieldCount {
        line,
        found: record.len(),
        expected: layout.field_count(),
    })?;

    if normalize_brand_name(&fields.brand_name).is_empty() {
        return Err(RecordError::EmptyBrand { line });
    }
    let brand = fields.brand_name.clone();
    debug!(line, brand = %brand, "importing record");

    let brand_id = resolver
        .resolve(conn, &brand)
        .map_err(|source| RecordError::Brand {
            line,
            brand: brand.clone(),
            source,
        })?;

    insert_product(conn, &NewProduct::from_record(fields, brand_id))
        .map_err(|source| RecordError::Insert { line, brand, source })
}

/// Import every data row of a CSV stream. The first row is a header and is
/// discarded.
///
/// Returns an error only when the stream itself fails; bad records are
/// counted in the summary.
pub fn import_reader<R: Read>(
    conn: &Connection,
    reader: R,
    layout: &ColumnLayout,
) -> Result<ImportSummary> {
    let start = Instant::now();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut summary = ImportSummary::default();
    let mut resolver = BrandResolver::new();
    let mut record = StringRecord::new();
    let spinner = create_spinner("Importing products");

    loop {
        let line = match rdr.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => record.position().map(|p| p.line()).unwrap_or(0),
            Err(err) => {
                if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                    return Err(err).context("Failed to read CSV input");
                }
                let line = err
                    .position()
                    .map(|p| p.line())
                    .unwrap_or_else(|| rdr.position().line());
                summary.rows_read += 1;
                let err = RecordError::Unreadable { line, source: err };
                warn!("Skipping record, {}", err);
                summary.record_failure(&err);
                spinner.inc(1);
                continue;
            }
        };

        summary.rows_read += 1;
        match import_record(conn, &mut resolver, layout, &record, line) {
            Ok(_) => summary.imported += 1,
            Err(err) => {
                warn!("Skipping record, {}", err);
                summary.record_failure(&err);
            }
        }
        spinner.inc(1);
        log_progress("IMPORT", summary.rows_read as u64, None, LOG_INTERVAL);
    }

    summary.brands_created = resolver.created();
    summary.brands_reused = resolver.reused();
    summary.elapsed_seconds = start.elapsed().as_secs_f64();
    spinner.finish_with_message(format!("Imported {} products", summary.imported));

    if summary.rows_read == 0 {
        warn!("CSV input contained no data rows");
    }
    Ok(summary)
}

pub fn import_file(conn: &Connection, path: &Path, layout: &ColumnLayout) -> Result<ImportSummary> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    import_reader(conn, BufReader::new(file), layout)
}

/// Run the CSV importer stage
pub fn run(config: ImportConfig) -> Result<ImportSummary> {
    validate_import_paths(&config.csv_path, &config.db_path)?;

    info!(
        csv = %config.csv_path.display(),
        db = %config.db_path.display(),
        columns = %config.layout,
        "starting import"
    );
    let conn = open_database(&config.db_path)?;
    init_schema(&conn)?;

    let summary = import_file(&conn, &config.csv_path, &config.layout)?;
    info!(
        imported = summary.imported,
        skipped = summary.skipped(),
        "import finished"
    );

    if let Some(path) = &config.stats_json {
        summary.write_to_file(path)?;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::init_schema;

    const HEADER: &str = "category,brand,price,nicotine,bottle_size,description,flavor\n";

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn import(conn: &Connection, body: &str) -> ImportSummary {
        let data = format!("{}{}", HEADER, body);
        import_reader(conn, data.as_bytes(), &ColumnLayout::default()).unwrap()
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_import_maps_columns() {
        let conn = setup();
        let summary = import(&conn, "Juice,Acme,9.99,3mg,30ml,A cool mint,Mint\n");
        assert_eq!(summary.imported, 1);

        let row: (String, String, String, String, String, String, String) = conn
            .query_row(
                "SELECT p.category, b.name, p.price, p.nicotine_amount, p.bottle_size, p.description, p.flavor
                 FROM products p JOIN brands b ON b.id = p.brand_id",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?)),
            )
            .unwrap();
        assert_eq!(
            row,
            (
                "Juice".to_string(),
                "Acme".to_string(),
                "9.99".to_string(),
                "3mg".to_string(),
                "30ml".to_string(),
                "A cool mint".to_string(),
                "Mint".to_string()
            )
        );
    }

    #[test]
    fn test_header_row_is_skipped() {
        let conn = setup();
        let summary = import(&conn, "");
        assert_eq!(summary.rows_read, 0);
        assert_eq!(count(&conn, "products"), 0);
        assert_eq!(count(&conn, "brands"), 0);
    }

    #[test]
    fn test_wrong_field_count_is_skipped() {
        let conn = setup();
        let summary = import(
            &conn,
            "Juice,Acme,9.99,3mg,30ml,desc,Mint\n\
             Juice,Acme,9.99\n\
             Juice,Acme,9.99,3mg,30ml,desc,Mint,extra\n\
             Candy,Zest,5.00,0mg,60ml,desc,Berry\n",
        );
        assert_eq!(summary.rows_read, 4);
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped_malformed, 2);
        assert_eq!(summary.skipped(), 2);
        assert_eq!(count(&conn, "products"), 2);
    }

    #[test]
    fn test_brands_created_once_per_distinct_name() {
        let conn = setup();
        let summary = import(
            &conn,
            "Juice,Acme,9.99,3mg,30ml,desc,Mint\n\
             Candy,Acme,9.99,3mg,30ml,desc,Mint\n\
             Juice,Zest,9.99,3mg,30ml,desc,Lime\n\
             Juice, Acme ,9.99,3mg,30ml,desc,Grape\n",
        );
        assert_eq!(summary.imported, 4);
        assert_eq!(summary.brands_created, 2);
        assert_eq!(count(&conn, "brands"), 2);

        let distinct_ids: i64 = conn
            .query_row(
                "SELECT COUNT(DISTINCT brand_id) FROM products WHERE flavor IN ('Mint', 'Grape')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(distinct_ids, 1);
    }

    #[test]
    fn test_existing_brands_are_reused_across_runs() {
        let conn = setup();
        import(&conn, "Juice,Acme,9.99,3mg,30ml,desc,Mint\n");
        let second = import(&conn, "Candy,Acme,9.99,3mg,30ml,desc,Mint\n");
        assert_eq!(second.brands_created, 0);
        assert_eq!(second.brands_reused, 1);
        assert_eq!(count(&conn, "brands"), 1);
        assert_eq!(count(&conn, "products"), 2);
    }

    #[test]
    fn test_existing_non_canonical_brand_is_found() {
        let conn = setup();
        conn.execute("INSERT INTO brands (name) VALUES ('Acme  Labs')", [])
            .unwrap();

        let summary = import(&conn, "Juice,Acme  Labs,9.99,3mg,30ml,desc,Mint\n");
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.brands_created, 0);
        assert_eq!(summary.brands_reused, 1);
        assert_eq!(count(&conn, "brands"), 1);
    }

    #[test]
    fn test_empty_brand_is_malformed() {
        let conn = setup();
        let summary = import(&conn, "Juice,  ,9.99,3mg,30ml,desc,Mint\n");
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.skipped_malformed, 1);
        assert_eq!(count(&conn, "brands"), 0);
    }

    #[test]
    fn test_quoted_fields_with_commas() {
        let conn = setup();
        let summary = import(&conn, "Juice,Acme,9.99,3mg,30ml,\"Sweet, cold\",Mint\n");
        assert_eq!(summary.imported, 1);
        let desc: String = conn
            .query_row("SELECT description FROM products", [], |r| r.get(0))
            .unwrap();
        assert_eq!(desc, "Sweet, cold");
    }

    #[test]
    fn test_invalid_utf8_row_is_skipped() {
        let conn = setup();
        let mut data = HEADER.as_bytes().to_vec();
        data.extend_from_slice(b"Juice,Acme,9.99,3mg,30ml,\xff\xfe,Mint\n");
        data.extend_from_slice(b"Candy,Acme,9.99,3mg,30ml,desc,Mint\n");

        let summary = import_reader(&conn, data.as_slice(), &ColumnLayout::default()).unwrap();
        assert_eq!(summary.rows_read, 2);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped_malformed, 1);
    }

    #[test]
    fn test_storage_failures_do_not_stop_the_run() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE brands (id INTEGER PRIMARY KEY, name TEXT UNIQUE);")
            .unwrap();
        // No products table: every insert fails after the brand resolves
        let summary = import(
            &conn,
            "Juice,Acme,9.99,3mg,30ml,desc,Mint\n\
             Candy,Zest,9.99,3mg,30ml,desc,Lime\n",
        );
        assert_eq!(summary.rows_read, 2);
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.insert_failures, 2);
        assert_eq!(summary.brands_created, 2);
    }

    #[test]
    fn test_custom_layout() {
        let conn = setup();
        let layout: ColumnLayout = "brand,flavor,category,price,nicotine_amount,bottle_size,description"
            .parse()
            .unwrap();
        let data = "b,f,c,p,n,s,d\nAcme,Mint,Juice,9.99,3mg,30ml,desc\n";
        let summary = import_reader(&conn, data.as_bytes(), &layout).unwrap();
        assert_eq!(summary.imported, 1);

        let (category, flavor): (String, String) = conn
            .query_row("SELECT category, flavor FROM products", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(category, "Juice");
        assert_eq!(flavor, "Mint");
    }

    #[test]
    fn test_summary_json() {
        let summary = ImportSummary {
            rows_read: 3,
            imported: 2,
            skipped_malformed: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["imported"], 2);
        assert_eq!(json["skipped_malformed"], 1);
    }
}
