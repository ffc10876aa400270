//! Per-record failures.
//!
//! Setup failures (missing files, unopenable databases) abort a run and are
//! plain `anyhow` errors. Everything here is recoverable: the record is
//! logged, counted and skipped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("line {line}: found {found} fields, expected {expected}")]
    FieldCount {
        line: u64,
        found: usize,
        expected: usize,
    },

    #[error("line {line}: unreadable record: {source}")]
    Unreadable {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: brand name is empty")]
    EmptyBrand { line: u64 },

    #[error("line {line}: failed to resolve brand '{brand}': {source}")]
    Brand {
        line: u64,
        brand: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("line {line}: failed to insert product for brand '{brand}': {source}")]
    Insert {
        line: u64,
        brand: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not insert product {product_id} into store {store_id}: {source}")]
    StoreProduct {
        store_id: i64,
        product_id: i64,
        #[source]
        source: rusqlite::Error,
    },
}

impl RecordError {
    /// True for records rejected before touching the database.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            RecordError::FieldCount { .. }
                | RecordError::Unreadable { .. }
                | RecordError::EmptyBrand { .. }
        )
    }
}
