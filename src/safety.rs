//! Safety checks run before a stage writes anything.
//!
//! `Connection::open` happily turns any path into a SQLite file, so a
//! swapped argument can overwrite the CSV that was meant to be read.

use anyhow::{bail, Result};
use std::path::Path;

/// Extensions that mark a file as source data, never a database.
const SOURCE_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

/// Validates the paths of a CSV-reading stage.
///
/// Checks:
/// - The CSV input exists and is a regular file
/// - The database path is not the CSV input
/// - The database path does not look like a source data file
pub fn validate_import_paths(csv_path: &Path, db_path: &Path) -> Result<()> {
    if !csv_path.is_file() {
        bail!("Input file '{}' does not exist", csv_path.display());
    }

    if db_path == csv_path || same_file(csv_path, db_path) {
        bail!(
            "Safety check failed: database '{}' cannot be the same as input '{}'",
            db_path.display(),
            csv_path.display()
        );
    }

    let ext = db_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if SOURCE_EXTENSIONS.contains(&ext.as_str()) {
        bail!(
            "Safety check failed: database '{}' has a source data extension '.{}'",
            db_path.display(),
            ext
        );
    }

    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
