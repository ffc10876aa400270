//! Database schema and connection setup.

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

use crate::config::SchemaConfig;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS brands (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS products (
    product_id INTEGER PRIMARY KEY,
    brand_id INTEGER REFERENCES brands(id),
    category TEXT,
    price TEXT,
    nicotine_amount TEXT,
    bottle_size TEXT,
    description TEXT,
    flavor TEXT
);

CREATE INDEX IF NOT EXISTS idx_products_brand_flavor ON products(brand_id, flavor);

CREATE TABLE IF NOT EXISTS stores (
    store_id INTEGER PRIMARY KEY,
    phone TEXT,
    address TEXT
);

CREATE TABLE IF NOT EXISTS store_products (
    store_id INTEGER REFERENCES stores(store_id) ON DELETE CASCADE,
    product_id INTEGER REFERENCES products(product_id) ON DELETE CASCADE,
    stock_count INTEGER NOT NULL DEFAULT 0 CHECK (stock_count >= 0),
    categories TEXT,
    PRIMARY KEY (store_id, product_id)
);
";

/// Tables `init_schema` creates.
pub const TABLES: [&str; 4] = ["brands", "products", "stores", "store_products"];

/// Open (or create) a database and enable foreign key enforcement.
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {:?}", path))?;
    configure(&conn)?;
    Ok(conn)
}

/// Open a database that must already exist. Never creates a file.
pub fn open_existing_database(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        bail!("Database {:?} does not exist", path);
    }
    open_database(path)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA temp_store = MEMORY;",
    )
    .context("Failed to configure database connection")?;
    Ok(())
}

/// Create every table if absent. Safe to call on every run.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Failed to create tables")?;
    Ok(())
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Make sure a `stores` row exists for `store_id`. Existing rows are left
/// untouched. Returns true if the row was created.
pub fn ensure_store(conn: &Connection, store_id: i64) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO stores (store_id) VALUES (?1)",
        [store_id],
    )?;
    Ok(inserted > 0)
}

/// Run the schema initializer stage
pub fn run(config: SchemaConfig) -> Result<()> {
    info!(db = %config.db_path.display(), "initializing schema");
    let conn = open_database(&config.db_path)?;
    init_schema(&conn)?;

    for table in TABLES {
        if !table_exists(&conn, table)? {
            bail!("Table '{}' missing after schema creation", table);
        }
    }

    println!("Tables created successfully in {:?}", config.db_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        configure(&conn).unwrap();
        conn
    }

    #[test]
    fn test_init_schema_creates_tables() {
        let conn = memory_db();
        init_schema(&conn).unwrap();
        for table in TABLES {
            assert!(table_exists(&conn, table).unwrap(), "missing {}", table);
        }
        assert!(!table_exists(&conn, "nope").unwrap());
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = memory_db();
        init_schema(&conn).unwrap();
        conn.execute("INSERT INTO brands (name) VALUES ('Acme')", []).unwrap();
        init_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM brands", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let conn = memory_db();
        init_schema(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO products (brand_id, category, flavor) VALUES (99, 'Juice', 'Mint')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_stock_count_check() {
        let conn = memory_db();
        init_schema(&conn).unwrap();
        conn.execute("INSERT INTO brands (id, name) VALUES (1, 'Acme')", []).unwrap();
        conn.execute(
            "INSERT INTO products (product_id, brand_id, flavor) VALUES (1, 1, 'Mint')",
            [],
        )
        .unwrap();
        ensure_store(&conn, 1).unwrap();
        let result = conn.execute(
            "INSERT INTO store_products (store_id, product_id, stock_count) VALUES (1, 1, -1)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ensure_store() {
        let conn = memory_db();
        init_schema(&conn).unwrap();
        assert!(ensure_store(&conn, 1).unwrap());
        assert!(!ensure_store(&conn, 1).unwrap());
    }

    #[test]
    fn test_open_existing_database_refuses_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.db");
        assert!(open_existing_database(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_run_creates_database_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("products.db");
        run(SchemaConfig { db_path: path.clone() }).unwrap();

        let conn = open_existing_database(&path).unwrap();
        assert!(table_exists(&conn, "store_products").unwrap());
    }
}
