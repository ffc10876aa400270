//! Brand name canonicalization and brand id resolution.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use rustc_hash::{FxHashMap, FxHashSet};
use unicode_normalization::UnicodeNormalization;

/// Runs of whitespace inside a name
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Canonical form of a brand name: NFC-composed, trimmed, inner whitespace
/// collapsed to one space. Case is kept.
/// e.g., "  Acme   Labs " → "Acme Labs"
pub fn normalize_brand_name(name: &str) -> String {
    let composed: String = name.nfc().collect();
    MULTI_SPACE.replace_all(composed.trim(), " ").to_string()
}

pub fn find_brand(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
    conn.prepare_cached("SELECT id FROM brands WHERE name = ?1")?
        .query_row([name], |row| row.get(0))
        .optional()
}

/// Return the id of the brand called `name`, inserting it first if needed.
///
/// A row stored under exactly `name` always wins. Otherwise the canonical
/// form is looked up, and inserted when missing, so new rows are always
/// canonical.
pub fn resolve_brand(conn: &Connection, name: &str) -> rusqlite::Result<i64> {
    resolve_brand_tracked(conn, name).map(|(id, _)| id)
}

/// Like `resolve_brand`, also reporting whether the brand was created.
fn resolve_brand_tracked(conn: &Connection, name: &str) -> rusqlite::Result<(i64, bool)> {
    if let Some(id) = find_brand(conn, name)? {
        return Ok((id, false));
    }
    let canonical = normalize_brand_name(name);
    if canonical != name {
        if let Some(id) = find_brand(conn, &canonical)? {
            return Ok((id, false));
        }
    }
    conn.prepare_cached("INSERT INTO brands (name) VALUES (?1)")?
        .execute(params![canonical])?;
    Ok((conn.last_insert_rowid(), true))
}

/// Per-run brand resolver with an in-memory cache.
///
/// A name is only cached after the database lookup or insert succeeded, so
/// a failed call can be retried by a later record. Counts are per brand id:
/// two spellings that resolve to the same row count once.
#[derive(Debug, Default)]
pub struct BrandResolver {
    cache: FxHashMap<String, i64>,
    seen: FxHashSet<i64>,
    created: usize,
    reused: usize,
}

impl BrandResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a brand name as it appears in the input.
    pub fn resolve(&mut self, conn: &Connection, name: &str) -> rusqlite::Result<i64> {
        if let Some(&id) = self.cache.get(name) {
            return Ok(id);
        }
        let (id, created) = resolve_brand_tracked(conn, name)?;
        if self.seen.insert(id) {
            if created {
                self.created += 1;
            } else {
                self.reused += 1;
            }
        }
        self.cache.insert(name.to_string(), id);
        Ok(id)
    }

    /// Brands inserted by this resolver
    pub fn created(&self) -> usize {
        self.created
    }

    /// Distinct brands that were already in the database
    pub fn reused(&self) -> usize {
        self.reused
    }

    /// Distinct brands resolved so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::init_schema;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn brand_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM brands", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_normalize_brand_name() {
        assert_eq!(normalize_brand_name("  Acme   Labs "), "Acme Labs");
        assert_eq!(normalize_brand_name("Acme\tLabs"), "Acme Labs");
        assert_eq!(normalize_brand_name("Acme"), "Acme");
        assert_eq!(normalize_brand_name("   "), "");
        // Decomposed "e" + combining acute composes to "é"
        assert_eq!(normalize_brand_name("Cafe\u{0301}"), "Caf\u{00E9}");
    }

    #[test]
    fn test_resolve_brand_is_idempotent() {
        let conn = setup();
        let first = resolve_brand(&conn, "Acme").unwrap();
        let second = resolve_brand(&conn, "Acme").unwrap();
        assert_eq!(first, second);
        assert_eq!(brand_count(&conn), 1);
        assert_eq!(find_brand(&conn, "Acme").unwrap(), Some(first));
        assert_eq!(find_brand(&conn, "Other").unwrap(), None);
    }

    #[test]
    fn test_resolve_brand_finds_existing_row() {
        let conn = setup();
        conn.execute("INSERT INTO brands (id, name) VALUES (17, 'Acme')", [])
            .unwrap();
        assert_eq!(resolve_brand(&conn, "Acme").unwrap(), 17);
    }

    #[test]
    fn test_resolve_brand_prefers_exact_stored_name() {
        let conn = setup();
        conn.execute("INSERT INTO brands (id, name) VALUES (5, 'Acme  Labs')", [])
            .unwrap();

        assert_eq!(resolve_brand(&conn, "Acme  Labs").unwrap(), 5);
        assert_eq!(brand_count(&conn), 1);
    }

    #[test]
    fn test_resolve_brand_falls_back_to_canonical_name() {
        let conn = setup();
        let id = resolve_brand(&conn, " Acme   Labs").unwrap();
        assert_eq!(find_brand(&conn, "Acme Labs").unwrap(), Some(id));

        assert_eq!(resolve_brand(&conn, "Acme Labs ").unwrap(), id);
        assert_eq!(brand_count(&conn), 1);
    }

    #[test]
    fn test_resolver_counts_created_and_reused() {
        let conn = setup();
        resolve_brand(&conn, "Old").unwrap();

        let mut resolver = BrandResolver::new();
        let names = ["Acme", "Old", "Acme", "Zest", "Old", "Acme"];
        let ids: Vec<i64> = names
            .iter()
            .map(|n| resolver.resolve(&conn, n).unwrap())
            .collect();

        assert_eq!(ids[0], ids[2]);
        assert_eq!(ids[0], ids[5]);
        assert_eq!(ids[1], ids[4]);
        assert_ne!(ids[0], ids[3]);
        assert_eq!(resolver.created(), 2);
        assert_eq!(resolver.reused(), 1);
        assert_eq!(resolver.len(), 3);
        assert_eq!(brand_count(&conn), 3);
    }

    #[test]
    fn test_resolver_counts_spellings_of_one_brand_once() {
        let conn = setup();
        let mut resolver = BrandResolver::new();
        let a = resolver.resolve(&conn, "Acme").unwrap();
        let b = resolver.resolve(&conn, " Acme ").unwrap();

        assert_eq!(a, b);
        assert_eq!(resolver.created(), 1);
        assert_eq!(resolver.reused(), 0);
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_resolver_surfaces_storage_errors() {
        let conn = Connection::open_in_memory().unwrap(); // no schema
        let mut resolver = BrandResolver::new();
        assert!(resolver.resolve(&conn, "Acme").is_err());
        assert!(resolver.is_empty());
    }
}
