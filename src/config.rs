//! Run configuration for each pipeline stage.
//!
//! Binaries build these from command-line arguments; tests build them
//! directly.

use anyhow::{bail, Result};
use csv::StringRecord;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::ProductRecord;

/// Store that receives normalized inventory when none is given.
pub const DEFAULT_STORE_ID: i64 = 1;

/// Column names accepted by `--columns`, in canonical order.
pub const COLUMN_NAMES: [&str; 7] = [
    "category",
    "brand",
    "price",
    "nicotine_amount",
    "bottle_size",
    "description",
    "flavor",
];

// ============================================================================
// Column Layout
// ============================================================================

/// Position of each product field within a CSV record.
///
/// The canonical layout is `category,brand,price,nicotine_amount,
/// bottle_size,description,flavor`. Any permutation of those seven names can
/// be parsed from a comma-separated string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnLayout {
    pub category: usize,
    pub brand: usize,
    pub price: usize,
    pub nicotine_amount: usize,
    pub bottle_size: usize,
    pub description: usize,
    pub flavor: usize,
}

impl ColumnLayout {
    /// Number of fields a record must have.
    pub fn field_count(&self) -> usize {
        COLUMN_NAMES.len()
    }

    /// Map a record onto product fields. Returns `None` when the record does
    /// not have exactly `field_count()` fields.
    pub fn extract(&self, record: &StringRecord) -> Option<ProductRecord> {
        if record.len() != self.field_count() {
            return None;
        }
        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        Some(ProductRecord {
            category: field(self.category),
            brand_name: field(self.brand),
            price: field(self.price),
            nicotine_amount: field(self.nicotine_amount),
            bottle_size: field(self.bottle_size),
            description: field(self.description),
            flavor: field(self.flavor),
        })
    }

    /// Only the brand column, for stages that do not need the full product.
    pub fn extract_brand<'r>(&self, record: &'r StringRecord) -> Option<&'r str> {
        if record.len() != self.field_count() {
            return None;
        }
        record.get(self.brand)
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut usize> {
        match name {
            "category" => Some(&mut self.category),
            "brand" | "brand_name" => Some(&mut self.brand),
            "price" => Some(&mut self.price),
            "nicotine_amount" | "nicotine" => Some(&mut self.nicotine_amount),
            "bottle_size" => Some(&mut self.bottle_size),
            "description" => Some(&mut self.description),
            "flavor" => Some(&mut self.flavor),
            _ => None,
        }
    }

    fn name_at(&self, idx: usize) -> &'static str {
        let slots = [
            (self.category, "category"),
            (self.brand, "brand"),
            (self.price, "price"),
            (self.nicotine_amount, "nicotine_amount"),
            (self.bottle_size, "bottle_size"),
            (self.description, "description"),
            (self.flavor, "flavor"),
        ];
        slots
            .iter()
            .find(|(pos, _)| *pos == idx)
            .map(|(_, name)| *name)
            .unwrap_or("?")
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            category: 0,
            brand: 1,
            price: 2,
            nicotine_amount: 3,
            bottle_size: 4,
            description: 5,
            flavor: 6,
        }
    }
}

impl FromStr for ColumnLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let names: Vec<String> = s
            .split(',')
            .map(|n| n.trim().to_lowercase())
            .collect();

        if names.len() != COLUMN_NAMES.len() {
            bail!(
                "column layout must name {} columns, got {}",
                COLUMN_NAMES.len(),
                names.len()
            );
        }

        let mut layout = ColumnLayout::default();
        let mut seen = [false; 7];
        for (idx, name) in names.iter().enumerate() {
            let Some(canonical) = COLUMN_NAMES
                .iter()
                .position(|c| *c == name.as_str())
                .or_else(|| match name.as_str() {
                    "brand_name" => Some(1),
                    "nicotine" => Some(3),
                    _ => None,
                })
            else {
                bail!("unknown column '{}' (expected one of: {})", name, COLUMN_NAMES.join(", "));
            };
            if seen[canonical] {
                bail!("column '{}' listed more than once", COLUMN_NAMES[canonical]);
            }
            seen[canonical] = true;
            if let Some(slot) = layout.slot_mut(name) {
                *slot = idx;
            }
        }

        Ok(layout)
    }
}

impl fmt::Display for ColumnLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = (0..self.field_count()).map(|i| self.name_at(i)).collect();
        write!(f, "{}", names.join(","))
    }
}

// ============================================================================
// Stage Configs
// ============================================================================

/// Arguments for the schema initializer
#[derive(Clone, Debug)]
pub struct SchemaConfig {
    pub db_path: PathBuf,
}

/// Arguments for the CSV importer
#[derive(Clone, Debug)]
pub struct ImportConfig {
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub layout: ColumnLayout,
    pub stats_json: Option<PathBuf>,
}

/// Arguments for brand pre-registration
#[derive(Clone, Debug)]
pub struct BrandSyncConfig {
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub layout: ColumnLayout,
}

/// Arguments for the store normalizer
#[derive(Clone, Debug)]
pub struct NormalizeConfig {
    pub db_path: PathBuf,
    pub store_id: i64,
    pub stats_json: Option<PathBuf>,
}
