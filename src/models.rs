//! Core data models for the catalog import pipeline.
//!
//! This module contains the row types shared by the importer, the brand
//! sync and the store normalizer, plus the composite grouping key.

use rustc_hash::FxHashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// Index mapping (brand_id, flavor) to group index in Vec<StoreProductGroup>
pub type ProductIndex = FxHashMap<ProductKey, usize>;

// ============================================================================
// Catalog Rows
// ============================================================================

/// Brand lookup row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Brand {
    pub id: i64,
    pub name: String,
}

/// Product fields as read from one CSV record, before brand resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductRecord {
    pub category: String,
    pub brand_name: String,
    pub price: String,
    pub nicotine_amount: String,
    pub bottle_size: String,
    pub description: String,
    pub flavor: String,
}

/// Product row ready for insertion (brand resolved to its id).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewProduct {
    pub brand_id: i64,
    pub category: String,
    pub price: String,
    pub nicotine_amount: String,
    pub bottle_size: String,
    pub description: String,
    pub flavor: String,
}

impl NewProduct {
    pub fn from_record(record: ProductRecord, brand_id: i64) -> Self {
        Self {
            brand_id,
            category: record.category,
            price: record.price,
            nicotine_amount: record.nicotine_amount,
            bottle_size: record.bottle_size,
            description: record.description,
            flavor: record.flavor,
        }
    }
}

/// The subset of a `products` row the normalizer reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductRow {
    pub product_id: i64,
    pub brand_id: i64,
    pub flavor: String,
    pub category: Option<String>,
}

/// Per-store inventory row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreProduct {
    pub store_id: i64,
    pub product_id: i64,
    pub stock_count: i64,
    pub categories: String,
}

// ============================================================================
// Grouping
// ============================================================================

/// Identity of a logical retail product: products with the same brand and
/// flavor are the same item on the shelf, whatever their category.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ProductKey {
    pub brand_id: i64,
    pub flavor: String,
}

impl ProductKey {
    pub fn new(brand_id: i64, flavor: impl Into<String>) -> Self {
        Self {
            brand_id,
            flavor: flavor.into(),
        }
    }
}

/// Products sharing a `ProductKey`, collapsed into one inventory entry.
/// `product_id` is the first product seen for the key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreProductGroup {
    pub key: ProductKey,
    pub product_id: i64,
    pub categories: Vec<String>, // one entry per member, first-seen order
    pub member_count: usize,
}

impl StoreProductGroup {
    pub fn new(key: ProductKey, product_id: i64) -> Self {
        Self {
            key,
            product_id,
            categories: Vec::new(),
            member_count: 0,
        }
    }

    /// Record one member product's category exactly as stored. Repeats are
    /// kept; a NULL category counts as empty.
    pub fn add_category(&mut self, category: Option<&str>) {
        self.member_count += 1;
        self.categories.push(category.unwrap_or_default().to_string());
    }

    /// Categories joined for the `store_products.categories` column.
    pub fn joined_categories(&self) -> String {
        self.categories.join(", ")
    }

    pub fn into_store_product(self, store_id: i64) -> StoreProduct {
        let categories = self.joined_categories();
        StoreProduct {
            store_id,
            product_id: self.product_id,
            stock_count: 0,
            categories,
        }
    }
}
