//! Product catalog import pipeline - shared modules for all binaries.

pub mod brand_sync;
pub mod brands;
pub mod config;
pub mod error;
pub mod importer;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod progress;
pub mod safety;
pub mod schema;
