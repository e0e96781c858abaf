//! Infrastructure - configuration, catalog data, and metrics
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `catalog` - Category tables, cuisine rules, and image pools
//! - `metrics` - Lock-free metrics collection

pub mod catalog;
pub mod config;
pub mod metrics;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::Config;
pub use metrics::Metrics;
