//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `overpass` - HTTP client for the Overpass map-data API (mirror failover)
//! - `geocode` - HTTP client for Nominatim geocoding and location suggestions
//! - `http` - The API HTTP server, including Prometheus exposition

pub mod geocode;
pub mod http;
pub mod overpass;

// Re-export commonly used types
pub use geocode::GeocodeClient;
pub use http::{start_api_server, AppState};
pub use overpass::{AreaFetcher, OverpassClient};
