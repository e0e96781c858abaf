//! Domain models - raw map elements and normalized businesses
//!
//! This module contains the canonical data types used throughout the system:
//! - `OverpassElement` - a raw point of interest as fetched from the map API
//! - `Coordinates` - a WGS84 point with the node/center resolution rule
//! - `Business` - the uniform listing served to clients
//! - `BusinessRecord` - a listing plus internal ranking fields

pub mod business;
pub mod types;

// Re-export commonly used types at module level
pub use business::{Business, BusinessRecord};
pub use types::{Coordinates, OverpassElement, OverpassResponse};
