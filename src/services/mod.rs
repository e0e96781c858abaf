//! Services - normalization, caching, and search logic
//!
//! This module contains the core business logic services:
//! - `taxonomy` - Classifies raw tag sets into categories, powers autocomplete
//! - `images` - Deterministic display-image selection per business
//! - `normalizer` - Raw map elements to uniform business records
//! - `cache` - Per-area snapshot cache with TTL and request coalescing
//! - `search` - Filtering and pagination over a ranked snapshot

pub mod cache;
pub mod images;
pub mod normalizer;
pub mod search;
pub mod taxonomy;

// Re-export commonly used types
pub use cache::AreaCache;
pub use normalizer::Normalizer;
pub use search::{search, SearchPage, SearchParams};
pub use taxonomy::Taxonomy;
