//! Classification catalog loading
//!
//! The tag tables, cuisine rules, fallback pairs, and image pools live in
//! `data/catalog.toml` as data the services consume; a copy is embedded at
//! compile time and `[catalog] file` in the config points at an override.
//! Tables are ordered maps so iteration (and therefore suggestion output)
//! is stable across runs.

use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Catalog shipped inside the binary.
const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.toml");

/// A (category, subcategory) pair as stored in the tag tables.
pub type CategoryPair = (String, String);

/// One cuisine refinement rule. Rules apply in file order and the first
/// `contains` match wins.
#[derive(Debug, Clone, Deserialize)]
pub struct CuisineRule {
    pub contains: String,
    pub subcategory: String,
}

/// Pairs used when no table matches.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackPairs {
    /// For unmapped `shop` values, and the final default.
    pub retail: CategoryPair,
    /// For unmapped `amenity` values.
    pub amenity: CategoryPair,
}

/// Display image pools keyed by taxonomy labels.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagePools {
    pub default: String,
    #[serde(default)]
    pub subcategory: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub category: BTreeMap<String, Vec<String>>,
}

/// Full classification catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    pub craft: BTreeMap<String, CategoryPair>,
    pub amenity: BTreeMap<String, CategoryPair>,
    pub shop: BTreeMap<String, CategoryPair>,
    pub tourism: BTreeMap<String, CategoryPair>,
    pub leisure: BTreeMap<String, CategoryPair>,
    pub cuisine: Vec<CuisineRule>,
    pub fallback: FallbackPairs,
    pub images: ImagePools,
}

impl Catalog {
    /// The compiled-in catalog. Parsing it can only fail if the embedded
    /// file is broken, which is a build defect, so this panics rather
    /// than propagating.
    pub fn builtin() -> Self {
        toml::from_str(BUILTIN_CATALOG).expect("embedded catalog must parse")
    }

    /// Load a catalog override from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = Catalog::builtin();
        assert!(!catalog.amenity.is_empty());
        assert!(!catalog.shop.is_empty());
        assert!(!catalog.tourism.is_empty());
        assert!(!catalog.leisure.is_empty());
        assert!(!catalog.craft.is_empty());
        assert!(!catalog.cuisine.is_empty());
        assert!(!catalog.images.default.is_empty());
    }

    #[test]
    fn test_builtin_catalog_entries() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.amenity.get("restaurant"),
            Some(&("Restaurants".to_string(), "Dinner".to_string()))
        );
        assert_eq!(
            catalog.shop.get("bakery"),
            Some(&("Restaurants".to_string(), "Bakeries".to_string()))
        );
        assert_eq!(
            catalog.craft.get("plumber"),
            Some(&("Home & Garden".to_string(), "Plumbers".to_string()))
        );
        assert_eq!(catalog.fallback.retail.1, "Thrift Stores");
        assert_eq!(catalog.fallback.amenity.1, "Banks");
    }

    #[test]
    fn test_cuisine_rules_keep_file_order() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.cuisine[0].contains, "mexican");
        let burger = catalog
            .cuisine
            .iter()
            .position(|r| r.contains == "burger")
            .unwrap();
        let bbq = catalog
            .cuisine
            .iter()
            .position(|r| r.contains == "bbq")
            .unwrap();
        assert!(burger < bbq);
    }

    #[test]
    fn test_from_file_reads_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[craft]
welder = ["Home & Garden", "Contractors"]

[amenity]
[shop]
[tourism]
[leisure]

[[cuisine]]
contains = "pizza"
subcategory = "Pizza"

[fallback]
retail = ["More", "Thrift Stores"]
amenity = ["More", "Banks"]

[images]
default = "https://example.com/fallback.jpg"
"#
        )
        .unwrap();

        let catalog = Catalog::from_file(file.path()).unwrap();
        assert_eq!(
            catalog.craft.get("welder"),
            Some(&("Home & Garden".to_string(), "Contractors".to_string()))
        );
        assert!(catalog.amenity.is_empty());
        assert_eq!(catalog.images.default, "https://example.com/fallback.jpg");
    }

    #[test]
    fn test_from_file_missing_path_errors() {
        assert!(Catalog::from_file("/nonexistent/catalog.toml").is_err());
    }
}
