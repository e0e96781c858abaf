//! Tag classification into the business taxonomy
//!
//! Maps a raw element's tag set onto one (category, subcategory) pair
//! using the catalog tables. Matching is total: every tag set resolves,
//! falling back to the generic retail pair when nothing applies.
//!
//! Table priority: craft, amenity, shop, tourism, leisure. Restaurants
//! and fast food additionally refine their subcategory from the cuisine
//! tag before the mapped value is returned.

use crate::infra::catalog::{Catalog, CategoryPair};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Amenity values whose subcategory the cuisine tag may refine.
const FOOD_SERVICE_AMENITIES: [&str; 2] = ["restaurant", "fast_food"];

/// Labels offered when the suggestion query is empty, most used first.
const POPULAR_LABELS: [&str; 12] = [
    "Restaurants",
    "Delivery",
    "Takeout",
    "Coffee & Cafes",
    "Plumbers",
    "Auto Repair",
    "Dentists",
    "Hair Salons",
    "Gyms",
    "Hotels",
    "Pizza",
    "Contractors",
];

/// Cap on suggestion rows returned per query.
const MAX_SUGGESTIONS: usize = 7;

/// One autocomplete row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Suggestion {
    fn category(label: &str) -> Self {
        Self {
            label: label.to_string(),
            kind: "category".to_string(),
        }
    }
}

/// Catalog-backed classifier shared across the service.
pub struct Taxonomy {
    catalog: Arc<Catalog>,
}

impl Taxonomy {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Classify a tag set. Always returns a pair.
    pub fn categorize(&self, tags: &HashMap<String, String>) -> CategoryPair {
        let get = |key: &str| {
            tags.get(key)
                .map(String::as_str)
                .filter(|value| !value.is_empty())
        };

        if let Some(pair) = get("craft").and_then(|v| self.catalog.craft.get(v)) {
            return pair.clone();
        }

        if let Some(value) = get("amenity") {
            if let Some((category, subcategory)) = self.catalog.amenity.get(value) {
                let mut subcategory = subcategory.clone();
                if FOOD_SERVICE_AMENITIES.contains(&value) {
                    if let Some(refined) = get("cuisine").and_then(|c| self.refine_cuisine(c)) {
                        subcategory = refined;
                    }
                }
                return (category.clone(), subcategory);
            }
        }

        if let Some(pair) = get("shop").and_then(|v| self.catalog.shop.get(v)) {
            return pair.clone();
        }
        if let Some(pair) = get("tourism").and_then(|v| self.catalog.tourism.get(v)) {
            return pair.clone();
        }
        if let Some(pair) = get("leisure").and_then(|v| self.catalog.leisure.get(v)) {
            return pair.clone();
        }

        // Unmapped values still land in a browsable bucket.
        if get("shop").is_some() {
            return self.catalog.fallback.retail.clone();
        }
        if get("amenity").is_some() {
            return self.catalog.fallback.amenity.clone();
        }
        self.catalog.fallback.retail.clone()
    }

    /// Refined subcategory for a cuisine tag: only the first
    /// semicolon-separated token counts, and rules match by substring in
    /// catalog order.
    fn refine_cuisine(&self, cuisine: &str) -> Option<String> {
        let lowered = cuisine.to_lowercase();
        let token = lowered.split(';').next().unwrap_or("").trim();
        if token.is_empty() {
            return None;
        }
        self.catalog
            .cuisine
            .iter()
            .find(|rule| token.contains(&rule.contains))
            .map(|rule| rule.subcategory.clone())
    }

    /// Autocomplete rows for a partial query: popular labels when the
    /// query is empty, otherwise substring matches over the popular list
    /// and every catalog table, deduplicated by label.
    pub fn suggestions(&self, query: &str) -> Vec<Suggestion> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return POPULAR_LABELS
                .iter()
                .take(MAX_SUGGESTIONS)
                .map(|label| Suggestion::category(label))
                .collect();
        }

        let mut out: Vec<Suggestion> = POPULAR_LABELS
            .iter()
            .filter(|label| label.to_lowercase().contains(&query))
            .map(|label| Suggestion::category(label))
            .collect();
        let mut seen: Vec<String> = out.iter().map(|s| s.label.clone()).collect();

        let tables = [
            &self.catalog.amenity,
            &self.catalog.shop,
            &self.catalog.tourism,
            &self.catalog.leisure,
            &self.catalog.craft,
        ];
        for table in tables {
            for (key, (_, subcategory)) in table {
                let matches = subcategory.to_lowercase().contains(&query) || key.contains(&query);
                if matches && !seen.contains(subcategory) {
                    seen.push(subcategory.clone());
                    out.push(Suggestion::category(subcategory));
                }
            }
        }

        out.truncate(MAX_SUGGESTIONS);
        out
    }
}
