//! Normalized business listings
//!
//! `Business` is the uniform record the API serves, regardless of which
//! raw tags produced it. `BusinessRecord` pairs it with the internal
//! ranking and matching fields; only the inner `Business` is ever
//! serialized, so internals stay out of responses by construction.

use serde::Serialize;

/// A business listing as served to clients, camelCase on the wire.
///
/// Optional source fields are carried as empty strings rather than
/// nulls so every record has the same shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub subcategory: String,
    pub lat: f64,
    pub lng: f64,
    /// Human-readable locality label, "Nearby" when nothing is known.
    pub location: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub opening_hours: String,
    pub description: String,
    pub brand: String,
    /// Amenity flags derived from well-known tags, deduplicated.
    pub features: Vec<String>,
    /// Short display labels: brand, cuisine, subcategory.
    pub tag_labels: Vec<String>,
    /// Deterministically selected display image URL.
    pub image: String,
    /// Set when the record carries a phone or website.
    pub is_verified: bool,
    /// Planar distance from the query origin, whole meters.
    pub distance_meters: u32,
}

/// A business plus the fields ranking and filtering run on.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessRecord {
    pub business: Business,
    /// Metadata-presence score; primary rank key within an area.
    pub completeness: u8,
    /// Lowercased name, brand, cuisine, and taxonomy text for
    /// substring matching.
    pub search_blob: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_business() -> Business {
        Business {
            id: 11,
            name: "Blue Plate Diner".to_string(),
            category: "Restaurants".to_string(),
            subcategory: "Breakfast & Brunch".to_string(),
            lat: 40.75,
            lng: -111.87,
            location: "Salt Lake City, UT".to_string(),
            address: "2041, 2100 S".to_string(),
            phone: "+1 801 555 0199".to_string(),
            website: String::new(),
            opening_hours: "Mo-Su 08:00-15:00".to_string(),
            description: String::new(),
            brand: String::new(),
            features: vec!["Outdoor Seating".to_string()],
            tag_labels: vec!["Breakfast & Brunch".to_string()],
            image: "https://images.example.com/a.jpg".to_string(),
            is_verified: true,
            distance_meters: 420,
        }
    }

    #[test]
    fn test_business_serializes_camel_case() {
        let value = serde_json::to_value(sample_business()).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("openingHours"));
        assert!(obj.contains_key("tagLabels"));
        assert!(obj.contains_key("isVerified"));
        assert!(obj.contains_key("distanceMeters"));
        assert!(!obj.contains_key("opening_hours"));
        assert_eq!(value["distanceMeters"], 420);
    }

    #[test]
    fn test_serialized_business_has_no_internal_fields() {
        let record = BusinessRecord {
            business: sample_business(),
            completeness: 8,
            search_blob: "blue plate diner".to_string(),
        };
        let value = serde_json::to_value(&record.business).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("completeness"));
        assert!(!obj.contains_key("searchBlob"));
        assert!(!obj.contains_key("search_blob"));
    }
}
