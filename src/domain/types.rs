//! Wire types for raw map data
//!
//! Overpass delivers points of interest as JSON elements; these types
//! mirror that payload plus the coordinate resolution rule downstream
//! normalization depends on. Tags arrive as a flat string map and empty
//! values are treated as absent throughout.

use serde::Deserialize;
use std::collections::HashMap;

/// A geographic point in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Top-level Overpass response body.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

/// Element kind as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
    #[serde(other)]
    Other,
}

/// Centroid attached to extended shapes queried with `out center`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

/// One raw point-of-interest element.
///
/// Nodes carry their own coordinate; ways and relations only carry the
/// computed `center`.
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub center: Option<Center>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl OverpassElement {
    /// Tag value, with empty strings treated as absent.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Resolved coordinate: a node's own position, otherwise the centroid.
    /// Elements without either cannot be placed and yield `None`.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self.kind {
            ElementKind::Node => match (self.lat, self.lon) {
                (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
                _ => None,
            },
            _ => self.center.map(|c| Coordinates {
                lat: c.lat,
                lng: c.lon,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_node_element() {
        let json = r#"{
            "type": "node",
            "id": 42,
            "lat": 40.56,
            "lon": -111.93,
            "tags": {"name": "Corner Cafe", "amenity": "cafe"}
        }"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.kind, ElementKind::Node);
        assert_eq!(element.id, 42);
        assert_eq!(element.tag("name"), Some("Corner Cafe"));
        let coords = element.coordinates().unwrap();
        assert_eq!(coords.lat, 40.56);
        assert_eq!(coords.lng, -111.93);
    }

    #[test]
    fn test_decode_way_uses_center() {
        let json = r#"{
            "type": "way",
            "id": 7,
            "center": {"lat": 40.5, "lon": -111.9},
            "tags": {"name": "Big Box", "shop": "supermarket"}
        }"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.kind, ElementKind::Way);
        let coords = element.coordinates().unwrap();
        assert_eq!(coords.lat, 40.5);
        assert_eq!(coords.lng, -111.9);
    }

    #[test]
    fn test_node_without_position_is_unplaceable() {
        let json = r#"{"type": "node", "id": 1, "tags": {"name": "Ghost"}}"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        assert!(element.coordinates().is_none());
    }

    #[test]
    fn test_way_without_center_is_unplaceable() {
        let json = r#"{"type": "way", "id": 2, "tags": {"name": "Outline Only"}}"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        assert!(element.coordinates().is_none());
    }

    #[test]
    fn test_empty_tag_reads_as_absent() {
        let json = r#"{
            "type": "node",
            "id": 3,
            "lat": 1.0,
            "lon": 2.0,
            "tags": {"name": "", "phone": "  "}
        }"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.tag("name"), None);
        assert_eq!(element.tag("phone"), Some("  "));
        assert_eq!(element.tag("website"), None);
    }

    #[test]
    fn test_unknown_element_kind_decodes() {
        let json = r#"{"type": "area", "id": 9, "tags": {}}"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.kind, ElementKind::Other);
        assert!(element.coordinates().is_none());
    }

    #[test]
    fn test_response_defaults_to_empty_elements() {
        let response: OverpassResponse = serde_json::from_str("{}").unwrap();
        assert!(response.elements.is_empty());
    }
}
