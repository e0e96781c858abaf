//! Raw element to business record normalization
//!
//! Turns heterogeneous tag soups into uniform `BusinessRecord`s:
//! - rejects elements without a usable name or coordinate
//! - classifies via the taxonomy and assigns a display image
//! - composes address and locality labels from addr:* tags
//! - derives feature flags, tag labels, distance, and the
//!   completeness score used for ranking
//!
//! Normalization is pure per element; the same input always yields the
//! same record.

use crate::domain::business::{Business, BusinessRecord};
use crate::domain::types::{Coordinates, OverpassElement};
use crate::services::images::ImageSelector;
use crate::services::taxonomy::Taxonomy;
use std::sync::Arc;

/// Cap on feature flags carried per record.
const MAX_FEATURES: usize = 6;
/// Cap on tag labels carried per record.
const MAX_TAG_LABELS: usize = 4;
/// Cuisine tokens considered for tag labels.
const MAX_CUISINE_LABELS: usize = 3;

/// Meters per degree of latitude, also per degree of longitude at the
/// equator.
const METERS_PER_DEGREE: f64 = 111_320.0;

pub struct Normalizer {
    taxonomy: Arc<Taxonomy>,
    images: ImageSelector,
}

impl Normalizer {
    pub fn new(taxonomy: Arc<Taxonomy>, images: ImageSelector) -> Self {
        Self { taxonomy, images }
    }

    /// Build a record from a raw element, or `None` when the element has
    /// no name or cannot be placed.
    pub fn normalize(&self, element: &OverpassElement, origin: Coordinates) -> Option<BusinessRecord> {
        let name = element.tag("name")?;
        let coords = element.coordinates()?;

        let (category, subcategory) = self.taxonomy.categorize(&element.tags);

        let phone = element
            .tag("phone")
            .or_else(|| element.tag("contact:phone"))
            .unwrap_or("");
        let website = element
            .tag("website")
            .or_else(|| element.tag("contact:website"))
            .unwrap_or("");
        let opening_hours = element.tag("opening_hours").unwrap_or("");
        let description = element.tag("description").unwrap_or("");
        let brand = element.tag("brand").unwrap_or("");
        let cuisine = element.tag("cuisine").unwrap_or("");

        let address = compose_address(element);
        let location = compose_location(element);
        let features = collect_features(element);
        let tag_labels = collect_tag_labels(&subcategory, cuisine, brand);
        let image = self.images.select(name, &category, &subcategory);

        let completeness =
            completeness_score(phone, website, opening_hours, &address, description, brand);
        let search_blob =
            format!("{name} {brand} {cuisine} {subcategory} {category}").to_lowercase();

        Some(BusinessRecord {
            business: Business {
                id: element.id,
                name: name.to_string(),
                category,
                subcategory,
                lat: coords.lat,
                lng: coords.lng,
                location,
                address,
                phone: phone.to_string(),
                website: website.to_string(),
                opening_hours: opening_hours.to_string(),
                description: description.to_string(),
                brand: brand.to_string(),
                features,
                tag_labels,
                image,
                is_verified: !phone.is_empty() || !website.is_empty(),
                distance_meters: planar_distance_m(origin, coords),
            },
            completeness,
            search_blob,
        })
    }
}

/// House number and street joined with ", "; either side may be absent.
fn compose_address(element: &OverpassElement) -> String {
    let mut parts = Vec::with_capacity(2);
    if let Some(number) = element.tag("addr:housenumber") {
        parts.push(number);
    }
    if let Some(street) = element.tag("addr:street") {
        parts.push(street);
    }
    parts.join(", ")
}

/// Locality label: "{city}, {state}" with blank sides trimmed away, the
/// postcode appended when a label exists, "Nearby" when nothing does.
fn compose_location(element: &OverpassElement) -> String {
    let city = element.tag("addr:city").unwrap_or("");
    let state = element.tag("addr:state").unwrap_or("");

    let mut label = format!("{city}, {state}")
        .trim_matches(|c: char| c == ',' || c == ' ')
        .to_string();
    if !label.is_empty() {
        if let Some(postcode) = element.tag("addr:postcode") {
            label.push(' ');
            label.push_str(postcode);
        }
    }

    if label.is_empty() {
        "Nearby".to_string()
    } else {
        label
    }
}

/// Feature flags from well-known accessibility and service tags.
fn collect_features(element: &OverpassElement) -> Vec<String> {
    let mut features: Vec<String> = Vec::new();
    if matches!(element.tag("wheelchair"), Some("yes" | "limited")) {
        features.push("Wheelchair Accessible".to_string());
    }
    if matches!(element.tag("internet_access"), Some("yes" | "wlan")) {
        features.push("Free Wi-Fi".to_string());
    }
    if element.tag("outdoor_seating") == Some("yes") {
        features.push("Outdoor Seating".to_string());
    }
    if matches!(element.tag("takeaway"), Some("yes" | "only")) {
        features.push("Takeout Available".to_string());
    }
    if element.tag("delivery") == Some("yes") {
        features.push("Delivery".to_string());
    }
    dedup_keep_first(&mut features);
    features.truncate(MAX_FEATURES);
    features
}

/// Display labels: cuisine tokens (title-cased, first few) plus the
/// subcategory, or just the subcategory; a known brand not already
/// listed goes in front. Deduplicated and capped.
fn collect_tag_labels(subcategory: &str, cuisine: &str, brand: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    if cuisine.is_empty() {
        labels.push(subcategory.to_string());
    } else {
        labels.extend(
            cuisine
                .split(';')
                .take(MAX_CUISINE_LABELS)
                .map(|token| title_case(token.trim()))
                .filter(|token| !token.is_empty()),
        );
        labels.push(subcategory.to_string());
    }

    if !brand.is_empty() && !labels.iter().any(|label| label == brand) {
        labels.insert(0, brand.to_string());
    }

    dedup_keep_first(&mut labels);
    labels.truncate(MAX_TAG_LABELS);
    labels
}

/// Drop repeated entries, keeping the first occurrence.
fn dedup_keep_first(labels: &mut Vec<String>) {
    let mut seen: Vec<String> = Vec::with_capacity(labels.len());
    labels.retain(|label| {
        if seen.contains(label) {
            false
        } else {
            seen.push(label.clone());
            true
        }
    });
}

/// Title-case each word: first letter upper, the rest lower. Any
/// non-letter character starts a new word.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(ch);
            word_start = true;
        }
    }
    out
}

/// Planar approximation of the distance from the query origin, rounded
/// to whole meters. Good enough at neighborhood radii; not a
/// great-circle distance.
fn planar_distance_m(origin: Coordinates, point: Coordinates) -> u32 {
    let dx = (point.lat - origin.lat) * METERS_PER_DEGREE;
    let dy = (point.lng - origin.lng) * METERS_PER_DEGREE * origin.lat.to_radians().cos();
    (dx * dx + dy * dy).sqrt().round() as u32
}

/// Metadata presence score. Contact fields weigh most; brand least.
fn completeness_score(
    phone: &str,
    website: &str,
    opening_hours: &str,
    address: &str,
    description: &str,
    brand: &str,
) -> u8 {
    let mut score = 0;
    if !phone.is_empty() {
        score += 3;
    }
    if !website.is_empty() {
        score += 3;
    }
    if !opening_hours.is_empty() {
        score += 2;
    }
    if !address.is_empty() {
        score += 2;
    }
    if !description.is_empty() {
        score += 2;
    }
    if !brand.is_empty() {
        score += 1;
    }
    score
}
