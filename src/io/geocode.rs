//! Nominatim geocoding client
//!
//! Two uses: turning a free-text place query into a coordinate, and
//! feeding the location picker with labeled suggestions. Nominatim asks
//! for a meaningful User-Agent, so the configured one rides on every
//! request. Suggestion lookups degrade to the built-in defaults when
//! the upstream is unavailable; plain geocoding surfaces the error.

use crate::infra::config::Config;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Cap on rows returned by the location picker.
const MAX_LOCATIONS: usize = 7;
/// Labels longer than this are cut when no locality is known.
const MAX_LABEL_CHARS: usize = 50;

/// One row for the location picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSuggestion {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl LocationSuggestion {
    fn labeled(label: &str, kind: &str) -> Self {
        Self {
            label: label.to_string(),
            kind: kind.to_string(),
            lat: None,
            lng: None,
        }
    }
}

/// Geocoded point for a free-text query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedPlace {
    pub lat: f64,
    pub lng: f64,
    pub display_name: String,
}

/// One Nominatim search hit. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    village: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

pub struct GeocodeClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl GeocodeClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.geocode_timeout_secs()))
            .build()
            .context("Failed to build geocode HTTP client")?;
        Ok(Self {
            client,
            base_url: config.geocode_base_url().to_string(),
            user_agent: config.geocode_user_agent().to_string(),
        })
    }

    /// Best-match coordinate for a place query, `None` when nothing
    /// matched.
    pub async fn geocode(&self, query: &str) -> anyhow::Result<Option<GeocodedPlace>> {
        let hits = self.fetch(query, 1, false).await?;
        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(GeocodedPlace {
            lat: hit
                .lat
                .parse()
                .context("Nominatim returned a non-numeric latitude")?,
            lng: hit
                .lon
                .parse()
                .context("Nominatim returned a non-numeric longitude")?,
            display_name: hit.display_name,
        }))
    }

    /// Rows for the location picker: the defaults when the query is
    /// empty or the upstream fails, otherwise "Current Location" plus
    /// labeled search results.
    pub async fn suggest_locations(&self, query: &str) -> Vec<LocationSuggestion> {
        let query = query.trim();
        if query.is_empty() {
            return default_locations();
        }

        let hits = match self.fetch(query, 5, true).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "location_suggest_failed");
                return default_locations();
            }
        };

        let mut rows = vec![LocationSuggestion::labeled("Current Location", "current")];
        for hit in hits {
            let (Ok(lat), Ok(lng)) = (hit.lat.parse::<f64>(), hit.lon.parse::<f64>()) else {
                continue;
            };
            rows.push(LocationSuggestion {
                label: result_label(&hit),
                kind: "result".to_string(),
                lat: Some(lat),
                lng: Some(lng),
            });
        }
        rows.truncate(MAX_LOCATIONS);
        rows
    }

    async fn fetch(
        &self,
        query: &str,
        limit: u32,
        address_details: bool,
    ) -> anyhow::Result<Vec<NominatimHit>> {
        let url = format!("{}/search", self.base_url);
        let limit = limit.to_string();
        let mut request = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", &limit)])
            .header("User-Agent", &self.user_agent);
        if address_details {
            request = request.query(&[("addressdetails", "1")]);
        }

        let response = request
            .send()
            .await
            .context("Nominatim request failed")?
            .error_for_status()
            .context("Nominatim returned an error status")?;
        response
            .json()
            .await
            .context("Failed to decode Nominatim response")
    }
}

/// Label for one search hit: "{locality}, {state}" when a locality is
/// known, otherwise the display name cut to a sane length.
fn result_label(hit: &NominatimHit) -> String {
    let address = hit.address.as_ref();
    let locality = address
        .and_then(|a| {
            a.city
                .as_deref()
                .or(a.town.as_deref())
                .or(a.village.as_deref())
        })
        .unwrap_or("");

    if locality.is_empty() {
        return hit.display_name.chars().take(MAX_LABEL_CHARS).collect();
    }

    let state = address.and_then(|a| a.state.as_deref()).unwrap_or("");
    format!("{locality}, {state}")
        .trim_matches(|c: char| c == ',' || c == ' ')
        .to_string()
}

/// Picker rows shown before the user types anything.
fn default_locations() -> Vec<LocationSuggestion> {
    vec![
        LocationSuggestion::labeled("Current Location", "current"),
        LocationSuggestion::labeled("South Jordan, UT", "recent"),
        LocationSuggestion::labeled("Salt Lake City, UT", "city"),
        LocationSuggestion::labeled("West Valley City, UT", "city"),
        LocationSuggestion::labeled("Sandy, UT", "city"),
        LocationSuggestion::labeled("Murray, UT", "city"),
        LocationSuggestion::labeled("Midvale, UT", "city"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_locations_shape() {
        let rows = default_locations();
        assert_eq!(rows.len(), MAX_LOCATIONS);
        assert_eq!(rows[0].label, "Current Location");
        assert_eq!(rows[0].kind, "current");
        assert!(rows[0].lat.is_none());
        assert!(rows.iter().skip(2).all(|row| row.kind == "city"));
    }

    #[test]
    fn test_result_label_prefers_city_and_state() {
        let hit = NominatimHit {
            lat: "40.7".to_string(),
            lon: "-111.9".to_string(),
            display_name: "Salt Lake City, Salt Lake County, Utah, USA".to_string(),
            address: Some(NominatimAddress {
                city: Some("Salt Lake City".to_string()),
                state: Some("Utah".to_string()),
                ..Default::default()
            }),
        };
        assert_eq!(result_label(&hit), "Salt Lake City, Utah");
    }

    #[test]
    fn test_result_label_falls_back_through_town_and_village() {
        let hit = NominatimHit {
            lat: "0".to_string(),
            lon: "0".to_string(),
            display_name: String::new(),
            address: Some(NominatimAddress {
                town: Some("Midvale".to_string()),
                ..Default::default()
            }),
        };
        assert_eq!(result_label(&hit), "Midvale");
    }

    #[test]
    fn test_result_label_truncates_display_name() {
        let hit = NominatimHit {
            lat: "0".to_string(),
            lon: "0".to_string(),
            display_name: "x".repeat(80),
            address: None,
        };
        assert_eq!(result_label(&hit).chars().count(), MAX_LABEL_CHARS);
    }

    #[test]
    fn test_geocoded_place_serializes_camel_case() {
        let place = GeocodedPlace {
            lat: 40.7,
            lng: -111.9,
            display_name: "Salt Lake City".to_string(),
        };
        let value = serde_json::to_value(place).unwrap();
        assert_eq!(value["displayName"], "Salt Lake City");
        assert_eq!(value["lat"], 40.7);
    }

    #[test]
    fn test_nominatim_hit_decodes_string_coordinates() {
        let json = r#"[{
            "lat": "40.6961",
            "lon": "-111.8576",
            "display_name": "Murray, Salt Lake County, Utah, USA",
            "address": {"city": "Murray", "state": "Utah"}
        }]"#;
        let hits: Vec<NominatimHit> = serde_json::from_str(json).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].lat, "40.6961");
        assert_eq!(result_label(&hits[0]), "Murray, Utah");
    }
}
