//! Overpass API client
//!
//! Fetches named points of interest around a coordinate. The query asks
//! for nodes and ways across the taxonomy's tag keys; ways come back with
//! a computed center so everything downstream is a point. Mirrors are
//! tried in configured order and the first answer wins.

use crate::domain::types::{OverpassElement, OverpassResponse};
use crate::infra::config::Config;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, warn};

/// Tag keys selecting point elements.
const NODE_TAG_KEYS: [&str; 5] = ["amenity", "shop", "tourism", "leisure", "craft"];
/// Tag keys selecting extended shapes; these return a computed center.
const WAY_TAG_KEYS: [&str; 4] = ["amenity", "shop", "tourism", "craft"];

/// Server-side query timeout baked into the QL header.
const QUERY_TIMEOUT_SECS: u32 = 30;

/// Source of raw elements for an area. The cache populates through this
/// seam so tests can substitute fixtures for the network.
#[async_trait]
pub trait AreaFetcher: Send + Sync {
    async fn fetch_area(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
    ) -> anyhow::Result<Vec<OverpassElement>>;
}

pub struct OverpassClient {
    client: reqwest::Client,
    mirrors: Vec<String>,
    element_limit: u32,
}

impl OverpassClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.overpass_timeout_secs()))
            .build()
            .context("Failed to build overpass HTTP client")?;
        Ok(Self {
            client,
            mirrors: config.overpass_mirrors().to_vec(),
            element_limit: config.overpass_element_limit(),
        })
    }

    /// Overpass QL for named elements around the origin.
    fn build_query(&self, lat: f64, lng: f64, radius_m: u32) -> String {
        let mut query = String::with_capacity(512);
        let _ = write!(query, "[out:json][timeout:{QUERY_TIMEOUT_SECS}];(");
        for key in NODE_TAG_KEYS {
            let _ = write!(query, "node[\"name\"][\"{key}\"](around:{radius_m},{lat},{lng});");
        }
        for key in WAY_TAG_KEYS {
            let _ = write!(query, "way[\"name\"][\"{key}\"](around:{radius_m},{lat},{lng});");
        }
        let _ = write!(query, ");out center {};", self.element_limit);
        query
    }

    async fn try_mirror(&self, mirror: &str, query: &str) -> anyhow::Result<Vec<OverpassElement>> {
        let response = self
            .client
            .post(mirror)
            .form(&[("data", query)])
            .send()
            .await
            .with_context(|| format!("Request to {mirror} failed"))?
            .error_for_status()
            .with_context(|| format!("{mirror} returned an error status"))?;

        let body: OverpassResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to decode response from {mirror}"))?;
        Ok(body.elements)
    }
}

#[async_trait]
impl AreaFetcher for OverpassClient {
    async fn fetch_area(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
    ) -> anyhow::Result<Vec<OverpassElement>> {
        let query = self.build_query(lat, lng, radius_m);

        let mut last_error = None;
        for mirror in &self.mirrors {
            match self.try_mirror(mirror, &query).await {
                Ok(elements) => {
                    debug!(mirror = %mirror, elements = %elements.len(), "overpass_fetch_ok");
                    return Ok(elements);
                }
                Err(e) => {
                    warn!(mirror = %mirror, error = %e, "overpass_mirror_failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("No overpass mirrors configured")))
    }
}
