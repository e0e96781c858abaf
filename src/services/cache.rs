//! Per-area cache of normalized business records
//!
//! Keys quantize the query origin to a coarse grid (about 110 m cells)
//! plus the radius, so nearby searches share one entry. Entries hold an
//! immutable ranked snapshot and are replaced wholesale on refresh,
//! never mutated in place.
//!
//! Concurrent misses on the same key coalesce behind a per-key flight
//! guard so the upstream sees one fetch. A failed fetch leaves the
//! cache untouched; the next request simply tries again.

use crate::domain::business::BusinessRecord;
use crate::domain::types::{Coordinates, OverpassElement};
use crate::infra::metrics::Metrics;
use crate::io::overpass::AreaFetcher;
use crate::services::normalizer::Normalizer;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Grid scale for area keys: thousandths of a degree.
const GRID_SCALE: f64 = 1000.0;

/// Cache key: quantized origin cell plus radius. Different radii never
/// share an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaKey {
    lat_q: i32,
    lng_q: i32,
    radius_m: u32,
}

impl AreaKey {
    pub fn new(lat: f64, lng: f64, radius_m: u32) -> Self {
        Self {
            lat_q: (lat * GRID_SCALE).round() as i32,
            lng_q: (lng * GRID_SCALE).round() as i32,
            radius_m,
        }
    }
}

/// One cached area: the ranked snapshot and when it was built.
struct AreaEntry {
    records: Arc<[BusinessRecord]>,
    created_at: Instant,
}

/// Outcome of a cache lookup.
enum Lookup {
    Hit(Arc<[BusinessRecord]>),
    Expired,
    Miss,
}

pub struct AreaCache {
    ttl: Duration,
    fetcher: Arc<dyn AreaFetcher>,
    normalizer: Arc<Normalizer>,
    metrics: Arc<Metrics>,
    entries: Mutex<FxHashMap<AreaKey, AreaEntry>>,
    /// One guard per key with a fetch in progress. Guards are removed
    /// once the fetch settles, so the map only holds active flights.
    flights: Mutex<FxHashMap<AreaKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl AreaCache {
    pub fn new(
        ttl: Duration,
        fetcher: Arc<dyn AreaFetcher>,
        normalizer: Arc<Normalizer>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            ttl,
            fetcher,
            normalizer,
            metrics,
            entries: Mutex::new(FxHashMap::default()),
            flights: Mutex::new(FxHashMap::default()),
        }
    }

    /// Records for an area: served from cache while the entry is live,
    /// otherwise fetched, normalized, ranked, and stored. Errors surface
    /// to the caller and nothing is cached for them.
    pub async fn get_or_fetch(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
    ) -> anyhow::Result<Arc<[BusinessRecord]>> {
        let key = AreaKey::new(lat, lng, radius_m);

        match self.lookup(key) {
            Lookup::Hit(records) => {
                self.metrics.record_cache_hit();
                debug!(lat = %lat, lng = %lng, radius_m = %radius_m, "area_cache_hit");
                return Ok(records);
            }
            Lookup::Expired => self.metrics.record_cache_expired(),
            Lookup::Miss => self.metrics.record_cache_miss(),
        }

        let flight = self.flight_guard(key);
        let _guard = flight.lock().await;

        // Another request may have populated the entry while we waited.
        if let Lookup::Hit(records) = self.lookup(key) {
            self.metrics.record_cache_coalesced();
            return Ok(records);
        }

        let outcome = self.populate(key, lat, lng, radius_m).await;
        self.release_flight(key);
        outcome
    }

    /// Check the entry map. The lock covers the staleness check so a
    /// concurrent replace cannot hand out a torn entry.
    fn lookup(&self, key: AreaKey) -> Lookup {
        let entries = self.entries.lock();
        match entries.get(&key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => {
                Lookup::Hit(Arc::clone(&entry.records))
            }
            Some(_) => Lookup::Expired,
            None => Lookup::Miss,
        }
    }

    /// Fetch, normalize, rank, and store the snapshot for an area.
    async fn populate(
        &self,
        key: AreaKey,
        lat: f64,
        lng: f64,
        radius_m: u32,
    ) -> anyhow::Result<Arc<[BusinessRecord]>> {
        let started = std::time::Instant::now();
        let elements = match self.fetcher.fetch_area(lat, lng, radius_m).await {
            Ok(elements) => elements,
            Err(e) => {
                self.metrics.record_fetch_error();
                warn!(lat = %lat, lng = %lng, radius_m = %radius_m, error = %e, "area_fetch_failed");
                return Err(e);
            }
        };
        self.metrics
            .record_fetch_latency(started.elapsed().as_millis() as u64);

        let fetched = elements.len();
        let records: Arc<[BusinessRecord]> = self
            .build_records(&elements, Coordinates { lat, lng })
            .into();
        self.metrics.record_elements(fetched as u64, records.len() as u64);

        info!(
            lat = %lat,
            lng = %lng,
            radius_m = %radius_m,
            fetched = %fetched,
            kept = %records.len(),
            "area_cached"
        );

        self.entries.lock().insert(
            key,
            AreaEntry {
                records: Arc::clone(&records),
                created_at: Instant::now(),
            },
        );
        Ok(records)
    }

    /// Normalize raw elements, drop the unusable and duplicate names,
    /// and rank by completeness (descending) then distance (ascending).
    fn build_records(
        &self,
        elements: &[OverpassElement],
        origin: Coordinates,
    ) -> Vec<BusinessRecord> {
        let mut records: Vec<BusinessRecord> = Vec::with_capacity(elements.len());
        let mut seen_names: FxHashSet<String> = FxHashSet::default();

        for element in elements {
            let Some(record) = self.normalizer.normalize(element, origin) else {
                continue;
            };
            // First occurrence of a name wins; chains reappear per node.
            if !seen_names.insert(record.business.name.trim().to_lowercase()) {
                continue;
            }
            records.push(record);
        }

        records.sort_by(|a, b| {
            b.completeness
                .cmp(&a.completeness)
                .then(a.business.distance_meters.cmp(&b.business.distance_meters))
        });
        records
    }

    fn flight_guard(&self, key: AreaKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut flights = self.flights.lock();
        Arc::clone(flights.entry(key).or_default())
    }

    fn release_flight(&self, key: AreaKey) {
        self.flights.lock().remove(&key);
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.entries.lock().len()
    }
}
