//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counter updates are lock-free; reporting is the only operation
//! that needs synchronization (via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Prometheus-style exponential bucket boundaries (milliseconds)
/// Buckets: ≤50, ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, >25600
const BUCKET_BOUNDS: [u64; 10] = [50, 100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_ms: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_ms)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Load all bucket values without resetting
#[inline]
fn load_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.load(Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [50, 100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
///
/// All recording operations are lock-free using atomics.
/// The `report()` method swaps the interval counters for a consistent
/// snapshot while leaving the cumulative ones untouched.
pub struct Metrics {
    /// Total search requests served (monotonic)
    searches_total: AtomicU64,
    /// Search requests since last report (reset on report)
    searches_since_report: AtomicU64,
    /// Cache lookups answered from a live entry (monotonic)
    cache_hits_total: AtomicU64,
    /// Cache lookups with no entry at all (monotonic)
    cache_misses_total: AtomicU64,
    /// Cache lookups that found only a stale entry (monotonic)
    cache_expired_total: AtomicU64,
    /// Lookups resolved by waiting on another request's fetch (monotonic)
    cache_coalesced_total: AtomicU64,
    /// Upstream fetches that failed on every mirror (monotonic)
    fetch_errors_total: AtomicU64,
    /// Upstream fetch latency histogram buckets (cumulative)
    fetch_latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Sum of fetch latencies in milliseconds (cumulative)
    fetch_latency_sum_ms: AtomicU64,
    /// Max fetch latency since last report (reset on report)
    fetch_latency_max_ms: AtomicU64,
    /// Raw elements fetched from upstream (monotonic)
    elements_fetched_total: AtomicU64,
    /// Elements dropped during normalization or dedup (monotonic)
    elements_skipped_total: AtomicU64,
    /// Geocode requests (monotonic)
    geocode_requests_total: AtomicU64,
    /// Geocode requests that failed upstream (monotonic)
    geocode_errors_total: AtomicU64,
    /// Suggestion requests (monotonic)
    suggest_requests_total: AtomicU64,
    /// Last report time (only accessed from reporter, not atomic)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            searches_total: AtomicU64::new(0),
            searches_since_report: AtomicU64::new(0),
            cache_hits_total: AtomicU64::new(0),
            cache_misses_total: AtomicU64::new(0),
            cache_expired_total: AtomicU64::new(0),
            cache_coalesced_total: AtomicU64::new(0),
            fetch_errors_total: AtomicU64::new(0),
            fetch_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            fetch_latency_sum_ms: AtomicU64::new(0),
            fetch_latency_max_ms: AtomicU64::new(0),
            elements_fetched_total: AtomicU64::new(0),
            elements_skipped_total: AtomicU64::new(0),
            geocode_requests_total: AtomicU64::new(0),
            geocode_errors_total: AtomicU64::new(0),
            suggest_requests_total: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record a search request (lock-free)
    #[inline]
    pub fn record_search(&self) {
        self.searches_total.fetch_add(1, Ordering::Relaxed);
        self.searches_since_report.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache lookup answered from a live entry (lock-free)
    #[inline]
    pub fn record_cache_hit(&self) {
        self.cache_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache lookup with no entry (lock-free)
    #[inline]
    pub fn record_cache_miss(&self) {
        self.cache_misses_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache lookup that found only a stale entry (lock-free)
    #[inline]
    pub fn record_cache_expired(&self) {
        self.cache_expired_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup that rode on another request's fetch (lock-free)
    #[inline]
    pub fn record_cache_coalesced(&self) {
        self.cache_coalesced_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an upstream fetch that failed on every mirror (lock-free)
    #[inline]
    pub fn record_fetch_error(&self) {
        self.fetch_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record upstream fetch latency in milliseconds (lock-free)
    #[inline]
    pub fn record_fetch_latency(&self, latency_ms: u64) {
        let bucket = bucket_index(latency_ms);
        self.fetch_latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.fetch_latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        update_atomic_max(&self.fetch_latency_max_ms, latency_ms);
    }

    /// Record an area population: raw element count and how many survived
    /// normalization and dedup (lock-free)
    #[inline]
    pub fn record_elements(&self, fetched: u64, kept: u64) {
        self.elements_fetched_total.fetch_add(fetched, Ordering::Relaxed);
        self.elements_skipped_total
            .fetch_add(fetched.saturating_sub(kept), Ordering::Relaxed);
    }

    /// Record a geocode request (lock-free)
    #[inline]
    pub fn record_geocode(&self) {
        self.geocode_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a geocode request that failed upstream (lock-free)
    #[inline]
    pub fn record_geocode_error(&self) {
        self.geocode_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a suggestion request (lock-free)
    #[inline]
    pub fn record_suggest(&self) {
        self.suggest_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total searches served
    #[inline]
    #[allow(dead_code)]
    pub fn searches_total(&self) -> u64 {
        self.searches_total.load(Ordering::Relaxed)
    }

    /// Get cache hits total
    #[inline]
    #[allow(dead_code)]
    pub fn cache_hits_total(&self) -> u64 {
        self.cache_hits_total.load(Ordering::Relaxed)
    }

    /// Get cache misses total
    #[inline]
    #[allow(dead_code)]
    pub fn cache_misses_total(&self) -> u64 {
        self.cache_misses_total.load(Ordering::Relaxed)
    }

    /// Get fetch errors total
    #[inline]
    #[allow(dead_code)]
    pub fn fetch_errors_total(&self) -> u64 {
        self.fetch_errors_total.load(Ordering::Relaxed)
    }

    /// Calculate and return a metrics summary, then reset interval counters
    ///
    /// Cumulative counters and the latency histogram are loaded without
    /// reset; only the per-interval rate and max swap to zero.
    pub fn report(&self) -> MetricsSummary {
        let searches_count = self.searches_since_report.swap(0, Ordering::Relaxed);
        let fetch_max = self.fetch_latency_max_ms.swap(0, Ordering::Relaxed);

        let fetch_buckets = load_buckets(&self.fetch_latency_buckets);
        let fetch_sum = self.fetch_latency_sum_ms.load(Ordering::Relaxed);
        let fetch_count: u64 = fetch_buckets.iter().sum();
        let fetch_avg = if fetch_count > 0 { fetch_sum / fetch_count } else { 0 };
        let fetch_p95 = percentile_from_buckets(&fetch_buckets, 0.95);

        // Calculate elapsed time and reset
        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let searches_per_sec = if elapsed.as_secs_f64() > 0.0 {
            searches_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        MetricsSummary {
            searches_total: self.searches_total.load(Ordering::Relaxed),
            searches_per_sec,
            cache_hits: self.cache_hits_total.load(Ordering::Relaxed),
            cache_misses: self.cache_misses_total.load(Ordering::Relaxed),
            cache_expired: self.cache_expired_total.load(Ordering::Relaxed),
            cache_coalesced: self.cache_coalesced_total.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors_total.load(Ordering::Relaxed),
            fetch_latency_buckets: fetch_buckets,
            fetch_latency_sum_ms: fetch_sum,
            fetch_latency_avg_ms: fetch_avg,
            fetch_latency_max_ms: fetch_max,
            fetch_latency_p95_ms: fetch_p95,
            elements_fetched: self.elements_fetched_total.load(Ordering::Relaxed),
            elements_skipped: self.elements_skipped_total.load(Ordering::Relaxed),
            geocode_requests: self.geocode_requests_total.load(Ordering::Relaxed),
            geocode_errors: self.geocode_errors_total.load(Ordering::Relaxed),
            suggest_requests: self.suggest_requests_total.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of histogram buckets (exported for endpoint formatting)
pub const METRICS_NUM_BUCKETS: usize = NUM_BUCKETS;

/// Exported bucket bounds for Prometheus formatting
pub const METRICS_BUCKET_BOUNDS: [u64; 10] = BUCKET_BOUNDS;

#[derive(Debug)]
pub struct MetricsSummary {
    pub searches_total: u64,
    pub searches_per_sec: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_expired: u64,
    pub cache_coalesced: u64,
    pub fetch_errors: u64,
    /// Upstream fetch latency histogram buckets
    /// Bounds: ≤50, ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, >25600 ms
    pub fetch_latency_buckets: [u64; NUM_BUCKETS],
    pub fetch_latency_sum_ms: u64,
    pub fetch_latency_avg_ms: u64,
    /// Max fetch latency since the previous report (ms)
    pub fetch_latency_max_ms: u64,
    /// 95th percentile fetch latency (ms)
    pub fetch_latency_p95_ms: u64,
    pub elements_fetched: u64,
    pub elements_skipped: u64,
    pub geocode_requests: u64,
    pub geocode_errors: u64,
    pub suggest_requests: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            searches_total = %self.searches_total,
            searches_per_sec = format!("{:.1}", self.searches_per_sec),
            cache_hits = %self.cache_hits,
            cache_misses = %self.cache_misses,
            cache_expired = %self.cache_expired,
            cache_coalesced = %self.cache_coalesced,
            fetch_errors = %self.fetch_errors,
            fetch_avg_ms = %self.fetch_latency_avg_ms,
            fetch_p95_ms = %self.fetch_latency_p95_ms,
            fetch_max_ms = %self.fetch_latency_max_ms,
            elements_fetched = %self.elements_fetched,
            elements_skipped = %self.elements_skipped,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.searches_total(), 0);
        assert_eq!(metrics.cache_hits_total(), 0);
    }

    #[test]
    fn test_record_search() {
        let metrics = Metrics::new();

        metrics.record_search();
        metrics.record_search();
        assert_eq!(metrics.searches_total(), 2);
    }

    #[test]
    fn test_cache_counters_are_independent() {
        let metrics = Metrics::new();

        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_cache_expired();
        metrics.record_cache_coalesced();

        let summary = metrics.report();
        assert_eq!(summary.cache_hits, 2);
        assert_eq!(summary.cache_misses, 1);
        assert_eq!(summary.cache_expired, 1);
        assert_eq!(summary.cache_coalesced, 1);
    }

    #[test]
    fn test_report_resets_interval_counters_only() {
        let metrics = Metrics::new();

        metrics.record_search();
        metrics.record_cache_hit();
        metrics.record_fetch_latency(300);

        let summary = metrics.report();
        assert_eq!(summary.searches_total, 1);
        assert_eq!(summary.fetch_latency_max_ms, 300);

        // Totals survive the report, the max does not.
        let summary = metrics.report();
        assert_eq!(summary.searches_total, 1);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.fetch_latency_max_ms, 0);
        assert_eq!(summary.fetch_latency_avg_ms, 300);
    }

    #[test]
    fn test_fetch_latency_histogram() {
        let metrics = Metrics::new();

        metrics.record_fetch_latency(30); // bucket 0 (≤50)
        metrics.record_fetch_latency(80); // bucket 1 (≤100)
        metrics.record_fetch_latency(150); // bucket 2 (≤200)
        metrics.record_fetch_latency(60_000); // bucket 10 (overflow)

        let summary = metrics.report();
        assert_eq!(summary.fetch_latency_buckets[0], 1);
        assert_eq!(summary.fetch_latency_buckets[1], 1);
        assert_eq!(summary.fetch_latency_buckets[2], 1);
        assert_eq!(summary.fetch_latency_buckets[10], 1);
        assert_eq!(summary.fetch_latency_max_ms, 60_000);
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(50), 0);
        assert_eq!(bucket_index(51), 1);
        assert_eq!(bucket_index(100), 1);
        assert_eq!(bucket_index(101), 2);
        assert_eq!(bucket_index(25600), 9);
        assert_eq!(bucket_index(25601), 10); // overflow
        assert_eq!(bucket_index(100_000), 10);
    }

    #[test]
    fn test_percentile_computation() {
        let metrics = Metrics::new();

        // All samples in bucket 2 (≤200), so every percentile reports its
        // upper bound.
        for _ in 0..100 {
            metrics.record_fetch_latency(150);
        }

        let summary = metrics.report();
        assert_eq!(summary.fetch_latency_p95_ms, 200);
    }

    #[test]
    fn test_record_elements_tracks_skipped() {
        let metrics = Metrics::new();

        metrics.record_elements(10, 7);
        metrics.record_elements(5, 5);

        let summary = metrics.report();
        assert_eq!(summary.elements_fetched, 15);
        assert_eq!(summary.elements_skipped, 3);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(Metrics::new());
        let mut handles = vec![];

        // Spawn 10 threads, each recording 1000 searches
        for _ in 0..10 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    m.record_search();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(metrics.searches_total(), 10_000);
    }
}
