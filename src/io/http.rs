//! HTTP API server
//!
//! Routes:
//! - GET /api/search    - businesses around a point, filtered and paged
//! - GET /api/suggest   - category autocomplete for the search box
//! - GET /api/locations - rows for the location picker
//! - GET /api/geocode   - free-text place lookup
//! - GET /api/health    - liveness probe
//! - GET /metrics       - Prometheus text exposition
//!
//! Uses hyper for the HTTP server. API responses carry permissive CORS
//! headers so the web frontend can call from any origin.

use crate::domain::business::Business;
use crate::infra::config::Config;
use crate::infra::metrics::{
    Metrics, MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS,
};
use crate::io::geocode::GeocodeClient;
use crate::services::cache::AreaCache;
use crate::services::search::{search, SearchPage, SearchParams};
use crate::services::taxonomy::Taxonomy;
use anyhow::Context;
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::fmt::Write;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use url::form_urlencoded;

/// Advisory carried in an otherwise well-formed search response when
/// live data could not be fetched.
const DEGRADED_MESSAGE: &str =
    "Live business data is temporarily unavailable. Please try again shortly.";

/// Everything a request handler needs, shared across connections.
pub struct AppState {
    pub config: Config,
    pub cache: AreaCache,
    pub taxonomy: Arc<Taxonomy>,
    pub geocoder: GeocodeClient,
    pub metrics: Arc<Metrics>,
}

/// Decoded query string. On repeated keys the first occurrence wins.
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn from_uri(uri: &Uri) -> Self {
        Self::from_query(uri.query().unwrap_or(""))
    }

    fn from_query(query: &str) -> Self {
        Self(form_urlencoded::parse(query.as_bytes()).into_owned().collect())
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.parse().ok()
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key)?.parse().ok()
    }

    fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key)?.parse().ok()
    }
}

/// Search response envelope. Field names follow the frontend contract.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    businesses: Vec<Business>,
    total: usize,
    page: usize,
    per_page: usize,
    total_pages: usize,
    center: MapPoint,
    radius: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct MapPoint {
    lat: f64,
    lng: f64,
}

impl SearchResponse {
    fn paged(page: SearchPage, lat: f64, lng: f64, radius: u32) -> Self {
        Self {
            businesses: page.items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages: page.total_pages,
            center: MapPoint { lat, lng },
            radius,
            message: None,
        }
    }

    fn degraded(params: &SearchParams, lat: f64, lng: f64, radius: u32) -> Self {
        Self {
            businesses: Vec::new(),
            total: 0,
            page: 1,
            per_page: params.per_page.max(1),
            total_pages: 1,
            center: MapPoint { lat, lng },
            radius,
            message: Some(DEGRADED_MESSAGE.to_string()),
        }
    }
}

/// Serialize a body with the shared API headers.
fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let bytes = serde_json::to_vec(body).expect("response serialization should not fail");
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(bytes)))
        .expect("static response should not fail")
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &serde_json::json!({ "error": message }))
}

fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
        .body(Full::new(Bytes::from("")))
        .expect("static response should not fail")
}

fn not_found_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Full::new(Bytes::from("Not Found")))
        .expect("static response should not fail")
}

/// GET /api/search - the main lookup: area snapshot, then filter/page.
///
/// A fetch failure degrades rather than fails: the response stays
/// well-formed with an empty list and an advisory message, so the
/// frontend keeps rendering.
async fn handle_search(params: &QueryParams, state: &AppState) -> Response<Full<Bytes>> {
    state.metrics.record_search();

    let (Some(lat), Some(lng)) = (params.get_f64("lat"), params.get_f64("lng")) else {
        return error_response(StatusCode::BAD_REQUEST, "lat and lng required");
    };

    let radius = params
        .get_u32("radius")
        .unwrap_or_else(|| state.config.default_radius_m())
        .min(state.config.max_radius_m());
    let search_params = SearchParams {
        query: params.get("q").unwrap_or("").to_string(),
        category: params.get("category").unwrap_or("").to_string(),
        page: params.get_usize("page").unwrap_or(1),
        per_page: params
            .get_usize("per_page")
            .unwrap_or_else(|| state.config.default_per_page())
            .clamp(1, state.config.max_per_page()),
    };

    match state.cache.get_or_fetch(lat, lng, radius).await {
        Ok(records) => {
            let page = search(&records, &search_params);
            json_response(StatusCode::OK, &SearchResponse::paged(page, lat, lng, radius))
        }
        Err(e) => {
            warn!(error = %e, lat = %lat, lng = %lng, "search_degraded");
            json_response(
                StatusCode::OK,
                &SearchResponse::degraded(&search_params, lat, lng, radius),
            )
        }
    }
}

/// GET /api/suggest - category labels matching the typed prefix.
fn handle_suggest(params: &QueryParams, state: &AppState) -> Response<Full<Bytes>> {
    state.metrics.record_suggest();

    let suggestions = state.taxonomy.suggestions(params.get("q").unwrap_or(""));
    json_response(StatusCode::OK, &serde_json::json!({ "suggestions": suggestions }))
}

/// GET /api/locations - rows for the location picker.
async fn handle_locations(params: &QueryParams, state: &AppState) -> Response<Full<Bytes>> {
    state.metrics.record_suggest();

    let locations = state
        .geocoder
        .suggest_locations(params.get("q").unwrap_or(""))
        .await;
    json_response(StatusCode::OK, &serde_json::json!({ "locations": locations }))
}

/// GET /api/geocode - best-match coordinate for a place query.
async fn handle_geocode(params: &QueryParams, state: &AppState) -> Response<Full<Bytes>> {
    state.metrics.record_geocode();

    let query = params.get("q").map(str::trim).unwrap_or("");
    if query.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "q required");
    }

    match state.geocoder.geocode(query).await {
        Ok(Some(mut place)) => {
            if place.display_name.is_empty() {
                place.display_name = query.to_string();
            }
            json_response(StatusCode::OK, &place)
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Not found"),
        Err(e) => {
            state.metrics.record_geocode_error();
            warn!(error = %e, "geocode_failed");
            error_response(StatusCode::BAD_GATEWAY, "Geocoding service unavailable")
        }
    }
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let params = QueryParams::from_uri(req.uri());

    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/api/search") => handle_search(&params, &state).await,
        (&Method::GET, "/api/suggest") => handle_suggest(&params, &state),
        (&Method::GET, "/api/locations") => handle_locations(&params, &state).await,
        (&Method::GET, "/api/geocode") => handle_geocode(&params, &state).await,
        (&Method::GET, "/api/health") => {
            json_response(StatusCode::OK, &serde_json::json!({ "status": "ok" }))
        }
        (&Method::GET, "/metrics") => {
            let body = format_prometheus_metrics(&state.metrics);
            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail")
        }
        // CORS preflight for any API route
        (&Method::OPTIONS, path) if path.starts_with("/api/") => preflight_response(),
        _ => not_found_response(),
    };

    Ok(response)
}

/// Start the API HTTP server
pub async fn start_api_server(
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr = format!(
        "{}:{}",
        state.config.server_bind_address(),
        state.config.server_port()
    );
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind API server to {addr}"))?;

    info!(addr = %addr, "api_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "api_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "api_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("api_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge)
fn write_metric(output: &mut String, name: &str, help: &str, typ: MetricType, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name} {val}");
}

/// Write a gauge metric with f64 value
fn write_gauge_f64(output: &mut String, name: &str, help: &str, val: f64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} gauge");
    let _ = writeln!(output, "{name} {val:.6}");
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    bounds: &[u64; 10],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in bounds.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{le=\"+Inf\"}} {cumulative}");

    let count: u64 = buckets.iter().sum();
    let _ = writeln!(output, "{name}_sum {sum}");
    let _ = writeln!(output, "{name}_count {count}");
}

/// Format metrics in Prometheus text exposition format
fn format_prometheus_metrics(metrics: &Metrics) -> String {
    let summary = metrics.report();
    let mut output = String::with_capacity(4096);

    write_search_metrics(&mut output, &summary);
    write_cache_metrics(&mut output, &summary);
    write_fetch_metrics(&mut output, &summary);
    write_upstream_metrics(&mut output, &summary);

    output
}

fn write_search_metrics(output: &mut String, summary: &MetricsSummary) {
    write_metric(
        output,
        "smallspark_searches_total",
        "Total search requests served",
        MetricType::Counter,
        summary.searches_total,
    );
    write_gauge_f64(
        output,
        "smallspark_searches_per_sec",
        "Search requests per second since the last report",
        summary.searches_per_sec,
    );
    write_metric(
        output,
        "smallspark_elements_fetched_total",
        "Raw elements fetched from the map database",
        MetricType::Counter,
        summary.elements_fetched,
    );
    write_metric(
        output,
        "smallspark_elements_skipped_total",
        "Elements dropped during normalization and dedup",
        MetricType::Counter,
        summary.elements_skipped,
    );
}

fn write_cache_metrics(output: &mut String, summary: &MetricsSummary) {
    write_metric(
        output,
        "smallspark_cache_hits_total",
        "Area lookups served from a live entry",
        MetricType::Counter,
        summary.cache_hits,
    );
    write_metric(
        output,
        "smallspark_cache_misses_total",
        "Area lookups with no cached entry",
        MetricType::Counter,
        summary.cache_misses,
    );
    write_metric(
        output,
        "smallspark_cache_expired_total",
        "Area lookups that found only a stale entry",
        MetricType::Counter,
        summary.cache_expired,
    );
    write_metric(
        output,
        "smallspark_cache_coalesced_total",
        "Area lookups resolved by another request's fetch",
        MetricType::Counter,
        summary.cache_coalesced,
    );
}

fn write_fetch_metrics(output: &mut String, summary: &MetricsSummary) {
    write_metric(
        output,
        "smallspark_fetch_errors_total",
        "Area fetches that failed on every mirror",
        MetricType::Counter,
        summary.fetch_errors,
    );
    write_histogram(
        output,
        "smallspark_fetch_latency_ms",
        "Area fetch latency in milliseconds",
        &summary.fetch_latency_buckets,
        &METRICS_BUCKET_BOUNDS,
        summary.fetch_latency_sum_ms,
    );
    write_metric(
        output,
        "smallspark_fetch_latency_p95_ms",
        "95th percentile fetch latency",
        MetricType::Gauge,
        summary.fetch_latency_p95_ms,
    );
    write_metric(
        output,
        "smallspark_fetch_latency_max_ms",
        "Maximum fetch latency since the last report",
        MetricType::Gauge,
        summary.fetch_latency_max_ms,
    );
}

fn write_upstream_metrics(output: &mut String, summary: &MetricsSummary) {
    write_metric(
        output,
        "smallspark_geocode_requests_total",
        "Geocode requests",
        MetricType::Counter,
        summary.geocode_requests,
    );
    write_metric(
        output,
        "smallspark_geocode_errors_total",
        "Geocode requests that failed upstream",
        MetricType::Counter,
        summary.geocode_errors,
    );
    write_metric(
        output,
        "smallspark_suggest_requests_total",
        "Suggestion requests",
        MetricType::Counter,
        summary.suggest_requests,
    );
}
