//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. Default: config/dev.toml
//!
//! Every section is optional; a missing file or section falls back to
//! the built-in defaults so the service always starts.

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassConfig {
    /// Mirror endpoints, tried in order until one answers.
    #[serde(default = "default_mirrors")]
    pub mirrors: Vec<String>,
    #[serde(default = "default_overpass_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on elements per area query.
    #[serde(default = "default_element_limit")]
    pub element_limit: u32,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            mirrors: default_mirrors(),
            timeout_secs: default_overpass_timeout_secs(),
            element_limit: default_element_limit(),
        }
    }
}

fn default_mirrors() -> Vec<String> {
    vec![
        "https://overpass-api.de/api/interpreter".to_string(),
        "https://overpass.kumi.systems/api/interpreter".to_string(),
    ]
}

fn default_overpass_timeout_secs() -> u64 {
    35
}

fn default_element_limit() -> u32 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeConfig {
    #[serde(default = "default_geocode_base_url")]
    pub base_url: String,
    /// Nominatim requires an identifying User-Agent.
    #[serde(default = "default_geocode_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_geocode_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocode_base_url(),
            user_agent: default_geocode_user_agent(),
            timeout_secs: default_geocode_timeout_secs(),
        }
    }
}

fn default_geocode_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_geocode_user_agent() -> String {
    "SmallSpark/1.0".to_string()
}

fn default_geocode_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Seconds a cached area stays valid.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_radius_m")]
    pub default_radius_m: u32,
    /// Requests asking for more are clamped down, not rejected.
    #[serde(default = "default_max_radius_m")]
    pub max_radius_m: u32,
    #[serde(default = "default_per_page")]
    pub default_per_page: usize,
    #[serde(default = "default_max_per_page")]
    pub max_per_page: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_m: default_radius_m(),
            max_radius_m: default_max_radius_m(),
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
        }
    }
}

fn default_radius_m() -> u32 {
    5000
}

fn default_max_radius_m() -> u32 {
    15000
}

fn default_per_page() -> usize {
    15
}

fn default_max_per_page() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_metrics_interval_secs(),
        }
    }
}

fn default_metrics_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CatalogConfig {
    /// Path to a catalog override; the embedded catalog is used when
    /// unset.
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub overpass: OverpassConfig,
    #[serde(default)]
    pub geocode: GeocodeConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    server_bind_address: String,
    server_port: u16,
    overpass_mirrors: Vec<String>,
    overpass_timeout_secs: u64,
    overpass_element_limit: u32,
    geocode_base_url: String,
    geocode_user_agent: String,
    geocode_timeout_secs: u64,
    cache_ttl_secs: u64,
    default_radius_m: u32,
    max_radius_m: u32,
    default_per_page: usize,
    max_per_page: usize,
    metrics_interval_secs: u64,
    catalog_file: Option<String>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_bind_address: default_bind_address(),
            server_port: default_port(),
            overpass_mirrors: default_mirrors(),
            overpass_timeout_secs: default_overpass_timeout_secs(),
            overpass_element_limit: default_element_limit(),
            geocode_base_url: default_geocode_base_url(),
            geocode_user_agent: default_geocode_user_agent(),
            geocode_timeout_secs: default_geocode_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            default_radius_m: default_radius_m(),
            max_radius_m: default_max_radius_m(),
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            metrics_interval_secs: default_metrics_interval_secs(),
            catalog_file: None,
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from the CLI argument or environment
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        if let Some(path) = cli_path {
            return path.to_string();
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        // Default to dev.toml
        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            server_bind_address: toml_config.server.bind_address,
            server_port: toml_config.server.port,
            overpass_mirrors: toml_config.overpass.mirrors,
            overpass_timeout_secs: toml_config.overpass.timeout_secs,
            overpass_element_limit: toml_config.overpass.element_limit,
            geocode_base_url: toml_config.geocode.base_url,
            geocode_user_agent: toml_config.geocode.user_agent,
            geocode_timeout_secs: toml_config.geocode.timeout_secs,
            cache_ttl_secs: toml_config.cache.ttl_secs,
            default_radius_m: toml_config.search.default_radius_m,
            max_radius_m: toml_config.search.max_radius_m,
            default_per_page: toml_config.search.default_per_page,
            max_per_page: toml_config.search.max_per_page,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            catalog_file: toml_config.catalog.file,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to
    /// defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn server_bind_address(&self) -> &str {
        &self.server_bind_address
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn overpass_mirrors(&self) -> &[String] {
        &self.overpass_mirrors
    }

    pub fn overpass_timeout_secs(&self) -> u64 {
        self.overpass_timeout_secs
    }

    pub fn overpass_element_limit(&self) -> u32 {
        self.overpass_element_limit
    }

    pub fn geocode_base_url(&self) -> &str {
        &self.geocode_base_url
    }

    pub fn geocode_user_agent(&self) -> &str {
        &self.geocode_user_agent
    }

    pub fn geocode_timeout_secs(&self) -> u64 {
        self.geocode_timeout_secs
    }

    pub fn cache_ttl_secs(&self) -> u64 {
        self.cache_ttl_secs
    }

    pub fn default_radius_m(&self) -> u32 {
        self.default_radius_m
    }

    pub fn max_radius_m(&self) -> u32 {
        self.max_radius_m
    }

    pub fn default_per_page(&self) -> usize {
        self.default_per_page
    }

    pub fn max_per_page(&self) -> usize {
        self.max_per_page
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn catalog_file(&self) -> Option<&str> {
        self.catalog_file.as_deref()
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}
