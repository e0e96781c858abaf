//! Integration tests for configuration loading

use smallspark::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[server]
bind_address = "127.0.0.1"
port = 8080

[overpass]
mirrors = ["https://overpass.test/api/interpreter"]
timeout_secs = 20
element_limit = 500

[geocode]
base_url = "https://nominatim.test"
user_agent = "smallspark-test/0.1"
timeout_secs = 5

[cache]
ttl_secs = 120

[search]
default_radius_m = 3000
max_radius_m = 10000
default_per_page = 10
max_per_page = 50

[metrics]
interval_secs = 15

[catalog]
file = "data/override.toml"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.server_bind_address(), "127.0.0.1");
    assert_eq!(config.server_port(), 8080);
    assert_eq!(config.overpass_mirrors(), ["https://overpass.test/api/interpreter"]);
    assert_eq!(config.overpass_timeout_secs(), 20);
    assert_eq!(config.overpass_element_limit(), 500);
    assert_eq!(config.geocode_base_url(), "https://nominatim.test");
    assert_eq!(config.geocode_user_agent(), "smallspark-test/0.1");
    assert_eq!(config.cache_ttl_secs(), 120);
    assert_eq!(config.default_radius_m(), 3000);
    assert_eq!(config.max_radius_m(), 10000);
    assert_eq!(config.default_per_page(), 10);
    assert_eq!(config.max_per_page(), 50);
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.catalog_file(), Some("data/override.toml"));
}

#[test]
fn test_partial_config_uses_section_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();

    temp_file
        .write_all(b"[cache]\nttl_secs = 60\n")
        .unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.cache_ttl_secs(), 60);
    assert_eq!(config.server_port(), 5000);
    assert_eq!(config.overpass_mirrors().len(), 2);
    assert_eq!(config.default_radius_m(), 5000);
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.server_bind_address(), "0.0.0.0");
    assert_eq!(config.server_port(), 5000);
    assert_eq!(config.cache_ttl_secs(), 600);
}
