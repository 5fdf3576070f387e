use folio_core::config::{DEFAULT_BACKEND_URL, FolioConfig};
use folio_infrastructure::config_service::{ENV_BACKEND_URL, ENV_SESSION_TOKEN, apply_env_overrides};
use folio_infrastructure::ConfigService;
use std::collections::HashMap;
use tempfile::TempDir;

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let service = ConfigService::with_path(temp_dir.path().join("config.toml"));

    let config = service.load(no_env).expect("Should fall back to defaults");
    assert_eq!(config, FolioConfig::default());
}

#[test]
fn test_file_values_are_read() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
[backend]
base_url = "https://folio.example.com"
timeout_secs = 15
cookie = "session=abc"

[reveal]
min_delay_ms = 0
max_delay_ms = 5

[preview]
output_path = "/tmp/folio/preview.html"
"#,
    )
    .unwrap();

    let config = ConfigService::with_path(&config_path).load(no_env).unwrap();
    assert_eq!(config.backend.base_url, "https://folio.example.com");
    assert_eq!(config.backend.timeout_secs, 15);
    assert_eq!(config.backend.cookie.as_deref(), Some("session=abc"));
    assert_eq!(config.reveal.max_delay_ms, 5);
    assert_eq!(
        config.preview.output_path.as_deref(),
        Some(std::path::Path::new("/tmp/folio/preview.html"))
    );
}

#[test]
fn test_invalid_file_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[reveal]\nmin_delay_ms = 100\nmax_delay_ms = 10\n").unwrap();

    let err = ConfigService::with_path(&config_path).load(no_env).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_env_overrides_win_over_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[backend]\nbase_url = \"http://file:5000\"\n").unwrap();

    let env: HashMap<&str, &str> = HashMap::from([
        (ENV_BACKEND_URL, "http://override:8080"),
        (ENV_SESSION_TOKEN, "token-123"),
    ]);
    let config = ConfigService::with_path(&config_path)
        .load(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.backend.base_url, "http://override:8080");
    assert_eq!(config.backend.session_token.as_deref(), Some("token-123"));
}

#[test]
fn test_blank_env_values_are_ignored() {
    let mut config = FolioConfig::default();
    apply_env_overrides(&mut config, |_| Some("   ".to_string()));
    assert_eq!(config.backend.base_url, DEFAULT_BACKEND_URL);
    assert_eq!(config.backend.session_token, None);
}
