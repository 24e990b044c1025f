//! Configuration loading tests
//!
//! These touch process environment variables, so they run serially.

use std::env;
use std::fs;

use serial_test::serial;

use official_id::config::{RateLimitBackend, Settings};

const VARS: &[&str] = &[
    "OFFICIAL_ID_SERVER__PORT",
    "OFFICIAL_ID_SERVER__CORS_ORIGINS",
    "OFFICIAL_ID_AUTH__JWT_SECRET",
    "OFFICIAL_ID_WORKFLOW__APPROVAL_CONCURRENCY",
    "OFFICIAL_ID_RATE_LIMIT__BACKEND",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_file_or_env() {
    clear_env();
    let settings = Settings::load("does-not-exist").unwrap();

    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.i18n.default_language, "id");
    assert_eq!(settings.workflow.approval_concurrency, 1);
    assert_eq!(settings.workflow.ticket_insert_attempts, 5);
    assert_eq!(settings.rate_limit.backend, RateLimitBackend::Memory);
    assert!(!settings.email.enabled);

    // Shipping without a signing secret is refused
    assert!(settings.validate().is_err());
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear_env();
    env::set_var("OFFICIAL_ID_SERVER__PORT", "9090");
    env::set_var("OFFICIAL_ID_SERVER__CORS_ORIGINS", "https://official.id,https://admin.official.id");
    env::set_var("OFFICIAL_ID_AUTH__JWT_SECRET", "from-env");
    env::set_var("OFFICIAL_ID_WORKFLOW__APPROVAL_CONCURRENCY", "4");
    env::set_var("OFFICIAL_ID_RATE_LIMIT__BACKEND", "redis");

    let settings = Settings::load("does-not-exist").unwrap();
    clear_env();

    assert_eq!(settings.server.port, 9090);
    assert_eq!(settings.server.cors_origins, ["https://official.id", "https://admin.official.id"]);
    assert_eq!(settings.auth.jwt_secret, "from-env");
    assert_eq!(settings.workflow.approval_concurrency, 4);
    assert_eq!(settings.rate_limit.backend, RateLimitBackend::Redis);
    assert!(settings.validate().is_ok());
}

#[test]
#[serial]
fn test_file_then_environment() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("official-id.toml");
    fs::write(
        &file,
        r#"
[server]
port = 7000

[auth]
jwt_secret = "from-file"

[site]
base_url = "https://events.example.com/base"
"#,
    )
    .unwrap();

    env::set_var("OFFICIAL_ID_SERVER__PORT", "7001");
    let settings = Settings::load(dir.path().join("official-id").to_str().unwrap()).unwrap();
    clear_env();

    assert_eq!(settings.server.port, 7001);
    assert_eq!(settings.auth.jwt_secret, "from-file");
    assert_eq!(settings.site.base_url, "https://events.example.com/base");
    assert_eq!(settings.server.host, "0.0.0.0");
}
