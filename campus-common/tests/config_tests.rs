//! Unit tests for configuration resolution and graceful degradation
//!
//! Verifies the 4-tier priority order (CLI > env > TOML > compiled default)
//! and that missing or broken config files never prevent startup.
//!
//! Note: Uses serial_test to prevent ENV variable race conditions. Tests that
//! manipulate CAMPUS_* variables are marked with #[serial] so they run
//! sequentially, not in parallel.

use campus_common::config::{
    CliOverrides, NotifyConfig, DEFAULT_BIND, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_STALE_WINDOW_DAYS,
};
use serial_test::serial;
use std::env;

fn clear_campus_env() {
    for var in [
        "CAMPUS_API_URL",
        "CAMPUS_BIND",
        "CAMPUS_POLL_SECS",
        "CAMPUS_STALE_DAYS",
        "CAMPUS_ACCESS_TOKEN",
        "CAMPUS_REFRESH_TOKEN",
        "CAMPUS_VIEWER_ID",
        "CAMPUS_VIEWER_ROLE",
    ] {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_resolve_with_no_overrides_uses_defaults() {
    clear_campus_env();

    // Point the config file at a path that does not exist
    let cli = CliOverrides {
        config_file: Some(std::path::PathBuf::from("/nonexistent/notify.toml")),
        ..Default::default()
    };
    let cfg = NotifyConfig::resolve(cli);

    assert_eq!(cfg.bind, DEFAULT_BIND);
    assert_eq!(cfg.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
    assert_eq!(cfg.stale_window_days, DEFAULT_STALE_WINDOW_DAYS);
    assert_eq!(cfg.viewer_role, "student");
    assert!(cfg.access_token.is_none());
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_campus_env();

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notify.toml");
    std::fs::write(
        &path,
        r#"
api_base_url = "http://from-toml:8000"
poll_interval_secs = 120
viewer_role = "instructor"
"#,
    )
    .expect("write config");

    env::set_var("CAMPUS_API_URL", "http://from-env:8000");

    let cli = CliOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    let cfg = NotifyConfig::resolve(cli);

    // env wins over TOML for the overridden field
    assert_eq!(cfg.api_base_url, "http://from-env:8000");
    // TOML still supplies the rest
    assert_eq!(cfg.poll_interval_secs, 120);
    assert_eq!(cfg.viewer_role, "instructor");

    env::remove_var("CAMPUS_API_URL");
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_campus_env();
    env::set_var("CAMPUS_BIND", "0.0.0.0:7000");

    let cli = CliOverrides {
        bind: Some("127.0.0.1:7100".to_string()),
        config_file: Some(std::path::PathBuf::from("/nonexistent/notify.toml")),
        ..Default::default()
    };
    let cfg = NotifyConfig::resolve(cli);

    assert_eq!(cfg.bind, "127.0.0.1:7100");

    env::remove_var("CAMPUS_BIND");
}

#[test]
#[serial]
fn test_broken_toml_degrades_to_defaults() {
    clear_campus_env();

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notify.toml");
    std::fs::write(&path, "api_base_url = [ broken").expect("write config");

    let cli = CliOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    // Must not panic; falls through to defaults
    let cfg = NotifyConfig::resolve(cli);
    assert_eq!(cfg.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
}

#[test]
#[serial]
fn test_viewer_identity_from_env() {
    clear_campus_env();
    env::set_var("CAMPUS_VIEWER_ID", "42");
    env::set_var("CAMPUS_VIEWER_ROLE", "instructor");

    let cli = CliOverrides {
        config_file: Some(std::path::PathBuf::from("/nonexistent/notify.toml")),
        ..Default::default()
    };
    let cfg = NotifyConfig::resolve(cli);

    assert_eq!(cfg.viewer_id, Some(42));
    assert_eq!(cfg.viewer_role, "instructor");

    clear_campus_env();
}
