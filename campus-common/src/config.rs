//! Configuration loading and resolution
//!
//! Each setting resolves through a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CAMPUS_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file must never abort startup; the service
//! logs a warning and continues with the remaining tiers.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

/// Default backend poll interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default rolling stale window in days for undated-semantics items
pub const DEFAULT_STALE_WINDOW_DAYS: i64 = 7;

/// Default bind address for the service HTTP surface
pub const DEFAULT_BIND: &str = "127.0.0.1:5810";

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Backend REST API base URL (e.g. "http://127.0.0.1:8000")
    pub api_base_url: String,
    /// Host:port the service HTTP surface binds to
    pub bind: String,
    /// Seconds between periodic feed refreshes
    pub poll_interval_secs: u64,
    /// Rolling window in days for items without expiry/exam semantics
    pub stale_window_days: i64,
    /// Bearer access token for backend requests
    pub access_token: Option<String>,
    /// Refresh token used for the 401 silent-refresh path
    pub refresh_token: Option<String>,
    /// Backend user id of the viewer this instance aggregates for
    pub viewer_id: Option<i64>,
    /// Viewer role name ("instructor", "student", "admin", ...)
    pub viewer_role: String,
}

/// Optional overrides from the command line (filled by the binary's clap args)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_base_url: Option<String>,
    pub bind: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub config_file: Option<PathBuf>,
}

/// TOML config file schema (all fields optional)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub api_base_url: Option<String>,
    pub bind: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub stale_window_days: Option<i64>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub viewer_id: Option<i64>,
    pub viewer_role: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML config file. Errors here are reported to the caller,
    /// which downgrades them to a warning (missing config is not fatal).
    pub fn load(path: &PathBuf) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

impl NotifyConfig {
    /// Resolve the full configuration through the 4-tier priority order.
    pub fn resolve(cli: CliOverrides) -> NotifyConfig {
        let file = cli
            .config_file
            .clone()
            .or_else(default_config_path)
            .and_then(|path| {
                if !path.exists() {
                    return None;
                }
                match TomlConfig::load(&path) {
                    Ok(cfg) => Some(cfg),
                    Err(e) => {
                        warn!("Ignoring unreadable config file: {}", e);
                        None
                    }
                }
            })
            .unwrap_or_default();

        NotifyConfig {
            api_base_url: cli
                .api_base_url
                .or_else(|| env_var("CAMPUS_API_URL"))
                .or(file.api_base_url)
                .unwrap_or_else(|| "http://127.0.0.1:8000".to_string()),
            bind: cli
                .bind
                .or_else(|| env_var("CAMPUS_BIND"))
                .or(file.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            poll_interval_secs: cli
                .poll_interval_secs
                .or_else(|| env_var("CAMPUS_POLL_SECS").and_then(|v| v.parse().ok()))
                .or(file.poll_interval_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            stale_window_days: env_var("CAMPUS_STALE_DAYS")
                .and_then(|v| v.parse().ok())
                .or(file.stale_window_days)
                .unwrap_or(DEFAULT_STALE_WINDOW_DAYS),
            access_token: env_var("CAMPUS_ACCESS_TOKEN").or(file.access_token),
            refresh_token: env_var("CAMPUS_REFRESH_TOKEN").or(file.refresh_token),
            viewer_id: env_var("CAMPUS_VIEWER_ID")
                .and_then(|v| v.parse().ok())
                .or(file.viewer_id),
            viewer_role: env_var("CAMPUS_VIEWER_ROLE")
                .or(file.viewer_role)
                .unwrap_or_else(|| "student".to_string()),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Default configuration file path for the platform
///
/// Linux checks the user config dir first, then /etc/campus/notify.toml.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("campus").join("notify.toml"));

    if cfg!(target_os = "linux") {
        if let Some(ref path) = user_config {
            if path.exists() {
                return user_config;
            }
        }
        let system_config = PathBuf::from("/etc/campus/notify.toml");
        if system_config.exists() {
            return Some(system_config);
        }
        return user_config;
    }

    user_config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_config_all_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notify.toml");
        std::fs::write(
            &path,
            r#"
api_base_url = "http://backend:9000"
bind = "0.0.0.0:6000"
poll_interval_secs = 30
stale_window_days = 14
access_token = "abc"
"#,
        )
        .expect("write config");

        let cfg = TomlConfig::load(&path).expect("load");
        assert_eq!(cfg.api_base_url.as_deref(), Some("http://backend:9000"));
        assert_eq!(cfg.bind.as_deref(), Some("0.0.0.0:6000"));
        assert_eq!(cfg.poll_interval_secs, Some(30));
        assert_eq!(cfg.stale_window_days, Some(14));
        assert_eq!(cfg.access_token.as_deref(), Some("abc"));
        assert_eq!(cfg.refresh_token, None);
    }

    #[test]
    fn test_toml_config_invalid_is_error_not_panic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notify.toml");
        std::fs::write(&path, "this is { not toml").expect("write config");

        assert!(TomlConfig::load(&path).is_err());
    }
}
