//! Build `AppConfig` from the process environment
//!
//! * `CLOUDFLARE_*` – credentials and target record, all required
//! * `DDNS_*`       – runtime settings, all defaulted

use crate::error::ConfigError;
use config::{Config, Environment, Map};
use serde::{Deserialize, de::DeserializeOwned};
use std::{fmt, path::PathBuf, time::Duration};
use validator::Validate;

pub const DEFAULT_LOG_FILE: &str = "cloudflare-ddns.log";

/*──────── Cloudflare ────────*/
#[derive(Clone, Deserialize, Validate)]
pub struct CloudflareCfg {
    #[validate(length(min = 1))]
    pub api_token: String,
    #[validate(length(min = 1))]
    pub zone_id: String,
    /// fully-qualified name of the A record, e.g. `home.example.com`
    #[validate(length(min = 1))]
    pub record_name: String,
}

impl fmt::Debug for CloudflareCfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareCfg")
            .field("api_token", &"<redacted>")
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .finish()
    }
}

/*──────── Settings ────────*/
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    /// lookup services, tried in order
    #[serde(default = "default_ip_urls")]
    #[validate(length(min = 1))]
    pub ip_urls: Vec<String>,
    /// per-request HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
    /// append-only outcome log
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_api_root")]
    pub api_root: String,
    /// minimum seconds between two runs; `0` disables the run guard
    #[serde(default)]
    pub min_interval_secs: u64,
    #[serde(default = "default_stamp_file")]
    pub stamp_file: PathBuf,
}
fn default_ip_urls() -> Vec<String> {
    vec!["https://api.ipify.org".to_string()]
}
fn default_timeout() -> u64 {
    10
}
fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}
fn default_api_root() -> String {
    cfddns_provider_cloudflare::API_ROOT.to_string()
}
fn default_stamp_file() -> PathBuf {
    PathBuf::from(".last_run")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ip_urls: default_ip_urls(),
            timeout_secs: default_timeout(),
            log_file: default_log_file(),
            api_root: default_api_root(),
            min_interval_secs: 0,
            stamp_file: default_stamp_file(),
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/*──────── AppConfig ────────*/
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cloudflare: CloudflareCfg,
    pub settings: Settings,
}

/// Deserialize one prefixed slice of the environment.
fn read_env<T: DeserializeOwned>(
    prefix: &'static str,
    env: Environment,
) -> Result<T, ConfigError> {
    Config::builder()
        .add_source(env)
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|source| ConfigError::Load { prefix, source })
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(None)
}

/// Load only the `DDNS_*` settings from the process environment.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(None)
}

/// Load configuration from `vars` instead of the process environment when
/// given. Keys use the same names as the environment variables.
pub fn load_config_from(vars: Option<Map<String, String>>) -> Result<AppConfig, ConfigError> {
    let settings = load_settings_from(vars.clone())?;
    let cloudflare = load_cloudflare_from(vars)?;
    Ok(AppConfig {
        cloudflare,
        settings,
    })
}

/// Read only the `CLOUDFLARE_*` section.
pub fn load_cloudflare_from(
    vars: Option<Map<String, String>>,
) -> Result<CloudflareCfg, ConfigError> {
    let mut cloudflare: CloudflareCfg = read_env(
        "CLOUDFLARE",
        Environment::with_prefix("CLOUDFLARE").source(vars),
    )?;
    for v in [
        &mut cloudflare.api_token,
        &mut cloudflare.zone_id,
        &mut cloudflare.record_name,
    ] {
        *v = v.trim().to_owned();
    }
    cloudflare.validate()?;
    Ok(cloudflare)
}

/// Read only the `DDNS_*` section. Usable when the credentials are
/// missing, so the log file is known before they are checked.
pub fn load_settings_from(vars: Option<Map<String, String>>) -> Result<Settings, ConfigError> {
    let mut settings: Settings = read_env(
        "DDNS",
        Environment::with_prefix("DDNS")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("ip_urls")
            .source(vars),
    )?;
    settings.ip_urls = settings
        .ip_urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_owned)
        .collect();
    settings.validate()?;
    Ok(settings)
}
