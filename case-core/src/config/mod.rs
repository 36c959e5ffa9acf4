use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    /// Base URL every resource path is joined onto (e.g. https://gst.example.org/api/).
    pub base_url: String,
    /// Path of the token refresh endpoint, relative to `base_url`.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
}

fn default_refresh_path() -> String {
    "token/refresh/".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    /// File holding the persisted session, relative to the working directory.
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
    /// Keep the session in process memory only. Nothing survives the process.
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            path: default_session_path(),
            in_memory: false,
        }
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".case-desk").join("session.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP collector endpoint (e.g. http://tempo:4317). Spans are not exported when unset.
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_service_name() -> String {
    "case-desk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load settings from `config/base.yaml` (optional) overlaid with `APP_*` environment variables.
///
/// Nested keys use a double underscore, so `APP_API__BASE_URL` sets `api.base_url`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    dotenvy::dotenv().ok();

    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;

    let settings = config::Config::builder()
        .add_source(
            config::File::from(base_path.join("config").join("base.yaml")).required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
