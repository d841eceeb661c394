//! Runtime settings loading from file and environment variables.
//!
//! These are the embed runtime's own knobs. The widget configuration
//! document is fetched separately, per widget.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Top-level runtime settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub loader: LoaderSettings,

    #[serde(default)]
    pub runtime: RuntimeSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,

    #[serde(default)]
    pub consent: ConsentSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where the bootstrapper finds its dependencies.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Service origin used when the page is a local file or on localhost.
    pub dev_origin: String,
    pub comms_script_path: String,
    pub main_script_path: String,
    /// Pinned module URL of the voice SDK.
    pub sdk_module_url: String,
    /// Widget ids with this prefix load their configuration from the demo
    /// endpoint.
    pub demo_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Upper bound on waiting for the voice SDK to become ready.
    pub sdk_ready_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
    /// Operation budget for site-owner code. `0` removes the limit.
    pub hook_max_operations: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub timeout_ms: u64,
}

/// Where consent answers persist. Without a path they last for the process.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConsentSettings {
    pub store_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (e.g., "info", "vox_embed=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            dev_origin: "http://localhost:3000".to_string(),
            comms_script_path: "/js/widget-comms.js".to_string(),
            main_script_path: "/js/widget.js".to_string(),
            sdk_module_url: "https://cdn.jsdelivr.net/npm/@vapi-ai/web@2.3.8/+esm".to_string(),
            demo_prefix: "demo-".to_string(),
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            sdk_ready_timeout_ms: 5_000,
            fetch_timeout_ms: 10_000,
            hook_max_operations: 1_000_000,
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 3_000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl RuntimeSettings {
    pub fn sdk_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.sdk_ready_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl TelemetrySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the settings file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the settings file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads settings from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VOX_EMBED_DEV_ORIGIN` overrides `loader.dev_origin`
/// - `VOX_EMBED_SDK_URL` overrides `loader.sdk_module_url`
/// - `VOX_EMBED_SDK_TIMEOUT_MS` overrides `runtime.sdk_ready_timeout_ms`
/// - `VOX_EMBED_TELEMETRY` overrides `telemetry.enabled` ("true" or "1")
/// - `VOX_EMBED_CONSENT_STORE` overrides `consent.store_path`
/// - `VOX_EMBED_LOG_LEVEL` overrides `logging.level`
/// - `VOX_EMBED_LOG_JSON` overrides `logging.json` ("true" or "1")
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Settings, ConfigError> {
    let mut settings = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Settings::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Settings::default(),
    };
    apply_env(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(origin) = var("VOX_EMBED_DEV_ORIGIN") {
        settings.loader.dev_origin = origin;
    }
    if let Some(url) = var("VOX_EMBED_SDK_URL") {
        settings.loader.sdk_module_url = url;
    }
    if let Some(timeout) = var("VOX_EMBED_SDK_TIMEOUT_MS") {
        if let Ok(parsed) = timeout.parse() {
            settings.runtime.sdk_ready_timeout_ms = parsed;
        }
    }
    if let Some(enabled) = var("VOX_EMBED_TELEMETRY") {
        settings.telemetry.enabled = is_truthy(&enabled);
    }
    if let Some(path) = var("VOX_EMBED_CONSENT_STORE").filter(|p| !p.trim().is_empty()) {
        settings.consent.store_path = Some(PathBuf::from(path));
    }
    if let Some(level) = var("VOX_EMBED_LOG_LEVEL") {
        settings.logging.level = level;
    }
    if let Some(json) = var("VOX_EMBED_LOG_JSON") {
        settings.logging.json = is_truthy(&json);
    }
}

fn is_truthy(value: &str) -> bool {
    value == "true" || value == "1"
}
