//! Immutable configuration record consumed by the pipeline.
//!
//! `Settings` is loaded once, from a YAML file, before the Manager is constructed.
//! Nothing downstream mutates it; it is handed around as `Arc<Settings>`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::errors::{PipelineError, Result};

/// Worker-pool sizes for each of the three stages.
#[derive(Debug, Clone, Deserialize)]
pub struct Concurrency {
    pub observers: usize,
    pub adapters: usize,
    pub exporters: usize,
}

/// Global HTTP defaults; per-observation config overlays this shallowly.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpDefaults {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub auth_username: Option<String>,
    #[serde(default)]
    pub auth_password: Option<String>,
    #[serde(default = "default_true")]
    pub validate_cert: bool,
}

fn default_method() -> String {
    "GET".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_true() -> bool {
    true
}

impl Default for HttpDefaults {
    fn default() -> Self {
        Self {
            method: default_method(),
            body: None,
            headers: HashMap::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: None,
            auth_username: None,
            auth_password: None,
            validate_cert: true,
        }
    }
}

/// Per-observation HTTP overrides. Every field is optional; `None` means
/// "inherit from `HttpDefaults`", realizing the shallow key-by-key overlay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpOverride {
    pub method: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
    pub validate_cert: Option<bool>,
}

impl HttpDefaults {
    /// Observation-specific config wins key-by-key; unset keys fall back to defaults.
    pub fn overlay(&self, over: &HttpOverride) -> HttpDefaults {
        let mut merged_headers = self.headers.clone();
        merged_headers.extend(over.headers.clone());
        HttpDefaults {
            method: over.method.clone().unwrap_or_else(|| self.method.clone()),
            body: over.body.clone().or_else(|| self.body.clone()),
            headers: merged_headers,
            connect_timeout_ms: over.connect_timeout_ms.unwrap_or(self.connect_timeout_ms),
            request_timeout_ms: over.request_timeout_ms.unwrap_or(self.request_timeout_ms),
            user_agent: over.user_agent.clone().or_else(|| self.user_agent.clone()),
            auth_username: over
                .auth_username
                .clone()
                .or_else(|| self.auth_username.clone()),
            auth_password: over
                .auth_password
                .clone()
                .or_else(|| self.auth_password.clone()),
            validate_cert: over.validate_cert.unwrap_or(self.validate_cert),
        }
    }
}

/// Renderer endpoint defaults, only needed when a `RenderedHttpObservation`
/// source is declared.
#[derive(Debug, Clone, Deserialize)]
pub struct RendererDefaults {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub render: String,
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
}

/// Observation-wide knobs: inter-fetch delay, HTTP defaults, renderer defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationConfiguration {
    #[serde(default)]
    pub delay: f64,
    #[serde(default)]
    pub http: HttpDefaults,
    #[serde(default)]
    pub renderer: Option<RendererDefaults>,
}

/// The full immutable settings bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub concurrency: Concurrency,
    pub observation: ObservationConfiguration,
}

impl Settings {
    /// Parse settings from a YAML string and validate the invariants that
    /// must be caught before any worker is spawned.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and parse settings from a file path already resolved by the
    /// caller. Locating *which* file to load is an external collaborator's
    /// job; parsing an already-located file, including resolving any
    /// `${VAR}` environment references it contains, is owned here.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let raw = crate::utils::template::substitute_env_vars(&raw)?;
        Self::from_yaml_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency.observers == 0
            || self.concurrency.adapters == 0
            || self.concurrency.exporters == 0
        {
            return Err(PipelineError::ConfigError(
                "concurrency.observers, .adapters and .exporters must all be > 0".to_string(),
            ));
        }
        if self.observation.delay < 0.0 {
            return Err(PipelineError::ConfigError(
                "observation.delay must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}
