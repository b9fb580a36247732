use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::{Result, WasteAdvisorError};
use crate::upload::DEFAULT_MAX_UPLOAD_BYTES;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_FALLBACK_MODELS: &[&str] = &["gemini-2.0-flash"];
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CONFIG_PATH: &str = "waste_advisor.toml";

/// Main configuration structure loaded from waste_advisor.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Settings for the hosted classifier
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model: String,
    /// Tried in order when the primary model is not available
    pub fallback_models: Vec<String>,
    pub api_base: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            fallback_models: DEFAULT_FALLBACK_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            api_base: DEFAULT_API_BASE.to_string(),
            temperature: 0.1,
            max_output_tokens: 1024,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub gemini_api_key: Option<String>,
    pub log_level: String,
    pub http_bind: SocketAddr,
    pub http_request_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            log_level: "waste_advisor=info,tower_http=info".to_string(),
            http_bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            http_request_timeout_ms: 90_000,
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration through `lookup` (normally `std::env::var`)
    pub fn load_from<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        cfg.gemini_api_key = lookup("GEMINI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        if let Some(level) = lookup("RUST_LOG") {
            cfg.log_level = level;
        }
        if let Some(v) = lookup("WASTE_HTTP_BIND") {
            match v.parse::<SocketAddr>() {
                Ok(bind) => cfg.http_bind = bind,
                Err(_) => tracing::warn!("Ignoring invalid WASTE_HTTP_BIND '{}'", v),
            }
        }
        if let Some(timeout) = lookup("WASTE_HTTP_REQUEST_TIMEOUT_MS").and_then(|v| v.parse().ok())
        {
            cfg.http_request_timeout_ms = timeout;
        }

        cfg
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses WASTE_ADVISOR_CONFIG environment variable or defaults to "waste_advisor.toml"
    pub fn load() -> Result<Self> {
        // 1) WASTE_ENV_FILE if set
        // 2) ./.env
        // 3) ../.env when the API key is still missing
        if let Ok(env_path) = std::env::var("WASTE_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
            if std::env::var("GEMINI_API_KEY").is_err() {
                let _ = dotenvy::from_path("../.env");
            }
        }

        let config_path = std::env::var("WASTE_ADVISOR_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Self::from_path(&config_path, |key| std::env::var(key).ok())
    }

    /// Load from a TOML file if it exists, otherwise start from defaults.
    pub fn from_path<F>(path: impl AsRef<std::path::Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(_) => {
                tracing::debug!("Config file {} not found, using defaults", path.display());
                None
            }
        };
        Self::from_sources(content.as_deref(), lookup)
    }

    /// Build configuration from optional TOML text and an environment lookup.
    pub fn from_sources<F>(toml_text: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = match toml_text {
            Some(text) => toml::from_str(text)?,
            None => Self::default(),
        };

        // env-first overrides
        if let Some(model) = lookup("GEMINI_MODEL").filter(|m| !m.trim().is_empty()) {
            config.classifier.model = model.trim().to_string();
            tracing::debug!("GEMINI_MODEL env override applied");
        }
        if let Some(list) = lookup("GEMINI_FALLBACK_MODELS") {
            config.classifier.fallback_models = list
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(base) = lookup("GEMINI_API_BASE") {
            config.classifier.api_base = base;
        }
        if let Some(timeout) = lookup("GEMINI_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            config.classifier.timeout_ms = timeout;
        }
        if let Some(max) = lookup("WASTE_MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
            config.upload.max_bytes = max;
        }

        config.runtime = RuntimeConfig::load_from(&lookup);
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        if self.classifier.model.trim().is_empty() {
            return Err(WasteAdvisorError::Config {
                message: "classifier.model must not be empty".to_string(),
            });
        }
        if self.upload.max_bytes == 0 {
            return Err(WasteAdvisorError::Config {
                message: "upload.max_bytes must be greater than 0".to_string(),
            });
        }
        if !self.classifier.api_base.starts_with("http://")
            && !self.classifier.api_base.starts_with("https://")
        {
            return Err(WasteAdvisorError::Config {
                message: format!(
                    "classifier.api_base '{}' must start with http:// or https://",
                    self.classifier.api_base
                ),
            });
        }

        if !(0.0..=2.0).contains(&self.classifier.temperature) {
            tracing::warn!(
                "temperature {} outside 0.0..=2.0, clamping",
                self.classifier.temperature
            );
            self.classifier.temperature = self.classifier.temperature.clamp(0.0, 2.0);
        }
        if self.classifier.max_output_tokens == 0 {
            self.classifier.max_output_tokens = 1024;
        }

        let worst_case_ms = self
            .classifier
            .timeout_ms
            .saturating_mul(self.model_chain().len() as u64);
        if worst_case_ms >= self.runtime.http_request_timeout_ms {
            tracing::warn!(
                "classifier timeout {}ms x {} models reaches the HTTP request timeout {}ms; \
                 slow classify requests will end as timeouts",
                self.classifier.timeout_ms,
                self.model_chain().len(),
                self.runtime.http_request_timeout_ms
            );
        }
        Ok(())
    }

    /// The API credential, required before a classifier can be built.
    pub fn api_key(&self) -> Result<&str> {
        self.runtime
            .gemini_api_key
            .as_deref()
            .ok_or_else(|| WasteAdvisorError::Config {
                message: "GEMINI_API_KEY not found in environment variables. \
                          Please set it in your .env file."
                    .to_string(),
            })
    }

    /// Primary model followed by fallbacks, without duplicates.
    pub fn model_chain(&self) -> Vec<String> {
        let mut chain = vec![self.classifier.model.clone()];
        for model in &self.classifier.fallback_models {
            if !chain.contains(model) {
                chain.push(model.clone());
            }
        }
        chain
    }
}
