use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{GlossaError, Result};
use crate::types::AnalysisMode;

/// Top-level configuration for the Glossa client.
///
/// Loaded from `~/.glossa/config.toml` by default. Each section corresponds
/// to one subsystem; the configuration surface is deliberately small — the
/// analysis base URL and the flush interval are the two knobs that matter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlossaConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl GlossaConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GlossaConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| GlossaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// API server port.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            port: 3040,
        }
    }
}

/// Speech source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Spoken language the recognition provider is configured for.
    pub language: String,
    /// Whether the provider should report interim (provisional) results.
    pub interim_results: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            interim_results: true,
        }
    }
}

/// Dispatch scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Seconds between flush ticks.
    pub interval_secs: u64,
    /// Which analysis drives the periodic flow for the session.
    pub mode: AnalysisMode,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: 7,
            mode: AnalysisMode::Keywords,
        }
    }
}

/// Remote analysis service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Base URL of the analysis service.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 30,
        }
    }
}
