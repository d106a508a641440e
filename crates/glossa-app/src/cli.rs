//! CLI argument definitions for the Glossa application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Glossa — an incremental transcript dispatch engine for live speech analysis.
#[derive(Parser, Debug)]
#[command(name = "glossa", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Analysis service base URL.
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Seconds between dispatch ticks.
    #[arg(short = 'i', long = "interval")]
    pub interval: Option<u64>,

    /// Analysis mode: keywords or insights.
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<String>,

    /// Speech source: stdin or demo.
    #[arg(short = 's', long = "source", default_value = "stdin")]
    pub source: String,

    /// Use the built-in mock analysis service instead of HTTP.
    #[arg(long = "mock")]
    pub mock: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > GLOSSA_CONFIG env var > ~/.glossa/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("GLOSSA_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > GLOSSA_PORT env var > config file value > 3040.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("GLOSSA_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        3040
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    /// Returns `None` if not overridden.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".glossa").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".glossa").join("config.toml");
    }
    PathBuf::from("config.toml")
}
