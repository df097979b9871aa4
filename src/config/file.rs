//! TOML configuration file loading
//!
//! Supports `~/.config/playcoach/config.toml` as a persistent config source.
//! All fields are optional and the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct GatewayConfigFile {
    /// Gemini model configuration
    #[serde(default)]
    pub gemini: GeminiFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Analysis persistence configuration
    #[serde(default)]
    pub analysis: AnalysisFileConfig,
}

/// Gemini-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct GeminiFileConfig {
    /// API key (env `GEMINI_API_KEY` takes precedence)
    pub api_key: Option<String>,

    /// Model identifier (e.g. "gemini-1.5-pro")
    pub model: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_seconds: Option<u64>,

    /// Max retries for transient failures
    pub max_retries: Option<u32>,

    /// Base retry delay in milliseconds
    pub retry_delay_ms: Option<u64>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Data directory for the SQLite database
    pub data_dir: Option<String>,

    /// Google Cloud project id (defaults to the service account's project)
    pub project_id: Option<String>,
}

/// Analysis persistence configuration
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisFileConfig {
    /// Hours before a stored analysis expires
    pub ttl_hours: Option<i64>,

    /// Max non-expired analyses retained per user
    pub retention_limit: Option<usize>,
}

/// Load the TOML config file from the standard path
///
/// Returns `GatewayConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> GatewayConfigFile {
    let Some(path) = config_file_path() else {
        return GatewayConfigFile::default();
    };

    if !path.exists() {
        return GatewayConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                GatewayConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            GatewayConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/playcoach/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("playcoach").join("config.toml"))
}
