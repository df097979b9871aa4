//! Gateway configuration
//!
//! Values are resolved env > toml file > default. The two credentials
//! (`GEMINI_API_KEY` and `FIREBASE_CREDENTIALS_BASE64`) are required at
//! runtime; [`Config::load_lenient`] substitutes documented dummy values so
//! that configuration can be inspected on machines without secrets.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::credentials::ServiceAccountKey;
use crate::{Error, Result};

/// Default Gemini model when none is configured
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

/// Dummy API key used by lenient loading
pub const DUMMY_API_KEY: &str = "dummy-key-for-build";

// Base64 of a syntactically valid service account with placeholder values.
const DUMMY_CREDENTIALS_JSON: &str = r#"{"type":"service_account","project_id":"dummy-project","client_email":"dummy@dummy-project.iam.gserviceaccount.com","private_key":"","token_uri":"https://oauth2.googleapis.com/token"}"#;

/// Runtime configuration for the gateway
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key
    pub gemini_api_key: String,

    /// Gemini model identifier
    pub gemini_model: String,

    /// Per-request timeout for Gemini calls
    pub genai_timeout: Duration,

    /// Max retries for transient Gemini failures
    pub genai_max_retries: u32,

    /// Base delay between Gemini retries
    pub genai_retry_delay: Duration,

    /// Base64-encoded service account JSON
    pub credentials_base64: String,

    /// Google Cloud / Firebase project id
    pub project_id: String,

    /// API server port
    pub port: u16,

    /// Directory holding the SQLite database
    pub data_dir: PathBuf,

    /// Hours before a stored analysis expires
    pub ttl_hours: i64,

    /// Max non-expired analyses retained per user
    pub retention_limit: usize,
}

impl Config {
    /// Load configuration, failing when required credentials are absent
    ///
    /// # Errors
    ///
    /// Returns error if `GEMINI_API_KEY` or `FIREBASE_CREDENTIALS_BASE64` is
    /// missing, or if the credential blob cannot be decoded.
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .or(fc.gemini.api_key.clone())
            .ok_or_else(|| Error::Config("GEMINI_API_KEY is not set".to_string()))?;

        let credentials_base64 = std::env::var("FIREBASE_CREDENTIALS_BASE64")
            .map_err(|_| Error::Config("FIREBASE_CREDENTIALS_BASE64 is not set".to_string()))?;

        Self::build(fc, gemini_api_key, credentials_base64)
    }

    /// Load configuration with dummy substitutes for missing credentials
    ///
    /// Used by the `check` subcommand so configuration can be inspected
    /// without real secrets. The server never starts from this path.
    ///
    /// # Errors
    ///
    /// Returns error only if a provided credential blob cannot be decoded.
    pub fn load_lenient() -> Result<Self> {
        let fc = file::load_config_file();

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .or(fc.gemini.api_key.clone())
            .unwrap_or_else(|| DUMMY_API_KEY.to_string());

        let credentials_base64 = std::env::var("FIREBASE_CREDENTIALS_BASE64").unwrap_or_else(
            |_| {
                use base64::Engine as _;
                base64::engine::general_purpose::STANDARD.encode(DUMMY_CREDENTIALS_JSON)
            },
        );

        Self::build(fc, gemini_api_key, credentials_base64)
    }

    /// Whether this configuration carries real credentials
    #[must_use]
    pub fn has_real_credentials(&self) -> bool {
        self.gemini_api_key != DUMMY_API_KEY && self.project_id != "dummy-project"
    }

    fn build(
        fc: file::GatewayConfigFile,
        gemini_api_key: String,
        credentials_base64: String,
    ) -> Result<Self> {
        // Project id falls back to the service account's own project
        let key = ServiceAccountKey::from_base64(&credentials_base64)?;
        let project_id = std::env::var("PROJECT_ID")
            .ok()
            .or(fc.server.project_id)
            .unwrap_or_else(|| key.project_id.clone());

        let gemini_model = std::env::var("GEMINI_MODEL")
            .ok()
            .or(fc.gemini.model)
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let genai_timeout = std::env::var("GENAI_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(fc.gemini.timeout_seconds)
            .map_or(Duration::from_secs(20), Duration::from_secs);

        let genai_max_retries = std::env::var("GENAI_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(fc.gemini.max_retries)
            .unwrap_or(3);

        let genai_retry_delay = std::env::var("GENAI_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(fc.gemini.retry_delay_ms)
            .map_or(Duration::from_millis(500), Duration::from_millis);

        let port = std::env::var("PLAYCOACH_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .and_then(|v| v.parse().ok())
            .or(fc.server.port)
            .unwrap_or(8790);

        let data_dir = std::env::var("PLAYCOACH_DATA_DIR")
            .ok()
            .or(fc.server.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        let ttl_hours = std::env::var("ANALYSIS_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(fc.analysis.ttl_hours)
            .unwrap_or(24);

        let retention_limit = std::env::var("ANALYSIS_RETENTION_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(fc.analysis.retention_limit)
            .unwrap_or(10);

        Ok(Self {
            gemini_api_key,
            gemini_model,
            genai_timeout,
            genai_max_retries,
            genai_retry_delay,
            credentials_base64,
            project_id,
            port,
            data_dir,
            ttl_hours,
            retention_limit,
        })
    }
}

/// Default data directory: `~/.local/share/playcoach/`
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".playcoach"),
        |d| d.data_dir().join("playcoach"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_credentials_decode() {
        use base64::Engine as _;
        let blob = base64::engine::general_purpose::STANDARD.encode(DUMMY_CREDENTIALS_JSON);
        let key = ServiceAccountKey::from_base64(&blob).unwrap();
        assert_eq!(key.project_id, "dummy-project");
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
    }
}
