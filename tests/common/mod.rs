//! Shared test helpers

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use playcoach_gateway::api::ApiState;
use playcoach_gateway::db::{self, AnalysisRepo, DbPool};
use playcoach_gateway::{
    CoachingAnalyzer, Config, CredentialProvider, SpeechToText, TextToSpeech, TokenVerifier,
};

const TEST_CREDENTIALS_JSON: &str = r#"{"type":"service_account","project_id":"test-project","client_email":"test@test-project.iam.gserviceaccount.com","private_key":"","token_uri":"https://oauth2.googleapis.com/token"}"#;

/// Create an in-memory test database
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("in-memory db")
}

/// Configuration that never reaches the network
pub fn test_config() -> Config {
    Config {
        gemini_api_key: "test-key".to_string(),
        gemini_model: "gemini-1.5-pro".to_string(),
        genai_timeout: Duration::from_secs(5),
        genai_max_retries: 0,
        genai_retry_delay: Duration::from_millis(10),
        credentials_base64: base64::engine::general_purpose::STANDARD
            .encode(TEST_CREDENTIALS_JSON),
        project_id: "test-project".to_string(),
        port: 0,
        data_dir: std::env::temp_dir(),
        ttl_hours: 24,
        retention_limit: 10,
    }
}

/// Build API state over an in-memory database
pub fn test_state() -> Arc<ApiState> {
    let config = test_config();
    let repo = AnalysisRepo::new(setup_test_db(), config.ttl_hours, config.retention_limit);

    let credentials = Arc::new(
        CredentialProvider::from_base64(&config.credentials_base64).expect("test credentials"),
    );

    Arc::new(ApiState {
        repo,
        verifier: Arc::new(TokenVerifier::new(config.project_id.clone())),
        stt: Arc::new(SpeechToText::new(credentials.clone())),
        tts: Arc::new(TextToSpeech::new(credentials)),
        analyzer: Arc::new(CoachingAnalyzer::new(&config).expect("test analyzer")),
    })
}
