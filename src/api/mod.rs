//! HTTP and WebSocket API server for the coaching gateway

pub mod analyze;
pub mod health;
pub mod websocket;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use base64::Engine as _;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::analysis::{AnalysisView, CoachingAnalyzer, Game};
use crate::auth::TokenVerifier;
use crate::db::AnalysisRepo;
use crate::voice::{SpeechToText, TextToSpeech};
use crate::{Error, Result};

/// Upper bound on a single transcription or synthesis call
pub const VOICE_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub repo: AnalysisRepo,
    pub verifier: Arc<TokenVerifier>,
    pub stt: Arc<SpeechToText>,
    pub tts: Arc<TextToSpeech>,
    pub analyzer: Arc<CoachingAnalyzer>,
}

/// Result of a completed coaching cycle
pub struct CoachingOutput {
    pub analysis: AnalysisView,
    /// Base64 MP3, present only when synthesis produced audio
    pub tts_audio: Option<String>,
}

/// Analyze a transcript, persist the result, and optionally synthesize audio
///
/// Persistence is best-effort: a failed save is logged and the analysis is
/// still delivered. Synthesis failure or timeout leaves `tts_audio` empty.
///
/// # Errors
///
/// Returns the analyzer's error message when the model call failed after
/// retries; nothing is stored or synthesized in that case.
pub async fn coach(
    state: &ApiState,
    user_id: &str,
    transcript: &str,
    game: Game,
    with_audio: bool,
) -> std::result::Result<CoachingOutput, String> {
    let result = state.analyzer.analyze(transcript, game).await;
    if let Some(error) = result.error {
        return Err(error);
    }

    let analysis = result.to_view();

    if let Err(e) = state.repo.save(user_id, transcript, game, &analysis) {
        tracing::warn!(user_id = %user_id, error = %e, "failed to persist analysis");
    }

    let tts_audio = if with_audio {
        match tokio::time::timeout(VOICE_TIMEOUT, state.tts.synthesize(&analysis.summary)).await {
            Ok(audio) if !audio.is_empty() => {
                Some(base64::engine::general_purpose::STANDARD.encode(audio))
            }
            Ok(_) => None,
            Err(_) => {
                tracing::warn!("speech synthesis timed out");
                None
            }
        }
    } else {
        None
    };

    Ok(CoachingOutput { analysis, tts_audio })
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a new API server
    #[must_use]
    pub fn new(state: Arc<ApiState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let router = Router::new()
            .nest("/ws", websocket::router(self.state.clone()))
            .nest("/api", analyze::router(self.state.clone()))
            .merge(health::router());

        // CORS layer for cross-origin requests from the frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
