//! Single-shot analysis and history endpoints
//!
//! WebSocket sessions cover live voice coaching; these routes cover the
//! one-request frontend paths: analyze a piece of text or a finished audio
//! clip, and list the caller's stored analyses.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ApiState, VOICE_TIMEOUT, coach};
use crate::analysis::{AnalysisView, Game};

/// Default page size for the history endpoint
const DEFAULT_RECENT_LIMIT: usize = 10;

/// API error responses
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    NotFound(String),
    Upstream(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid or missing bearer token".to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_error", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    text: Option<String>,
    audio_base64: Option<String>,
    include_audio: Option<bool>,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    analysis: AnalysisView,
    transcript: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tts_audio: Option<String>,
}

#[derive(Deserialize)]
struct RecentQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct RecentResponse {
    analyses: Vec<RecentEntry>,
}

#[derive(Serialize)]
struct RecentEntry {
    id: String,
    created_at: String,
    user_text: String,
    analysis: AnalysisView,
}

/// Build the analysis router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/analyze/{game}", post(analyze))
        .route("/analyses/recent/{game}", get(recent))
        .with_state(state)
}

/// Extract and verify the bearer token, returning the user id
async fn authorize(state: &ApiState, headers: &HeaderMap) -> Result<String, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    state.verifier.verify(token).await.map_err(|e| {
        tracing::warn!(error = %e, "token verification failed");
        ApiError::Unauthorized
    })
}

fn parse_game(raw: &str) -> Result<Game, ApiError> {
    Game::from_path(raw).ok_or_else(|| ApiError::NotFound(format!("unknown game: {raw}")))
}

async fn analyze(
    State(state): State<Arc<ApiState>>,
    Path(game): Path<String>,
    headers: HeaderMap,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let game = parse_game(&game)?;
    let user_id = authorize(&state, &headers).await?;

    let transcript = match (body.text, body.audio_base64) {
        (Some(text), _) if !text.trim().is_empty() => text,
        (_, Some(audio_base64)) => {
            let audio = base64::engine::general_purpose::STANDARD
                .decode(&audio_base64)
                .map_err(|e| ApiError::BadRequest(format!("invalid audio_base64: {e}")))?;

            match tokio::time::timeout(VOICE_TIMEOUT, state.stt.transcribe(&audio)).await {
                Ok(transcript) => transcript,
                Err(_) => "[Transcription error: timed out]".to_string(),
            }
        }
        _ => {
            return Err(ApiError::BadRequest(
                "either text or audio_base64 is required".to_string(),
            ));
        }
    };

    let with_audio = body.include_audio.unwrap_or(true);
    let output = coach(&state, &user_id, &transcript, game, with_audio)
        .await
        .map_err(ApiError::Upstream)?;

    Ok(Json(AnalyzeResponse {
        analysis: output.analysis,
        transcript,
        tts_audio: output.tts_audio,
    }))
}

async fn recent(
    State(state): State<Arc<ApiState>>,
    Path(game): Path<String>,
    Query(query): Query<RecentQuery>,
    headers: HeaderMap,
) -> Result<Json<RecentResponse>, ApiError> {
    let game = parse_game(&game)?;
    let user_id = authorize(&state, &headers).await?;

    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let records = state
        .repo
        .list_recent(&user_id, game, limit)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let analyses = records
        .into_iter()
        .map(|r| RecentEntry {
            id: r.id,
            created_at: r.created_at.to_rfc3339(),
            user_text: r.user_text,
            analysis: r.analysis,
        })
        .collect();

    Ok(Json(RecentResponse { analyses }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ResponseKind;

    #[test]
    fn error_body_carries_code_and_message() {
        let response = ApiError::BadRequest("missing text".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn analyze_request_accepts_partial_bodies() {
        let body: AnalyzeRequest = serde_json::from_str(r#"{"text":"my aim is off"}"#).unwrap();
        assert_eq!(body.text.as_deref(), Some("my aim is off"));
        assert!(body.audio_base64.is_none());
        assert!(body.include_audio.is_none());
    }

    #[test]
    fn tts_audio_key_absent_when_none() {
        let response = AnalyzeResponse {
            analysis: AnalysisView {
                summary: "s".to_string(),
                top_tips: vec![],
                training_drills: vec![],
                rating: None,
                confidence: None,
                response_type: ResponseKind::Simple,
            },
            transcript: "t".to_string(),
            tts_audio: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("tts_audio").is_none());
        assert_eq!(json["transcript"], "t");
    }
}
