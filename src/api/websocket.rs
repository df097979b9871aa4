//! WebSocket coaching sessions
//!
//! One socket per player session. The client authenticates first, then
//! streams base64 audio chunks and signals `speech_end` to run a coaching
//! cycle: transcribe, analyze, persist, synthesize. The transcript is sent
//! as soon as it exists, before analysis, and the audio buffer is cleared
//! at the start of every cycle regardless of outcome.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::any;
use base64::Engine as _;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use serde::{Deserialize, Serialize};

use super::{ApiState, VOICE_TIMEOUT, coach};
use crate::analysis::{AnalysisView, Game};

/// Messages from the client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsIncoming {
    /// Firebase ID token, must be the first message
    Auth { token: String },
    /// Base64-encoded WebM/Opus audio chunk
    AudioChunk { audio_base64: String },
    /// End of utterance, runs the coaching cycle
    SpeechEnd {
        #[serde(default)]
        game: Game,
    },
    #[serde(other)]
    Unknown,
}

/// Messages to the client
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WsOutgoing {
    Authenticated {
        status: &'static str,
    },
    Error {
        error: String,
    },
    Transcript {
        transcript: String,
    },
    Analysis {
        analysis: AnalysisView,
        transcript: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tts_audio: Option<String>,
    },
}

/// Build the WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/", any(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ApiState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut user_id: Option<String> = None;
    let mut audio: Vec<u8> = Vec::new();

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let incoming =
            serde_json::from_str::<WsIncoming>(&text).unwrap_or(WsIncoming::Unknown);

        match incoming {
            WsIncoming::Auth { token } => match state.verifier.verify(&token).await {
                Ok(uid) => {
                    tracing::info!(user_id = %uid, "websocket session authenticated");
                    user_id = Some(uid);
                    if !send(&mut sender, &WsOutgoing::Authenticated { status: "authenticated" })
                        .await
                    {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "websocket authentication failed");
                    let _ = send(
                        &mut sender,
                        &WsOutgoing::Error {
                            error: "Unauthorized".to_string(),
                        },
                    )
                    .await;
                    break;
                }
            },
            _ if user_id.is_none() => {
                let _ = send(
                    &mut sender,
                    &WsOutgoing::Error {
                        error: "Not authenticated".to_string(),
                    },
                )
                .await;
                break;
            }
            WsIncoming::AudioChunk { audio_base64 } => {
                match base64::engine::general_purpose::STANDARD.decode(&audio_base64) {
                    Ok(chunk) => audio.extend_from_slice(&chunk),
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed audio chunk");
                    }
                }
            }
            WsIncoming::SpeechEnd { game } => {
                let Some(uid) = user_id.clone() else { break };
                let buffered = std::mem::take(&mut audio);

                if !run_cycle(&state, &mut sender, &uid, &buffered, game).await {
                    break;
                }
            }
            WsIncoming::Unknown => {
                tracing::debug!("ignoring unknown websocket message");
            }
        }
    }

    tracing::debug!("websocket session closed");
}

/// One coaching cycle; returns false when the socket is gone
async fn run_cycle(
    state: &ApiState,
    sender: &mut SplitSink<WebSocket, Message>,
    user_id: &str,
    audio: &[u8],
    game: Game,
) -> bool {
    let transcript = match tokio::time::timeout(VOICE_TIMEOUT, state.stt.transcribe(audio)).await {
        Ok(transcript) => transcript,
        Err(_) => {
            tracing::warn!("transcription timed out");
            "[Transcription error: timed out]".to_string()
        }
    };

    // Client shows the transcript while analysis runs
    if !send(
        sender,
        &WsOutgoing::Transcript {
            transcript: transcript.clone(),
        },
    )
    .await
    {
        return false;
    }

    match coach(state, user_id, &transcript, game, true).await {
        Ok(output) => {
            send(
                sender,
                &WsOutgoing::Analysis {
                    analysis: output.analysis,
                    transcript,
                    tts_audio: output.tts_audio,
                },
            )
            .await
        }
        Err(error) => {
            tracing::error!(error = %error, "coaching cycle failed");
            send(sender, &WsOutgoing::Error { error }).await
        }
    }
}

async fn send(sender: &mut SplitSink<WebSocket, Message>, msg: &WsOutgoing) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize websocket message");
            false
        }
    }
}
