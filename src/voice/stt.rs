//! Speech-to-text (STT) via Google Cloud `speech:recognize`

use std::sync::Arc;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::credentials::CredentialProvider;
use crate::{Error, Result};

const SPEECH_API_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";

/// Placeholder transcript when the buffer is empty
pub const NO_AUDIO: &str = "[No audio data received]";

/// Placeholder transcript when recognition found no speech
pub const NO_SPEECH: &str = "[No speech detected]";

/// Recognition request
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeRequest<'a> {
    config: RecognitionConfig,
    audio: RecognitionAudio<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig {
    encoding: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate_hertz: Option<u32>,
    audio_channel_count: u32,
    language_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    enable_automatic_punctuation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'static str>,
}

#[derive(Serialize)]
struct RecognitionAudio<'a> {
    content: &'a str,
}

/// Recognition response
#[derive(Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<SpeechResult>,
}

#[derive(Deserialize)]
struct SpeechResult {
    #[serde(default)]
    alternatives: Vec<SpeechAlternative>,
}

#[derive(Deserialize)]
struct SpeechAlternative {
    #[serde(default)]
    transcript: String,
}

/// Transcribes browser-captured WebM/Opus speech
///
/// `transcribe` never fails: empty input, silent audio, and API errors all
/// map to bracketed placeholder transcripts so the coaching pipeline can
/// keep going.
pub struct SpeechToText {
    client: reqwest::Client,
    credentials: Arc<CredentialProvider>,
}

impl SpeechToText {
    #[must_use]
    pub fn new(credentials: Arc<CredentialProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
        }
    }

    /// Transcribe audio to text
    ///
    /// # Arguments
    ///
    /// * `audio` - WebM/Opus audio bytes as captured by the browser
    pub async fn transcribe(&self, audio: &[u8]) -> String {
        if audio.is_empty() {
            return NO_AUDIO.to_string();
        }

        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        // Primary config pins the browser's 48kHz capture rate
        match self.recognize(audio, Some(48_000)).await {
            Ok(transcript) => transcript,
            Err(e) => {
                tracing::warn!(error = %e, "recognition failed, retrying with auto-detected rate");

                // Fallback lets the service detect the sample rate
                match self.recognize(audio, None).await {
                    Ok(transcript) => transcript,
                    Err(e) => {
                        tracing::error!(error = %e, "speech recognition failed");
                        format!("[Transcription error: {e}]")
                    }
                }
            }
        }
    }

    /// Single `speech:recognize` call
    async fn recognize(&self, audio: &[u8], sample_rate_hertz: Option<u32>) -> Result<String> {
        let token = self.credentials.access_token().await?;
        let content = base64::engine::general_purpose::STANDARD.encode(audio);

        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "WEBM_OPUS",
                sample_rate_hertz,
                audio_channel_count: 1,
                language_code: "en-US",
                enable_automatic_punctuation: Some(true),
                model: Some("command_and_search"),
            },
            audio: RecognitionAudio { content: &content },
        };

        let response = self
            .client
            .post(SPEECH_API_URL)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Stt(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("Speech API error {status}: {body}")));
        }

        let result: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| Error::Stt(format!("invalid response: {e}")))?;

        if result.results.is_empty() {
            return Ok(NO_SPEECH.to_string());
        }

        let transcript = result
            .results
            .iter()
            .filter_map(|r| r.alternatives.first())
            .map(|a| a.transcript.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_buffer_yields_placeholder() {
        let json = r#"{"project_id":"p","client_email":"e","private_key":"","token_uri":"https://oauth2.googleapis.com/token"}"#;
        let blob = base64::engine::general_purpose::STANDARD.encode(json);
        let credentials = Arc::new(CredentialProvider::from_base64(&blob).unwrap());

        // Returns before any network or token work
        let stt = SpeechToText::new(credentials);
        assert_eq!(stt.transcribe(&[]).await, NO_AUDIO);
    }

    #[test]
    fn request_omits_absent_sample_rate() {
        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "WEBM_OPUS",
                sample_rate_hertz: None,
                audio_channel_count: 1,
                language_code: "en-US",
                enable_automatic_punctuation: Some(true),
                model: Some("command_and_search"),
            },
            audio: RecognitionAudio { content: "AAAA" },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["config"].get("sampleRateHertz").is_none());
        assert_eq!(json["config"]["encoding"], "WEBM_OPUS");
        assert_eq!(json["config"]["model"], "command_and_search");
    }

    #[test]
    fn request_includes_pinned_sample_rate() {
        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "WEBM_OPUS",
                sample_rate_hertz: Some(48_000),
                audio_channel_count: 1,
                language_code: "en-US",
                enable_automatic_punctuation: Some(true),
                model: Some("command_and_search"),
            },
            audio: RecognitionAudio { content: "AAAA" },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["config"]["sampleRateHertz"], 48_000);
        assert_eq!(json["config"]["audioChannelCount"], 1);
    }

    #[test]
    fn response_joins_result_transcripts() {
        let json = r#"{"results":[
            {"alternatives":[{"transcript":"my possession"},{"transcript":"ignored"}]},
            {"alternatives":[{"transcript":"is terrible"}]}
        ]}"#;
        let resp: RecognizeResponse = serde_json::from_str(json).unwrap();
        let joined = resp
            .results
            .iter()
            .filter_map(|r| r.alternatives.first())
            .map(|a| a.transcript.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, "my possession is terrible");
    }

    #[test]
    fn empty_response_deserializes() {
        let resp: RecognizeResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.results.is_empty());
    }
}
