//! Text-to-speech (TTS) via Google Cloud `text:synthesize`

use std::sync::Arc;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::credentials::CredentialProvider;
use crate::{Error, Result};

const TTS_API_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Rough character cap for the truncated retry
const TRUNCATE_CHARS: usize = 200;

/// Synthesis request
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection {
    language_code: &'static str,
    ssml_gender: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

/// Synthesis response
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Synthesizes MP3 speech for analysis summaries
///
/// `synthesize` never fails: a failed request is retried once with the text
/// truncated to its first sentence, and total failure yields empty bytes,
/// which callers treat as "no audio".
pub struct TextToSpeech {
    client: reqwest::Client,
    credentials: Arc<CredentialProvider>,
}

impl TextToSpeech {
    #[must_use]
    pub fn new(credentials: Arc<CredentialProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
        }
    }

    /// Synthesize speech for the given text, returning MP3 bytes
    pub async fn synthesize(&self, text: &str) -> Vec<u8> {
        if text.is_empty() {
            return Vec::new();
        }

        match self.synthesize_once(text).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(error = %e, "synthesis failed, retrying with truncated text");

                let truncated = truncate_for_retry(text);
                match self.synthesize_once(&truncated).await {
                    Ok(audio) => audio,
                    Err(e) => {
                        tracing::error!(error = %e, "speech synthesis failed");
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Single `text:synthesize` call
    async fn synthesize_once(&self, text: &str) -> Result<Vec<u8>> {
        let token = self.credentials.access_token().await?;

        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: "en-US",
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let response = self
            .client
            .post(TTS_API_URL)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Tts(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS API error {status}: {body}")));
        }

        let result: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| Error::Tts(format!("invalid response: {e}")))?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(&result.audio_content)
            .map_err(|e| Error::Tts(format!("invalid audio payload: {e}")))?;

        tracing::debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio)
    }
}

/// First sentence of the text, capped at [`TRUNCATE_CHARS`] characters
fn truncate_for_retry(text: &str) -> String {
    let first_sentence = text
        .char_indices()
        .find(|&(_, c)| matches!(c, '.' | '!' | '?'))
        .map_or(text, |(i, c)| &text[..i + c.len_utf8()]);

    first_sentence.chars().take(TRUNCATE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape_matches_api() {
        let request = SynthesizeRequest {
            input: SynthesisInput { text: "Pass earlier." },
            voice: VoiceSelection {
                language_code: "en-US",
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input"]["text"], "Pass earlier.");
        assert_eq!(json["voice"]["languageCode"], "en-US");
        assert_eq!(json["voice"]["ssmlGender"], "NEUTRAL");
        assert_eq!(json["audioConfig"]["audioEncoding"], "MP3");
    }

    #[test]
    fn truncation_takes_first_sentence() {
        let text = "Keep the ball. Then press high. Then shoot.";
        assert_eq!(truncate_for_retry(text), "Keep the ball.");
    }

    #[test]
    fn truncation_caps_unpunctuated_text() {
        let text = "a".repeat(500);
        assert_eq!(truncate_for_retry(&text).len(), TRUNCATE_CHARS);
    }

    #[test]
    fn response_decodes_base64_audio() {
        let json = r#"{"audioContent":"aGVsbG8="}"#;
        let resp: SynthesizeResponse = serde_json::from_str(json).unwrap();
        let audio = base64::engine::general_purpose::STANDARD
            .decode(&resp.audio_content)
            .unwrap();
        assert_eq!(audio, b"hello");
    }
}
