//! Gemini-backed coaching analyzer

use serde::{Deserialize, Serialize};

use super::retry::{self, RetryPolicy};
use super::{AnalysisResult, Game, ResponseKind, parser};
use crate::config::Config;
use crate::{Error, Result};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Request body for `generateContent`
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Response from `generateContent` (partial)
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Produces structured coaching advice from a player's transcript
///
/// `analyze` never returns an error: unrecoverable failures yield a degraded
/// result with the `error` field populated, which callers surface themselves.
pub struct CoachingAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    policy: RetryPolicy,
}

impl CoachingAnalyzer {
    /// Create an analyzer from the gateway configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.genai_timeout)
            .build()
            .map_err(|e| Error::Analysis(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            policy: RetryPolicy {
                max_retries: config.genai_max_retries,
                base_delay: config.genai_retry_delay,
                ..RetryPolicy::default()
            },
        })
    }

    /// Analyze a player's transcript for the given game
    ///
    /// Detail phrasing in the transcript selects the detailed prompt and
    /// parser; otherwise the terse three-sentence form is used.
    pub async fn analyze(&self, text: &str, game: Game) -> AnalysisResult {
        let kind = if parser::wants_detail(text) {
            ResponseKind::Detailed
        } else {
            ResponseKind::Simple
        };

        let prompt = build_prompt(text, game, kind);

        match self.generate_with_retry(&prompt).await {
            Ok(raw) => match kind {
                ResponseKind::Detailed => parser::parse_detailed(&raw),
                ResponseKind::Simple => parser::parse_simple(&raw),
            },
            Err(e) => {
                tracing::error!(game = game.as_str(), error = %e, "analysis failed");
                AnalysisResult::degraded(format!("Analysis failed: {e}"), kind)
            }
        }
    }

    /// Call Gemini, retrying transient failures with backoff
    async fn generate_with_retry(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0;

        loop {
            match self.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    let message = e.to_string();
                    if attempt >= self.policy.max_retries || !retry::is_transient(&message) {
                        return Err(e);
                    }

                    let delay = retry::delay_for_attempt(&self.policy, attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay = ?delay,
                        error = %message,
                        "transient Gemini error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Single `generateContent` call
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{GEMINI_API_BASE}/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Analysis(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Analysis(format!("Gemini API error {status}: {body}")));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Analysis(format!("invalid Gemini response: {e}")))?;

        let text = result
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Analysis("Gemini returned no text".to_string()));
        }

        Ok(text)
    }
}

/// Build the coaching prompt for a game and depth
fn build_prompt(text: &str, game: Game, kind: ResponseKind) -> String {
    let (coach, focus) = match game {
        Game::Fifa => (
            "an expert football (EA FC / FIFA) tactical coach",
            "- Immediate next tactical action (what to do in the next 2 minutes)\n\
             - One mechanical improvement (passing, first touch, shooting)\n\
             - One strategic improvement (formation change, pressing trigger)",
        ),
        Game::Lol => (
            "an expert League of Legends coach",
            "- Immediate next action (what the player should do in the next 1-2 minutes)\n\
             - One mechanical improvement (how to practice it)\n\
             - One strategic improvement (macro decision)",
        ),
    };

    match kind {
        ResponseKind::Detailed => format!(
            "You are PlayCoach, {coach}. The player described their situation below.\n\
             Produce concise, actionable coaching advice in 3 bullets, suggest 2 training drills,\n\
             and give a short performance rating (0-100%).\n\
             Return a short plain-text analysis.\n\
             \n\
             Player's description:\n\
             {text}\n\
             \n\
             Focus on:\n\
             {focus}\n\
             - Keep the answer short (4-6 sentences), but include 3 clear tips and 2 practice drills."
        ),
        ResponseKind::Simple => format!(
            "You are PlayCoach, {coach}. The player described their situation below.\n\
             Answer in exactly three short sentences of direct advice.\n\
             No lists, no bullet points, no headings, no score.\n\
             \n\
             Player's description:\n\
             {text}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detailed_prompt_asks_for_structure() {
        let prompt = build_prompt("my possession is terrible", Game::Fifa, ResponseKind::Detailed);
        assert!(prompt.contains("3 bullets"));
        assert!(prompt.contains("2 training drills"));
        assert!(prompt.contains("0-100%"));
        assert!(prompt.contains("my possession is terrible"));
    }

    #[test]
    fn simple_prompt_forbids_structure() {
        let prompt = build_prompt("I keep dying to ganks", Game::Lol, ResponseKind::Simple);
        assert!(prompt.contains("exactly three short sentences"));
        assert!(prompt.contains("No lists"));
        assert!(!prompt.contains("training drills"));
    }

    #[test]
    fn prompts_are_game_specific() {
        let fifa = build_prompt("x", Game::Fifa, ResponseKind::Detailed);
        let lol = build_prompt("x", Game::Lol, ResponseKind::Detailed);
        assert!(fifa.contains("FIFA"));
        assert!(lol.contains("League of Legends"));
    }

    #[test]
    fn empty_generate_response_deserializes() {
        let resp: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.candidates.is_empty());
    }

    #[test]
    fn generate_response_extracts_text() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Pass earlier."}]}}]}"#;
        let resp: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.candidates[0].content.parts[0].text, "Pass earlier.");
    }
}
