//! Coaching analysis: prompt selection, Gemini calls, and heuristic parsing

mod analyzer;
pub mod parser;
pub mod retry;

pub use analyzer::CoachingAnalyzer;

use serde::{Deserialize, Serialize};

/// Supported game titles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Game {
    #[default]
    Fifa,
    Lol,
}

impl Game {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fifa => "fifa",
            Self::Lol => "lol",
        }
    }

    /// Parse a game identifier, falling back to FIFA for unknown values
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("lol") {
            Self::Lol
        } else {
            Self::Fifa
        }
    }

    /// Parse a game identifier strictly (for URL path segments)
    #[must_use]
    pub fn from_path(s: &str) -> Option<Self> {
        match s {
            "fifa" => Some(Self::Fifa),
            "lol" => Some(Self::Lol),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Game {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_str_lossy(&s))
    }
}

/// How much depth the player asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Simple,
    Detailed,
}

impl ResponseKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Detailed => "detailed",
        }
    }

    /// Parse a stored response type, defaulting to simple
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        if s == "detailed" {
            Self::Detailed
        } else {
            Self::Simple
        }
    }
}

/// Structured output of a coaching analysis
///
/// This is the internal representation; [`AnalysisView`] is the shape sent
/// to clients and flattened into storage.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub top_tips: Vec<String>,
    pub drills: Vec<String>,
    pub explanation: String,
    pub estimated_score: Option<f64>,
    pub rating: Option<f64>,
    pub raw_text: String,
    pub response_kind: ResponseKind,
    /// Populated when analysis could not be produced; the rest of the fields
    /// then hold neutral placeholder values.
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Neutral placeholder result for unrecoverable analysis failures
    #[must_use]
    pub fn degraded(error: String, response_kind: ResponseKind) -> Self {
        Self {
            top_tips: Vec::new(),
            drills: Vec::new(),
            explanation: String::new(),
            estimated_score: Some(0.5),
            rating: Some(5.0),
            raw_text: String::new(),
            response_kind,
            error: Some(error),
        }
    }

    /// Build the client-facing view
    #[must_use]
    pub fn to_view(&self) -> AnalysisView {
        let summary = if self.explanation.is_empty() {
            "No analysis available.".to_string()
        } else {
            self.explanation.clone()
        };

        AnalysisView {
            summary,
            top_tips: self.top_tips.clone(),
            training_drills: self.drills.clone(),
            rating: self.rating,
            confidence: self.estimated_score,
            response_type: self.response_kind,
        }
    }
}

/// Client-facing analysis payload
///
/// Serialized with camelCase keys; the same flattened shape is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisView {
    pub summary: String,
    pub top_tips: Vec<String>,
    pub training_drills: Vec<String>,
    pub rating: Option<f64>,
    pub confidence: Option<f64>,
    pub response_type: ResponseKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_parses_lossily() {
        assert_eq!(Game::from_str_lossy("lol"), Game::Lol);
        assert_eq!(Game::from_str_lossy("fifa"), Game::Fifa);
        assert_eq!(Game::from_str_lossy("chess"), Game::Fifa);
        assert_eq!(Game::from_str_lossy(""), Game::Fifa);
    }

    #[test]
    fn game_parses_path_strictly() {
        assert_eq!(Game::from_path("lol"), Some(Game::Lol));
        assert_eq!(Game::from_path("fifa"), Some(Game::Fifa));
        assert_eq!(Game::from_path("chess"), None);
    }

    #[test]
    fn view_serializes_camel_case() {
        let view = AnalysisView {
            summary: "Keep the ball moving.".to_string(),
            top_tips: vec!["Pass early".to_string()],
            training_drills: vec![],
            rating: Some(7.3),
            confidence: Some(0.7),
            response_type: ResponseKind::Detailed,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["topTips"][0], "Pass early");
        assert_eq!(json["trainingDrills"].as_array().unwrap().len(), 0);
        assert_eq!(json["responseType"], "detailed");
        assert!((json["rating"].as_f64().unwrap() - 7.3).abs() < 1e-9);
    }

    #[test]
    fn simple_view_has_null_rating() {
        let view = AnalysisView {
            summary: "s".to_string(),
            top_tips: vec![],
            training_drills: vec![],
            rating: None,
            confidence: None,
            response_type: ResponseKind::Simple,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["rating"].is_null());
        assert!(json["confidence"].is_null());
        assert_eq!(json["responseType"], "simple");
    }

    #[test]
    fn degraded_result_is_neutral() {
        let r = AnalysisResult::degraded("Analysis failed: boom".to_string(), ResponseKind::Simple);
        assert!(r.top_tips.is_empty());
        assert!(r.drills.is_empty());
        assert_eq!(r.estimated_score, Some(0.5));
        assert_eq!(r.rating, Some(5.0));
        assert!(r.error.is_some());
    }
}
