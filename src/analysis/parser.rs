//! Heuristic parsing of free-form coaching text into structured advice
//!
//! The model is asked for plain text, not JSON, so everything here is
//! best-effort line classification with graceful fallbacks. The functions are
//! pure; the same input always yields the same output.

use super::{AnalysisResult, ResponseKind};

/// Phrases that indicate the player asked for an in-depth breakdown
const DETAIL_KEYWORDS: &[&str] = &[
    "detailed",
    "comprehensive",
    "in-depth",
    "thorough",
    "full analysis",
    "break down",
];

const POSITIVE_WORDS: &[&str] = &["excellent", "well", "good", "great", "improving", "better"];
const NEGATIVE_WORDS: &[&str] = &["mistake", "poor", "bad", "missed", "struggling", "weakness"];

/// Characters stripped from the front of bullet/numbered lines
const MARKER_CHARS: &[char] = &[
    '-', '•', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', ' ',
];

/// Whether the player's request asks for a detailed analysis
#[must_use]
pub fn wants_detail(text: &str) -> bool {
    let lowered = text.to_lowercase();
    DETAIL_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Parse a detailed model response into tips, drills, and a score
#[must_use]
pub fn parse_detailed(text: &str) -> AnalysisResult {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut top_tips: Vec<String> = Vec::new();
    let mut drills: Vec<String> = Vec::new();
    let mut explanation_parts: Vec<&str> = Vec::new();
    let mut est_score: Option<f64> = None;

    for line in &lines {
        let lowered = line.to_lowercase();
        if is_marker_line(&lowered) {
            let stripped = line.trim_start_matches(MARKER_CHARS).trim().to_string();
            if lowered.contains("drill") || lowered.contains("practice") || lowered.contains("train")
            {
                drills.push(stripped);
            } else {
                top_tips.push(stripped);
            }
        } else if lowered.contains("score") || lowered.contains('%') {
            // Score lines also contribute to the explanation
            if let Some(val) = extract_score(line) {
                est_score = Some(val.clamp(0.0, 100.0) / 100.0);
            }
            explanation_parts.push(line);
        } else {
            explanation_parts.push(line);
        }
    }

    // Fallback: no tips parsed, use the first three sentences
    if top_tips.is_empty() {
        top_tips = split_sentences(text)
            .into_iter()
            .take(3)
            .map(str::to_string)
            .collect();
    }

    let est_score = est_score.unwrap_or_else(|| synthetic_score(text));

    AnalysisResult {
        top_tips,
        drills,
        explanation: explanation_parts.join(" ").trim().to_string(),
        estimated_score: Some(round_to(est_score, 3)),
        rating: Some(score_to_rating(est_score)),
        raw_text: text.to_string(),
        response_kind: ResponseKind::Detailed,
        error: None,
    }
}

/// Parse a simple model response: the first three sentences, no structure
#[must_use]
pub fn parse_simple(text: &str) -> AnalysisResult {
    let explanation = split_sentences(text)
        .into_iter()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ");

    AnalysisResult {
        top_tips: Vec::new(),
        drills: Vec::new(),
        explanation,
        estimated_score: None,
        rating: None,
        raw_text: text.to_string(),
        response_kind: ResponseKind::Simple,
        error: None,
    }
}

/// Normalize a 0..1 score to a 1..10 rating, rounded to one decimal
#[must_use]
pub fn score_to_rating(score: f64) -> f64 {
    let clamped = score.clamp(0.0, 1.0);
    round_to(9.0f64.mul_add(clamped, 1.0), 1)
}

fn is_marker_line(lowered: &str) -> bool {
    lowered.starts_with("tip")
        || lowered.starts_with('-')
        || lowered.starts_with('•')
        || lowered.starts_with("1.")
        || lowered.starts_with("2.")
        || lowered.starts_with("3.")
}

/// Extract the first run of up to three digits from a line
fn extract_score(line: &str) -> Option<f64> {
    let bytes = line.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let digits: String = line[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .take(3)
        .collect();

    digits.parse().ok()
}

/// Sentiment-based score when the model gave no explicit number
fn synthetic_score(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    let mut score = 0.5_f64;
    if POSITIVE_WORDS.iter().any(|k| lowered.contains(k)) {
        score += 0.2;
    }
    if NEGATIVE_WORDS.iter().any(|k| lowered.contains(k)) {
        score -= 0.2;
    }
    score.clamp(0.0, 1.0)
}

/// Split text into sentences on `.`, `!`, `?` followed by whitespace
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let next_is_space = chars
                .peek()
                .is_none_or(|&(_, next)| next.is_whitespace());
            if next_is_space {
                let end = i + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.cast_signed());
    (value * factor).round() / factor
}
