//! PlayCoach Gateway - Real-time voice coaching for competitive gamers
//!
//! This library provides the core functionality for the PlayCoach gateway:
//! - WebSocket voice sessions (buffered audio, transcribe, coach, speak)
//! - Gemini-backed coaching analysis with a structured-text parser
//! - Google Cloud Speech-to-Text and Text-to-Speech adapters
//! - Firebase ID token verification
//! - SQLite persistence with TTL expiry and per-user retention
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Browser Client                      │
//! │   WebSocket audio  │  REST analyze  │  History      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               PlayCoach Gateway                      │
//! │   Auth  │  STT  │  Analyzer + Parser  │  TTS  │ DB  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                Google Cloud APIs                     │
//! │   Speech  │  Text-to-Speech  │  Gemini  │  Firebase │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod analysis;
pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod voice;

pub use analysis::{AnalysisResult, AnalysisView, CoachingAnalyzer, Game, ResponseKind};
pub use auth::TokenVerifier;
pub use config::Config;
pub use credentials::{CredentialProvider, ServiceAccountKey};
pub use db::{AnalysisRecord, AnalysisRepo, DbConn, DbPool};
pub use error::{Error, Result};
pub use voice::{SpeechToText, TextToSpeech};
