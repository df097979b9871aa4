//! Speech-to-text and text-to-speech adapters for Google Cloud
//!
//! Both adapters degrade instead of erroring: transcription always returns a
//! string (placeholders on failure) and synthesis returns empty bytes when
//! speech cannot be produced.

pub mod stt;
pub mod tts;

pub use stt::SpeechToText;
pub use tts::TextToSpeech;
