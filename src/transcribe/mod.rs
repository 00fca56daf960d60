//! Speech-to-text stage.
//!
//! The engine behind the [`SpeechToText`] trait is interchangeable; the
//! retry and quality policy lives in [`stage`] and treats the engine as an
//! opaque collaborator.

pub mod stage;
pub mod whisper_api;

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

pub use stage::{TranscriptOutcome, TranscriptionStage};
pub use whisper_api::WhisperApiClient;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe one audio file. Transport and service failures are errors;
    /// a successful call may still return unusable text.
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String>;
}
