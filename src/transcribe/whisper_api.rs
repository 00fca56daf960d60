//! Hosted Whisper engine behind the OpenAI audio transcription endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::error::{ReelError, Result};

use super::SpeechToText;

const TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct WhisperApiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl WhisperApiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl SpeechToText for WhisperApiClient {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String> {
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());
        let bytes = tokio::fs::read(audio_path).await?;
        debug!(file = %audio_path.display(), bytes = bytes.len(), "Uploading audio for transcription");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| ReelError::Transcription(format!("invalid mime type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", language.to_string())
            .text("prompt", prompt.to_string())
            .text("temperature", temperature.to_string())
            .text("response_format", "json");

        let resp = self
            .client
            .post(TRANSCRIPTIONS_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReelError::Transcription(format!(
                "transcription request failed with {}: {}",
                status, body
            )));
        }

        let parsed: TranscriptionResponse = resp.json().await?;
        Ok(parsed.text)
    }
}
