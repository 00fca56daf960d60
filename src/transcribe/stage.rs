//! Retry and quality policy around the speech-to-text engine.
//!
//! The engine call budget is bounded: transport retries and the
//! canned-phrase re-attempt draw from the same `max_attempts` pool, so one
//! record can never cost more than that many engine calls.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{RetryPolicy, TranscribeConfig};
use crate::error::Result;
use crate::quality::{Classification, PhraseTable};

use super::SpeechToText;

/// Final product of the stage for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptOutcome {
    pub text: String,
    /// Whether the text passed the quality classifier. Unaccepted text is
    /// still worth persisting so reruns can find and replace it.
    pub accepted: bool,
}

pub struct TranscriptionStage<'a> {
    engine: &'a dyn SpeechToText,
    config: &'a TranscribeConfig,
    retry: &'a RetryPolicy,
    phrases: &'a PhraseTable,
}

impl<'a> TranscriptionStage<'a> {
    pub fn new(
        engine: &'a dyn SpeechToText,
        config: &'a TranscribeConfig,
        retry: &'a RetryPolicy,
        phrases: &'a PhraseTable,
    ) -> Self {
        Self {
            engine,
            config,
            retry,
            phrases,
        }
    }

    /// One re-attempt with the generic prompt and a raised temperature. The
    /// re-attempt only wins if it produces strictly longer text.
    async fn canned_phrase_retry(&self, audio_path: &Path, first: String) -> String {
        match self
            .engine
            .transcribe(
                audio_path,
                &self.config.language,
                &self.config.retry_prompt,
                self.config.retry_temperature,
            )
            .await
        {
            Ok(retry_text) => {
                let retry_text = retry_text.trim().to_string();
                if retry_text.chars().count() > first.chars().count() {
                    retry_text
                } else {
                    first
                }
            }
            Err(e) => {
                warn!(error = %e, "Canned-phrase retry failed, keeping the first result");
                first
            }
        }
    }

    /// Transcribe one audio file and classify the result.
    ///
    /// Transport errors and ordinary rejections re-enter the attempt loop
    /// until the budget runs out; a short canned phrase instead gets one
    /// re-attempt with the generic prompt, which is terminal either way.
    /// Exhausting the budget returns the longest text seen, unaccepted.
    pub async fn run(&self, audio_path: &Path) -> Result<TranscriptOutcome> {
        let mut attempts = 0;
        let mut best = String::new();

        while attempts < self.retry.max_attempts {
            attempts += 1;
            let text = match self
                .engine
                .transcribe(
                    audio_path,
                    &self.config.language,
                    &self.config.prompt,
                    self.config.temperature,
                )
                .await
            {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    if attempts >= self.retry.max_attempts {
                        if best.is_empty() {
                            return Err(e);
                        }
                        break;
                    }
                    warn!(attempt = attempts, error = %e, "Transcription attempt failed, backing off");
                    tokio::time::sleep(self.retry.backoff()).await;
                    continue;
                }
            };

            if text.chars().count() > best.chars().count() {
                best = text.clone();
            }

            match self.phrases.classify(&text) {
                Classification::Accepted => {
                    return Ok(TranscriptOutcome {
                        text,
                        accepted: true,
                    });
                }
                Classification::Rejected(_)
                    if self.phrases.is_short_canned_phrase(&text)
                        && attempts < self.retry.max_attempts =>
                {
                    info!(text = %text, "Result looks like a canned phrase, retrying with generic prompt");
                    let chosen = self.canned_phrase_retry(audio_path, text).await;
                    let accepted = self.phrases.classify(&chosen).is_accepted();
                    return Ok(TranscriptOutcome {
                        text: chosen,
                        accepted,
                    });
                }
                Classification::Rejected(reason) => {
                    debug!(?reason, attempt = attempts, "Result rejected, trying again");
                }
            }
        }

        Ok(TranscriptOutcome {
            text: best,
            accepted: false,
        })
    }
}
