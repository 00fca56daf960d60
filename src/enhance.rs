//! Transcript post-editing with a chat-completion model.
//!
//! This stage is strictly best-effort: any failure, missing response, or
//! suspiciously short response degrades to the original text. Enhancement
//! can improve a transcript but never lose one.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::EnhanceConfig;
use crate::error::{ReelError, Result};
use crate::quality::PhraseTable;

const EDITOR_SYSTEM_PROMPT: &str =
    "Ты редактор расшифровок видео о косметологии и эстетической медицине. \
     Исправь ошибки распознавания речи, пунктуацию и разбей текст на \
     предложения. Сохрани смысл, стиль и все факты. Не сокращай текст, не \
     добавляй ничего от себя. Верни только исправленный текст.";

/// Opaque chat-completion collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion. `None` means the service answered without usable
    /// content, which is not an error at the transport level.
    async fn complete(&self, system: &str, user: &str) -> Result<Option<String>>;
}

pub struct TranscriptEnhancer<'a> {
    client: &'a dyn CompletionClient,
    config: &'a EnhanceConfig,
    phrases: &'a PhraseTable,
}

impl<'a> TranscriptEnhancer<'a> {
    pub fn new(
        client: &'a dyn CompletionClient,
        config: &'a EnhanceConfig,
        phrases: &'a PhraseTable,
    ) -> Self {
        Self {
            client,
            config,
            phrases,
        }
    }

    /// Return an improved version of `text`, or `text` unchanged when the
    /// stage is disabled, the input is not worth editing, or the edit is
    /// rejected.
    pub async fn enhance(&self, text: &str) -> String {
        if !self.config.enabled {
            return text.to_string();
        }
        if !self.phrases.classify(text).is_accepted() {
            debug!("Input failed quality classification, skipping enhancement");
            return text.to_string();
        }

        match self.client.complete(EDITOR_SYSTEM_PROMPT, text).await {
            Ok(Some(edited)) => {
                let edited = edited.trim().to_string();
                let floor =
                    (text.chars().count() as f64 * self.config.min_length_ratio) as usize;
                if edited.chars().count() < floor {
                    warn!(
                        input_chars = text.chars().count(),
                        output_chars = edited.chars().count(),
                        "Enhanced text is too short, keeping the original"
                    );
                    text.to_string()
                } else {
                    info!("Transcript enhanced");
                    edited
                }
            }
            Ok(None) => {
                warn!("Completion returned no content, keeping the original");
                text.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Enhancement failed, keeping the original");
                text.to_string()
            }
        }
    }
}

/// OpenAI chat-completions implementation of [`CompletionClient`].
pub struct OpenAiCompletionClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompletionClient {
    const CHAT_COMPLETIONS_URL: &'static str = "https://api.openai.com/v1/chat/completions";

    pub fn new(api_key: String, config: &EnhanceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<Option<String>> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let resp = self
            .client
            .post(Self::CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ReelError::Enhancement(format!(
                "completion request failed with {}: {}",
                status, text
            )));
        }

        let parsed: serde_json::Value = resp.json().await?;
        let content = parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "сегодня поговорим про уход за кожей после чистки лица и \
         какие средства использовать в первые дни после процедуры у косметолога";

    fn enhance_config() -> EnhanceConfig {
        crate::config::Config::default().enhance
    }

    #[tokio::test]
    async fn missing_content_degrades_to_the_original() {
        let mut client = MockCompletionClient::new();
        client.expect_complete().returning(|_, _| Ok(None));

        let config = enhance_config();
        let phrases = PhraseTable::default();
        let enhancer = TranscriptEnhancer::new(&client, &config, &phrases);

        assert_eq!(enhancer.enhance(TRANSCRIPT).await, TRANSCRIPT);
    }

    #[tokio::test]
    async fn service_errors_degrade_to_the_original() {
        let mut client = MockCompletionClient::new();
        client.expect_complete().returning(|_, _| {
            Err(ReelError::Enhancement("rate limited".to_string()))
        });

        let config = enhance_config();
        let phrases = PhraseTable::default();
        let enhancer = TranscriptEnhancer::new(&client, &config, &phrases);

        assert_eq!(enhancer.enhance(TRANSCRIPT).await, TRANSCRIPT);
    }

    #[tokio::test]
    async fn short_responses_are_discarded() {
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .returning(|_, _| Ok(Some("Коротко.".to_string())));

        let config = enhance_config();
        let phrases = PhraseTable::default();
        let enhancer = TranscriptEnhancer::new(&client, &config, &phrases);

        assert_eq!(enhancer.enhance(TRANSCRIPT).await, TRANSCRIPT);
    }

    #[tokio::test]
    async fn long_enough_responses_replace_the_original() {
        let edited = format!("{} Дополнено и вычитано редактором.", TRANSCRIPT);
        let expected = edited.clone();
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .returning(move |_, _| Ok(Some(edited.clone())));

        let config = enhance_config();
        let phrases = PhraseTable::default();
        let enhancer = TranscriptEnhancer::new(&client, &config, &phrases);

        assert_eq!(enhancer.enhance(TRANSCRIPT).await, expected);
    }

    #[tokio::test]
    async fn rejected_input_is_never_sent_for_editing() {
        let mut client = MockCompletionClient::new();
        client.expect_complete().times(0);

        let config = enhance_config();
        let phrases = PhraseTable::default();
        let enhancer = TranscriptEnhancer::new(&client, &config, &phrases);

        assert_eq!(enhancer.enhance("ПОДПИШИСЬ").await, "ПОДПИШИСЬ");
    }

    #[tokio::test]
    async fn disabled_stage_is_an_identity() {
        let mut client = MockCompletionClient::new();
        client.expect_complete().times(0);

        let mut config = enhance_config();
        config.enabled = false;
        let phrases = PhraseTable::default();
        let enhancer = TranscriptEnhancer::new(&client, &config, &phrases);

        assert_eq!(enhancer.enhance(TRANSCRIPT).await, TRANSCRIPT);
    }
}
