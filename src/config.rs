use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ReelError, Result};

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    2
}

fn default_pause_secs() -> u64 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub scrape: ScrapeConfig,
    pub transcribe: TranscribeConfig,
    pub enhance: EnhanceConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Apify API token. Falls back to the APIFY_TOKEN environment variable.
    #[serde(default)]
    pub apify_token: Option<String>,
    /// Apify actor to run for both account and hashtag scrapes.
    pub actor: String,
    /// Default result limit when a batch does not set one.
    pub default_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeConfig {
    /// OpenAI API key. Falls back to the OPENAI_API_KEY environment variable.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    /// Speech-to-text model name.
    pub model: String,
    /// Language hint passed to the speech-to-text service.
    pub language: String,
    /// Domain-priming prompt for the first transcription attempt.
    pub prompt: String,
    /// Generic prompt used when the first result is a canned phrase.
    pub retry_prompt: String,
    /// Temperature for the primary attempt.
    pub temperature: f32,
    /// Temperature for the canned-phrase retry.
    pub retry_temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceConfig {
    /// Whether accepted transcripts are sent for text-quality improvement.
    pub enabled: bool,
    /// Chat-completion model name.
    pub model: String,
    /// Sampling temperature for the completion call.
    pub temperature: f32,
    /// Upper bound on completion tokens.
    pub max_tokens: u32,
    /// Responses shorter than this fraction of the input are discarded.
    pub min_length_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to the yt-dlp binary.
    pub ytdlp_path: String,
    /// Path to the ffmpeg binary.
    pub ffmpeg_path: String,
    /// Scratch directory for downloaded video and extracted audio.
    pub work_dir: String,
    /// Downloads at or below this size are treated as error pages, not media.
    pub min_video_bytes: u64,
}

/// Retry constants shared by the stages, configured once instead of being
/// re-declared per call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total speech-to-text attempts per record.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed wait after a transport error.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    /// Fixed pause between records in a transcription batch.
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
            pause_secs: default_pause_secs(),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_secs(self.pause_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scrape: ScrapeConfig {
                apify_token: None,
                actor: "apify~instagram-scraper".to_string(),
                default_limit: 100,
            },
            transcribe: TranscribeConfig {
                openai_api_key: None,
                model: "whisper-1".to_string(),
                language: "ru".to_string(),
                prompt: "Это видео о косметологии, эстетической медицине, красоте, \
                         уходе за кожей. Транскрибируйте всю речь, даже если она не \
                         связана с косметологией. Игнорируйте субтитры, водяные знаки \
                         и музыку в видео."
                    .to_string(),
                retry_prompt: "Транскрибируйте всю речь в видео. Игнорируйте субтитры, \
                               водяные знаки и музыку."
                    .to_string(),
                temperature: 0.0,
                retry_temperature: 0.2,
            },
            enhance: EnhanceConfig {
                enabled: true,
                model: "gpt-4".to_string(),
                temperature: 0.1,
                max_tokens: 2000,
                min_length_ratio: 0.8,
            },
            media: MediaConfig {
                ytdlp_path: "yt-dlp".to_string(),
                ffmpeg_path: "ffmpeg".to_string(),
                work_dir: "temp".to_string(),
                min_video_bytes: 1000,
            },
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReelError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ReelError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReelError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ReelError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Resolve the Apify token from config or environment. A missing token is
    /// a configuration error discovered before any work starts.
    pub fn apify_token(&self) -> Result<String> {
        self.scrape
            .apify_token
            .clone()
            .or_else(|| std::env::var("APIFY_TOKEN").ok())
            .ok_or_else(|| {
                ReelError::Config("APIFY_TOKEN is not set in config or environment".to_string())
            })
    }

    /// Resolve the OpenAI key from config or environment.
    pub fn openai_api_key(&self) -> Result<String> {
        self.transcribe
            .openai_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ReelError::Config("OPENAI_API_KEY is not set in config or environment".to_string())
            })
    }
}
