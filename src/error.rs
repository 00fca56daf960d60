use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Scrape service error: {0}")]
    Scrape(String),

    #[error("Media acquisition error: {0}")]
    Acquisition(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Enhancement error: {0}")]
    Enhancement(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ReelError>;
