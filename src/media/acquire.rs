//! Download and audio-extraction stage.
//!
//! yt-dlp is the primary downloader because it resolves post pages to media.
//! When it fails and the record carries a direct video URL from scraping,
//! that URL is streamed as a fallback before the record is given up on.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::MediaConfig;
use crate::error::{ReelError, Result};
use crate::model::ContentRecord;

use super::commands::MediaCommandBuilder;
use super::{AudioHandle, AudioSource, ScratchWorkspace};

pub struct MediaAcquirer {
    config: MediaConfig,
    workspace: ScratchWorkspace,
    client: reqwest::Client,
}

impl MediaAcquirer {
    pub fn new(config: MediaConfig) -> Result<Self> {
        let workspace = ScratchWorkspace::create(Path::new(&config.work_dir))?;
        Ok(Self {
            config,
            workspace,
            client: reqwest::Client::new(),
        })
    }

    pub fn workspace(&self) -> &ScratchWorkspace {
        &self.workspace
    }

    /// Verify both external tools can be launched before any record is
    /// processed.
    pub async fn check_tools(&self) -> Result<()> {
        MediaCommandBuilder::version_check(&self.config.ytdlp_path, "--version")
            .execute()
            .await?;
        MediaCommandBuilder::version_check(&self.config.ffmpeg_path, "-version")
            .execute()
            .await?;
        Ok(())
    }

    async fn download_with_ytdlp(&self, content_url: &str, video_path: &Path) -> Result<()> {
        MediaCommandBuilder::download_video(&self.config.ytdlp_path, content_url, video_path)
            .execute()
            .await
    }

    async fn download_direct(&self, video_url: &str, video_path: &Path) -> Result<()> {
        let resp = self.client.get(video_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ReelError::Acquisition(format!(
                "direct download failed with {}",
                status
            )));
        }

        let mut file = tokio::fs::File::create(video_path).await?;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    /// A download below the size floor is a stub page or an error body, not
    /// a video.
    fn check_video_size(&self, video_path: &Path) -> Result<u64> {
        let size = std::fs::metadata(video_path).map(|m| m.len()).unwrap_or(0);
        if size < self.config.min_video_bytes {
            return Err(ReelError::Acquisition(format!(
                "downloaded file is {} bytes, below the {} byte floor",
                size, self.config.min_video_bytes
            )));
        }
        Ok(size)
    }
}

#[async_trait]
impl AudioSource for MediaAcquirer {
    async fn fetch_audio(&self, record: &ContentRecord) -> Result<AudioHandle> {
        let video_path = self.workspace.video_path();
        let audio_path = self.workspace.audio_path();
        // The handle owns both paths from here on; any early return below
        // drops it and removes whatever was written.
        let handle = AudioHandle::new(audio_path, Some(video_path.clone()));

        if let Err(e) = self.download_with_ytdlp(&record.content_url, &video_path).await {
            match &record.video_url {
                Some(video_url) => {
                    warn!(
                        url = %record.content_url,
                        error = %e,
                        "yt-dlp download failed, falling back to direct video URL"
                    );
                    self.download_direct(video_url, &video_path).await?;
                }
                None => return Err(e),
            }
        }

        let size = self.check_video_size(&video_path)?;
        info!(url = %record.content_url, bytes = size, "Video downloaded");

        MediaCommandBuilder::extract_audio(
            &self.config.ffmpeg_path,
            &video_path,
            &handle.audio_path,
        )
        .execute()
        .await?;

        let audio_size = std::fs::metadata(&handle.audio_path)
            .map(|m| m.len())
            .unwrap_or(0);
        if audio_size == 0 {
            return Err(ReelError::Acquisition(
                "audio extraction produced an empty file".to_string(),
            ));
        }
        info!(url = %record.content_url, bytes = audio_size, "Audio track extracted");

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquirer(dir: &Path, min_bytes: u64) -> MediaAcquirer {
        MediaAcquirer::new(MediaConfig {
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            work_dir: dir.to_string_lossy().to_string(),
            min_video_bytes: min_bytes,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn missing_tools_fail_the_startup_check() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-binary");
        let acquirer = MediaAcquirer::new(MediaConfig {
            ytdlp_path: missing.to_string_lossy().to_string(),
            ffmpeg_path: missing.to_string_lossy().to_string(),
            work_dir: dir.path().to_string_lossy().to_string(),
            min_video_bytes: 1000,
        })
        .unwrap();

        let err = acquirer.check_tools().await.unwrap_err();
        assert!(matches!(err, ReelError::Acquisition(_)));
    }

    #[test]
    fn undersized_download_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = acquirer(dir.path(), 1000);

        let video = acquirer.workspace().video_path();
        std::fs::write(&video, vec![0u8; 200]).unwrap();

        let err = acquirer.check_video_size(&video).unwrap_err();
        assert!(matches!(err, ReelError::Acquisition(_)));
    }

    #[test]
    fn sized_download_passes_the_floor() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = acquirer(dir.path(), 1000);

        let video = acquirer.workspace().video_path();
        std::fs::write(&video, vec![0u8; 4096]).unwrap();

        assert_eq!(acquirer.check_video_size(&video).unwrap(), 4096);
    }
}
