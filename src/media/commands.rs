//! Abstract external-tool command representation for yt-dlp and ffmpeg.

use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ReelError, Result};

/// One invocation of an external media tool.
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-acodec").arg(codec)
    }

    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Run the command and fail with its stderr if it exits non-zero.
    pub async fn execute(&self) -> Result<()> {
        debug!(binary = %self.binary_path, args = ?self.args, "Executing {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| {
                ReelError::Acquisition(format!("failed to launch {}: {}", self.binary_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelError::Acquisition(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Builders for the two tool invocations the pipeline needs.
pub struct MediaCommandBuilder;

impl MediaCommandBuilder {
    /// yt-dlp download of a post URL into a single mp4 file.
    pub fn download_video<P: AsRef<Path>>(
        ytdlp_path: &str,
        content_url: &str,
        output_path: P,
    ) -> MediaCommand {
        MediaCommand::new(ytdlp_path, "Video download")
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("-f")
            .arg("mp4")
            .arg("-o")
            .arg(output_path.as_ref().to_string_lossy().to_string())
            .arg(content_url)
    }

    /// ffmpeg extraction of a mono 16 kHz mp3 track suitable for
    /// speech-to-text.
    pub fn extract_audio<P: AsRef<Path>>(
        ffmpeg_path: &str,
        video_path: P,
        audio_path: P,
    ) -> MediaCommand {
        MediaCommand::new(ffmpeg_path, "Audio extraction")
            .input(video_path)
            .no_video()
            .audio_codec("mp3")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .overwrite()
            .output(audio_path)
    }

    /// Availability check for an external binary. yt-dlp wants `--version`,
    /// ffmpeg wants `-version`.
    pub fn version_check(binary_path: &str, flag: &str) -> MediaCommand {
        MediaCommand::new(binary_path, "Version check").arg(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_audio_produces_speech_ready_arguments() {
        let cmd = MediaCommandBuilder::extract_audio("ffmpeg", "in.mp4", "out.mp3");
        assert_eq!(
            cmd.args,
            vec!["-i", "in.mp4", "-vn", "-acodec", "mp3", "-ar", "16000", "-ac", "1", "-y", "out.mp3"]
        );
    }

    #[test]
    fn version_check_uses_the_given_flag() {
        assert_eq!(
            MediaCommandBuilder::version_check("ffmpeg", "-version").args,
            vec!["-version"]
        );
        assert_eq!(
            MediaCommandBuilder::version_check("yt-dlp", "--version").args,
            vec!["--version"]
        );
    }

    #[test]
    fn download_targets_the_post_url() {
        let cmd = MediaCommandBuilder::download_video(
            "yt-dlp",
            "https://example.com/reel/a",
            "video.mp4",
        );
        assert_eq!(cmd.args.last().unwrap(), "https://example.com/reel/a");
        assert!(cmd.args.contains(&"--no-playlist".to_string()));
    }
}
