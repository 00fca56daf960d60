//! Media acquisition: turn a content URL into a local audio file ready for
//! speech-to-text.
//!
//! Every record gets its own scratch files under the work directory; the
//! files are removed when the handle is dropped, so a failure anywhere in
//! the stage cannot strand downloads on disk.

pub mod acquire;
pub mod commands;

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::Result;
use crate::model::ContentRecord;

pub use acquire::MediaAcquirer;
pub use commands::{MediaCommand, MediaCommandBuilder};

/// Collaborator that produces a local audio file for a record.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Download the record's video and extract its audio track. The returned
    /// handle owns the scratch files.
    async fn fetch_audio(&self, record: &ContentRecord) -> Result<AudioHandle>;
}

/// Scratch files for one record. Dropping the handle removes them.
#[derive(Debug)]
pub struct AudioHandle {
    pub audio_path: PathBuf,
    video_path: Option<PathBuf>,
}

impl AudioHandle {
    pub fn new(audio_path: PathBuf, video_path: Option<PathBuf>) -> Self {
        Self {
            audio_path,
            video_path,
        }
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        for path in std::iter::once(&self.audio_path).chain(self.video_path.iter()) {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
                } else {
                    debug!(path = %path.display(), "Removed scratch file");
                }
            }
        }
    }
}

/// Layout of the scratch directory: `videos/` and `audio/` subdirectories
/// with uuid file names, so concurrent runs never collide.
pub struct ScratchWorkspace {
    videos_dir: PathBuf,
    audio_dir: PathBuf,
}

impl ScratchWorkspace {
    pub fn create(work_dir: &Path) -> Result<Self> {
        let videos_dir = work_dir.join("videos");
        let audio_dir = work_dir.join("audio");
        std::fs::create_dir_all(&videos_dir)?;
        std::fs::create_dir_all(&audio_dir)?;
        Ok(Self {
            videos_dir,
            audio_dir,
        })
    }

    pub fn video_path(&self) -> PathBuf {
        self.videos_dir.join(format!("{}.mp4", Uuid::new_v4()))
    }

    pub fn audio_path(&self) -> PathBuf {
        self.audio_dir.join(format!("{}.mp3", Uuid::new_v4()))
    }

    /// Remove scratch files older than `max_age`, left behind by crashed
    /// runs. Files owned by live handles are younger than any sane cutoff.
    pub fn sweep_stale(&self, max_age: Duration) -> Result<usize> {
        let cutoff = SystemTime::now() - max_age;
        let mut removed = 0;

        for dir in [&self.videos_dir, &self.audio_dir] {
            for entry in WalkDir::new(dir).min_depth(1).into_iter().flatten() {
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) else {
                    continue;
                };
                if modified < cutoff {
                    if std::fs::remove_file(entry.path()).is_ok() {
                        debug!(path = %entry.path().display(), "Swept stale scratch file");
                        removed += 1;
                    }
                }
            }
        }

        Ok(removed)
    }
}
