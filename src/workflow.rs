//! Transcription batch orchestrator.
//!
//! Pulls records lacking a usable transcript and runs each through
//! download, audio extraction, speech-to-text and enhancement. The loop is
//! fault-tolerant per record: one failure is logged and tallied, never
//! propagated, so a batch always runs to the end.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::enhance::{CompletionClient, TranscriptEnhancer};
use crate::error::Result;
use crate::media::AudioSource;
use crate::model::{ContentRecord, TranscriptStatus, TranscriptionSelection};
use crate::quality::PhraseTable;
use crate::store::ContentStore;
use crate::transcribe::{SpeechToText, TranscriptionStage};

/// Tallies for one transcription batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub completed: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub errors: usize,
}

pub struct TranscriptionOrchestrator<'a> {
    store: &'a dyn ContentStore,
    audio: &'a dyn AudioSource,
    engine: &'a dyn SpeechToText,
    completions: &'a dyn CompletionClient,
    config: &'a Config,
    phrases: PhraseTable,
}

impl<'a> TranscriptionOrchestrator<'a> {
    pub fn new(
        store: &'a dyn ContentStore,
        audio: &'a dyn AudioSource,
        engine: &'a dyn SpeechToText,
        completions: &'a dyn CompletionClient,
        config: &'a Config,
    ) -> Self {
        Self {
            store,
            audio,
            engine,
            completions,
            config,
            phrases: PhraseTable::default(),
        }
    }

    /// A stored transcript that still passes classification is never
    /// replaced; selection patterns can over-match, so this is re-checked
    /// here rather than trusted.
    fn has_usable_transcript(&self, record: &ContentRecord) -> bool {
        record
            .transcript
            .as_deref()
            .map(|t| self.phrases.classify(t).is_accepted())
            .unwrap_or(false)
    }

    async fn process_record(&self, record: &ContentRecord) -> Result<TranscriptStatus> {
        let handle = self.audio.fetch_audio(record).await?;

        let stage = TranscriptionStage::new(
            self.engine,
            &self.config.transcribe,
            &self.config.retry,
            &self.phrases,
        );
        let outcome = stage.run(&handle.audio_path).await?;

        let (text, status) = if outcome.accepted {
            let enhancer =
                TranscriptEnhancer::new(self.completions, &self.config.enhance, &self.phrases);
            let text = enhancer.enhance(&outcome.text).await;
            (text, TranscriptStatus::Completed)
        } else {
            // Best-effort text is still persisted; reruns will select it
            // again through the canned-phrase patterns.
            (outcome.text, TranscriptStatus::Rejected)
        };

        self.store
            .update_transcript(&record.content_url, &text, status)
            .await?;
        Ok(status)
    }

    pub async fn run_batch(
        &self,
        selection: &TranscriptionSelection,
        limit: u32,
    ) -> Result<BatchReport> {
        let records = self
            .store
            .select_pending_transcription(selection, self.phrases.patterns(), limit)
            .await?;
        info!(
            project_id = selection.project_id,
            count = records.len(),
            "Selected records for transcription"
        );

        let mut report = BatchReport::default();
        for (i, record) in records.iter().enumerate() {
            if self.has_usable_transcript(record) {
                debug!(url = %record.content_url, "Transcript already usable, skipping");
                report.skipped += 1;
                continue;
            }

            match self.process_record(record).await {
                Ok(TranscriptStatus::Completed) => {
                    info!(url = %record.content_url, "Transcript completed");
                    report.processed += 1;
                    report.completed += 1;
                }
                Ok(status) => {
                    info!(url = %record.content_url, status = status.as_str(), "Transcript rejected");
                    report.processed += 1;
                    report.rejected += 1;
                }
                Err(e) => {
                    warn!(url = %record.content_url, error = %e, "Record failed, continuing batch");
                    report.errors += 1;
                }
            }

            if i + 1 < records.len() {
                tokio::time::sleep(self.config.retry.pause()).await;
            }
        }

        info!(
            processed = report.processed,
            completed = report.completed,
            rejected = report.rejected,
            skipped = report.skipped,
            errors = report.errors,
            "Transcription batch finished"
        );
        Ok(report)
    }
}
