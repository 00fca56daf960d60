use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::{AdmissionPolicy, SourceBatch, SourceType, TranscriptionSelection};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Postgres connection string. Falls back to the DATABASE_URL
    /// environment variable.
    #[arg(long)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    InitConfig {
        /// Where to write the file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },

    /// Scrape one source and store the qualifying videos
    Ingest {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Transcribe stored records that lack a usable transcript
    Transcribe {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Ingest a source, then transcribe its pending records
    Cycle {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Debug, clap::Args)]
pub struct SourceArgs {
    /// Project the records belong to
    #[arg(long)]
    pub project_id: i64,

    /// Source kind: competitor or hashtag
    #[arg(long, value_enum)]
    pub source_type: SourceKind,

    /// Identifier of the source within the project
    #[arg(long)]
    pub source_id: i64,

    /// Account handle, #tag, bare tag, or explore-tags URL
    #[arg(long)]
    pub source: String,

    /// Minimum real view count; items without a view counter are rejected
    #[arg(long)]
    pub min_views: Option<u64>,

    /// Reject items older than this many days
    #[arg(long)]
    pub max_age_days: Option<u32>,

    /// Result limit passed to the scraping service
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, clap::Args)]
pub struct SelectionArgs {
    /// Project whose records to transcribe
    #[arg(long)]
    pub project_id: i64,

    /// Restrict to one source kind
    #[arg(long, value_enum)]
    pub source_type: Option<SourceKind>,

    /// Restrict to one source
    #[arg(long)]
    pub source_id: Option<i64>,

    /// Maximum records per batch
    #[arg(long, default_value = "50")]
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SourceKind {
    Competitor,
    Hashtag,
}

impl From<SourceKind> for SourceType {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Competitor => SourceType::Competitor,
            SourceKind::Hashtag => SourceType::Hashtag,
        }
    }
}

impl SourceArgs {
    pub fn to_batch(&self, default_limit: u32) -> SourceBatch {
        SourceBatch {
            project_id: self.project_id,
            source_type: self.source_type.into(),
            source_id: self.source_id,
            source_value: self.source.clone(),
            policy: AdmissionPolicy {
                min_views: self.min_views,
                max_age_days: self.max_age_days,
                result_limit: self.limit.unwrap_or(default_limit),
            },
        }
    }

    pub fn to_selection(&self) -> TranscriptionSelection {
        TranscriptionSelection {
            project_id: self.project_id,
            source_type: Some(self.source_type.into()),
            source_id: Some(self.source_id),
        }
    }
}

impl SelectionArgs {
    pub fn to_selection(&self) -> TranscriptionSelection {
        TranscriptionSelection {
            project_id: self.project_id,
            source_type: self.source_type.map(Into::into),
            source_id: self.source_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_args_build_a_batch_with_policy() {
        let args = Args::parse_from([
            "reelscout",
            "ingest",
            "--project-id",
            "7",
            "--source-type",
            "hashtag",
            "--source-id",
            "3",
            "--source",
            "#skincare",
            "--min-views",
            "1000",
        ]);
        let Commands::Ingest { source } = args.command else {
            panic!("expected ingest command");
        };
        let batch = source.to_batch(100);
        assert_eq!(batch.project_id, 7);
        assert_eq!(batch.source_type, SourceType::Hashtag);
        assert_eq!(batch.policy.min_views, Some(1000));
        assert_eq!(batch.policy.result_limit, 100);
    }

    #[test]
    fn transcribe_selection_defaults_to_the_whole_project() {
        let args = Args::parse_from(["reelscout", "transcribe", "--project-id", "7"]);
        let Commands::Transcribe { selection } = args.command else {
            panic!("expected transcribe command");
        };
        let selection = selection.to_selection();
        assert_eq!(selection.project_id, 7);
        assert!(selection.source_type.is_none());
        assert!(selection.source_id.is_none());
    }
}
