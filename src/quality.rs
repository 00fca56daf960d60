//! Heuristic quality classification for transcripts.
//!
//! Speech-to-text on short social videos regularly hallucinates subtitle
//! credits, subscribe prompts, and countdown filler instead of transcribing
//! speech. The classifier is a pure function over a fixed phrase table so it
//! can be unit-tested without any service calls.

use serde::{Deserialize, Serialize};

/// Why a transcript was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    CannedPhrase,
    TooShort,
}

/// Verdict of the quality classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Accepted,
    Rejected(RejectReason),
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Classification::Accepted)
    }
}

/// Minimum character count for a transcript to count as genuine speech.
const MIN_TRANSCRIPT_CHARS: usize = 10;

/// Canned phrases below this length trigger the alternate-prompt retry in the
/// transcription stage; longer texts containing a phrase are still rejected
/// but not retried with different parameters.
const SHORT_PHRASE_CHARS: usize = 100;

/// Known placeholder phrases indicating a transcript is not genuine content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseTable {
    pub phrases: Vec<String>,
}

impl Default for PhraseTable {
    fn default() -> Self {
        let phrases = [
            // Subtitle credits the model reads off the video overlay.
            "Субтитры делал",
            "Субтитры сделал",
            "Субтитры добавил",
            "Субтитры подготовил",
            "Спасибо за субтитры",
            "Редактор субтитров",
            // Outro filler.
            "ПОДПИШИСЬ",
            "С вами был",
            "Спасибо за просмотр",
            "Благодарю за просмотр",
            // Countdown and beat filler on music-only clips.
            "Один, два, три",
            "Фристайлер",
            // Model non-answers from the enhancement service.
            "the provided text contains nothing to improve",
            "нечего улучшать",
        ];
        Self {
            phrases: phrases.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PhraseTable {
    /// The raw phrase list, for store-side substring selection.
    pub fn patterns(&self) -> &[String] {
        &self.phrases
    }

    /// True when the text contains any known placeholder phrase.
    pub fn matches(&self, text: &str) -> bool {
        self.phrases.iter().any(|phrase| text.contains(phrase.as_str()))
    }

    /// Classify a transcript. Total and deterministic; rules run in order:
    /// empty, canned phrase, length floor.
    pub fn classify(&self, text: &str) -> Classification {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Classification::Rejected(RejectReason::Empty);
        }
        if self.matches(trimmed) {
            return Classification::Rejected(RejectReason::CannedPhrase);
        }
        if trimmed.chars().count() < MIN_TRANSCRIPT_CHARS {
            return Classification::Rejected(RejectReason::TooShort);
        }
        Classification::Accepted
    }

    /// A short canned phrase: the degenerate case worth one retry with a more
    /// generic prompt and higher temperature.
    pub fn is_short_canned_phrase(&self, text: &str) -> bool {
        self.matches(text) && text.chars().count() < SHORT_PHRASE_CHARS
    }
}
