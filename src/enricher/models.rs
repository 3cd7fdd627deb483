// Common data models for the enrichment pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

use super::errors::{FetchError, FetchErrorKind};

/// Optional hint about what an identifier points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemHint {
    /// Regular video (default)
    Video,
    /// YouTube Shorts; bare IDs expand to a /shorts/ URL
    Short,
    /// Live stream or premiere; duration is usually absent
    Live,
}

/// One identifier submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputItem {
    pub identifier: String,
    #[serde(default)]
    pub hint: Option<ItemHint>,
}

impl InputItem {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: ItemHint) -> Self {
        self.hint = Some(hint);
        self
    }
}

impl From<&str> for InputItem {
    fn from(identifier: &str) -> Self {
        Self::new(identifier)
    }
}

impl From<String> for InputItem {
    fn from(identifier: String) -> Self {
        Self::new(identifier)
    }
}

/// Raw metadata as returned by a fetcher, before classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub uploader: String,
    pub webpage_url: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub duration_seconds: Option<f64>,
    pub is_live: bool,
}

/// Detected language: an ISO 639-3 code or "unknown"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully enriched metadata for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub video_id: String,
    pub title: String,
    /// Empty when upstream has no description
    pub description: String,
    pub uploader: String,
    pub webpage_url: String,
    /// Always UTC
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub duration_seconds: Option<f64>,
    pub language: LanguageCode,
    /// Identifier as submitted by the caller
    pub source: String,
}

impl MetadataRecord {
    pub fn from_metadata(meta: VideoMetadata, language: LanguageCode, source: &str) -> Self {
        Self {
            video_id: meta.id,
            title: meta.title,
            description: meta.description,
            uploader: meta.uploader,
            webpage_url: meta.webpage_url,
            published_at: meta.published_at,
            duration_seconds: meta.duration_seconds,
            language,
            source: source.to_string(),
        }
    }
}

/// Terminal failure for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub kind: FetchErrorKind,
    pub message: String,
    pub source: String,
    /// Adapter attempts made before giving up (0 when nothing was dispatched)
    pub attempts: u32,
}

impl FetchFailure {
    pub fn from_error(err: FetchError, source: &str, attempts: u32) -> Self {
        Self {
            kind: err.kind,
            message: err.message,
            source: source.to_string(),
            attempts,
        }
    }
}

/// Outcome of one item; exactly one per unique identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Success(MetadataRecord),
    Failure(FetchFailure),
}

impl FetchOutcome {
    pub fn failure(err: FetchError, source: &str, attempts: u32) -> Self {
        Self::Failure(FetchFailure::from_error(err, source, attempts))
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Success(record) => &record.source,
            Self::Failure(failure) => &failure.source,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn record(&self) -> Option<&MetadataRecord> {
        match self {
            Self::Success(record) => Some(record),
            Self::Failure(_) => None,
        }
    }

    pub fn error_kind(&self) -> Option<FetchErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }
}

/// Ordered outcomes of one `run` call.
///
/// `outcomes` holds one entry per unique identifier in first-seen order.
/// `submission` maps every submitted item (duplicates included) to its slot
/// in `outcomes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    outcomes: Vec<FetchOutcome>,
    submission: Vec<usize>,
}

impl ResultSet {
    pub(crate) fn new(outcomes: Vec<FetchOutcome>, submission: Vec<usize>) -> Self {
        debug_assert!(submission.iter().all(|&slot| slot < outcomes.len()));
        Self {
            outcomes,
            submission,
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[FetchOutcome] {
        &self.outcomes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FetchOutcome> {
        self.outcomes.iter()
    }

    /// One outcome per submitted item, duplicates sharing the first outcome
    pub fn per_submission(&self) -> impl Iterator<Item = &FetchOutcome> + '_ {
        self.submission.iter().map(move |&slot| &self.outcomes[slot])
    }

    /// Look up the outcome for an identifier as it was submitted
    pub fn get(&self, identifier: &str) -> Option<&FetchOutcome> {
        let identifier = identifier.trim();
        self.outcomes.iter().find(|o| o.source() == identifier)
    }

    pub fn successes(&self) -> impl Iterator<Item = &MetadataRecord> + '_ {
        self.outcomes.iter().filter_map(FetchOutcome::record)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchFailure> + '_ {
        self.outcomes.iter().filter_map(|o| match o {
            FetchOutcome::Failure(failure) => Some(failure),
            FetchOutcome::Success(_) => None,
        })
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for outcome in &self.outcomes {
            match outcome {
                FetchOutcome::Success(_) => summary.succeeded += 1,
                FetchOutcome::Failure(failure) => {
                    summary.failed += 1;
                    *summary
                        .failures_by_kind
                        .entry(failure.kind.to_string())
                        .or_default() += 1;
                }
            }
        }
        summary
    }

    pub fn into_outcomes(self) -> Vec<FetchOutcome> {
        self.outcomes
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a FetchOutcome;
    type IntoIter = std::slice::Iter<'a, FetchOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Succeeded / failed counts for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub failures_by_kind: BTreeMap<String, usize>,
}
