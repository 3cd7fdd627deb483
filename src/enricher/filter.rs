// Post-run filtering of successful records

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::models::{LanguageCode, MetadataRecord, ResultSet};

/// Criteria applied to the successful records of a `ResultSet`.
///
/// Every set field must match. Date bounds are inclusive, and a record
/// without a publication date fails any date bound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultFilter {
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_after: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_before: Option<OffsetDateTime>,
    pub language: Option<LanguageCode>,
    /// Case-insensitive substring of title or description
    pub keyword: Option<String>,
}

impl ResultFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published_after(mut self, at: OffsetDateTime) -> Self {
        self.published_after = Some(at);
        self
    }

    pub fn published_before(mut self, at: OffsetDateTime) -> Self {
        self.published_before = Some(at);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(LanguageCode::new(language));
        self
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, record: &MetadataRecord) -> bool {
        if self.published_after.is_some() || self.published_before.is_some() {
            let Some(published) = record.published_at else {
                return false;
            };
            if self.published_after.is_some_and(|after| published < after) {
                return false;
            }
            if self.published_before.is_some_and(|before| published > before) {
                return false;
            }
        }

        if let Some(language) = &self.language {
            if record.language != *language {
                return false;
            }
        }

        match self.keyword.as_deref().map(str::trim) {
            Some(keyword) if !keyword.is_empty() => {
                let needle = keyword.to_lowercase();
                record.title.to_lowercase().contains(&needle)
                    || record.description.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }

    /// Matching records in `ResultSet` order
    pub fn apply<'a>(&self, results: &'a ResultSet) -> Vec<&'a MetadataRecord> {
        results.successes().filter(|r| self.matches(r)).collect()
    }
}
