// Language classification for title + description text

use serde::{Deserialize, Serialize};

use super::models::LanguageCode;

/// Thresholds below which the classifier answers "unknown"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum number of alphabetic characters in the text
    pub min_alphabetic_chars: usize,
    /// Minimum whatlang confidence (0.0 - 1.0)
    pub min_confidence: f64,
    /// Only accept detections whatlang itself marks as reliable
    pub require_reliable: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_alphabetic_chars: 8,
            min_confidence: 0.0,
            require_reliable: true,
        }
    }
}

/// Stateless language detector backed by whatlang.
///
/// Returns ISO 639-3 codes ("eng", "deu", ...). Short, digit-only or
/// ambiguous input yields "unknown" instead of a low-confidence guess.
#[derive(Debug, Clone, Default)]
pub struct LanguageClassifier {
    config: ClassifierConfig,
}

impl LanguageClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, text: &str) -> LanguageCode {
        let alphabetic = text.chars().filter(|c| c.is_alphabetic()).count();
        if alphabetic < self.config.min_alphabetic_chars {
            return LanguageCode::unknown();
        }

        match whatlang::detect(text) {
            Some(info)
                if info.confidence() >= self.config.min_confidence
                    && (info.is_reliable() || !self.config.require_reliable) =>
            {
                LanguageCode::new(info.lang().code())
            }
            _ => LanguageCode::unknown(),
        }
    }

    /// Classify the concatenation of a title and a description
    pub fn classify_fields(&self, title: &str, description: &str) -> LanguageCode {
        let text = match (title.trim(), description.trim()) {
            (t, "") => t.to_string(),
            ("", d) => d.to_string(),
            (t, d) => format!("{}\n{}", t, d),
        };
        self.classify(&text)
    }
}
