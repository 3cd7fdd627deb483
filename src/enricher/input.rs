// Identifier validation and normalization
//
// Runs on the orchestrator task before dispatch, so malformed identifiers
// never take a worker slot.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;

use super::errors::FetchError;
use super::models::{InputItem, ItemHint};

const MAX_IDENTIFIER_LEN: usize = 2048;

lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
}

/// An identifier that passed validation, ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedItem {
    /// Trimmed identifier as submitted; also the dedup key
    pub identifier: String,
    /// URL handed to the fetcher
    pub url: String,
    /// Lower-cased host of `url`
    pub host: String,
    pub hint: Option<ItemHint>,
}

/// Dedup key for an item: the identifier without surrounding whitespace
pub fn dedup_key(item: &InputItem) -> &str {
    item.identifier.trim()
}

pub fn is_youtube_host(host: &str) -> bool {
    let host = host.trim_start_matches("www.").trim_start_matches("m.");
    host == "youtube.com" || host == "youtu.be" || host.ends_with(".youtube.com")
}

pub fn is_youtube_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(is_youtube_host))
        .unwrap_or(false)
}

pub fn validate(item: &InputItem) -> Result<ValidatedItem, FetchError> {
    let identifier = dedup_key(item);

    if identifier.is_empty() {
        return Err(FetchError::invalid_input("identifier is empty"));
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(FetchError::invalid_input(format!(
            "identifier is longer than {} characters",
            MAX_IDENTIFIER_LEN
        )));
    }
    if identifier.chars().any(char::is_whitespace) {
        return Err(FetchError::invalid_input(format!(
            "identifier contains whitespace: {}",
            identifier
        )));
    }

    if VIDEO_ID_RE.is_match(identifier) {
        let url = match item.hint {
            Some(ItemHint::Short) => format!("https://www.youtube.com/shorts/{}", identifier),
            _ => format!("https://www.youtube.com/watch?v={}", identifier),
        };
        return Ok(ValidatedItem {
            identifier: identifier.to_string(),
            url,
            host: "www.youtube.com".to_string(),
            hint: item.hint,
        });
    }

    let parsed = Url::parse(identifier)
        .map_err(|e| FetchError::invalid_input(format!("not a URL or video ID ({}): {}", e, identifier)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::invalid_input(format!(
            "unsupported URL scheme '{}': {}",
            parsed.scheme(),
            identifier
        )));
    }

    let host = parsed
        .host_str()
        .filter(|h| h.contains('.') || *h == "localhost" || h.parse::<std::net::IpAddr>().is_ok())
        .ok_or_else(|| FetchError::invalid_input(format!("URL has no usable host: {}", identifier)))?
        .to_ascii_lowercase();

    Ok(ValidatedItem {
        identifier: identifier.to_string(),
        url: parsed.to_string(),
        host,
        hint: item.hint,
    })
}
