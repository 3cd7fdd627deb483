// yt-dlp --dump-json parsing and timestamp normalization

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::enricher::errors::FetchError;
use crate::enricher::models::VideoMetadata;

/// Parse the stdout of `yt-dlp --dump-json` for a single item
pub fn parse_metadata(stdout: &[u8]) -> Result<VideoMetadata, FetchError> {
    let text = String::from_utf8_lossy(stdout);
    let mut documents = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let first = documents
        .next()
        .ok_or_else(|| FetchError::transient("yt-dlp produced no output"))?;
    if documents.next().is_some() {
        return Err(FetchError::unsupported(
            "URL expands to multiple items (playlist or channel)",
        ));
    }

    let json: Value = serde_json::from_str(first)
        .map_err(|e| FetchError::transient(format!("Invalid JSON from yt-dlp: {}", e)))?;

    if json["_type"].as_str() == Some("playlist") {
        return Err(FetchError::unsupported("Playlists are not supported"));
    }

    Ok(VideoMetadata {
        id: string_field(&json, "id"),
        title: string_field(&json, "title"),
        description: string_field(&json, "description"),
        uploader: string_field(&json, "uploader"),
        webpage_url: string_field(&json, "webpage_url"),
        published_at: published_at(&json),
        duration_seconds: json["duration"].as_f64().filter(|d| *d >= 0.0),
        is_live: json["is_live"].as_bool().unwrap_or(false),
    })
}

/// Missing or null strings become empty strings
fn string_field(json: &Value, key: &str) -> String {
    json[key].as_str().unwrap_or("").trim().to_string()
}

/// Best publish timestamp: `timestamp`, then `release_timestamp`,
/// then `upload_date`, then `release_date`
fn published_at(json: &Value) -> Option<OffsetDateTime> {
    ["timestamp", "release_timestamp", "upload_date", "release_date"]
        .iter()
        .find_map(|key| value_to_datetime(&json[*key]))
}

fn value_to_datetime(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok()),
        Value::String(s) => normalize_timestamp(s),
        _ => None,
    }
}

/// Normalize a timestamp string to UTC.
///
/// Accepts `YYYYMMDD` (any 8-digit string is read as a date), `YYYY-MM-DD`,
/// RFC 3339 with any offset, and unix seconds.
pub fn normalize_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return Date::parse(raw, format_description!("[year][month][day]"))
            .ok()
            .map(|d| d.midnight().assume_utc());
    }

    if let Ok(date) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Some(date.midnight().assume_utc());
    }

    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(dt.to_offset(UtcOffset::UTC));
    }

    raw.parse::<i64>()
        .ok()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
}
