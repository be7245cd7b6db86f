//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current timestamp as an RFC 3339 string, the persisted form everywhere.
pub fn rfc3339_now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Today's date compacted to `YYYYMMDD`, as used in invoice prefixes.
pub fn compact_date_today() -> String {
    chrono::Utc::now().format("%Y%m%d").to_string()
}
