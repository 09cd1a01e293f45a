//! Small parsing and formatting helpers shared by handlers and views

use tracing::warn;

/// Parse a float form value; empty or invalid input yields 0.0
pub fn parse_lenient_f64(field: &str, raw: &str) -> f64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0.0;
    }
    raw.parse().unwrap_or_else(|e| {
        warn!(field, value = raw, error = %e, "error converting string to float");
        0.0
    })
}

/// Parse an integer form value; empty or invalid input yields 0
pub fn parse_lenient_i64(field: &str, raw: &str) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    raw.parse().unwrap_or_else(|e| {
        warn!(field, value = raw, error = %e, "error converting string to int");
        0
    })
}

/// Local part of an address (everything before the first `@`)
pub fn truncate_email(address: &str) -> &str {
    match address.find('@') {
        Some(at) => &address[..at],
        None => address,
    }
}

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
