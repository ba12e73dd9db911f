//! TEXT value escaping (RFC 5545 §3.3.11).
//!
//! Values are escaped once when written and unescaped once when read for
//! display. Callers must never escape text that came out of a document
//! without unescaping it first.

/// Escape backslash, comma, semicolon and newlines. Carriage returns are dropped.
pub fn escape_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            ',' => result.push_str("\\,"),
            ';' => result.push_str("\\;"),
            '\n' => result.push_str("\\n"),
            '\r' => {}
            other => result.push(other),
        }
    }
    result
}

/// Reverse [`escape_text`]. Unknown escape sequences keep the escaped character.
pub fn unescape_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => result.push('\n'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}
