//! Inline keyword tokens embedded in comment and subject text.
//!
//! Three independent patterns are recognized anywhere in a message:
//! `$<n>h` (estimated hours), `!<n>h` (hours to record) and `%<n>` (percent
//! done). Only the first match of each kind is honored.

use regex::{Captures, Regex};

const ESTIMATE_PATTERN: &str = r"\$([0-9.]+)h";
const RECORD_PATTERN: &str = r"!([0-9.]+)h";
const PERCENT_PATTERN: &str = r"%([0-9]+)";
const MAX_PERCENT_DIGITS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Keyword values found in one message; absent kinds are `None`.
pub struct KeywordTokens {
    pub estimate: Option<f64>,
    pub record: Option<f64>,
    pub percent: Option<u8>,
}

impl KeywordTokens {
    pub fn is_empty(&self) -> bool {
        self.estimate.is_none() && self.record.is_none() && self.percent.is_none()
    }
}

fn first_capture<'t>(pattern: &str, text: &'t str) -> Option<Captures<'t>> {
    Regex::new(pattern).ok()?.captures(text)
}

fn parse_hours(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Rounds a percentage to the nearest multiple of ten, halves rounding up.
pub fn round_percent(raw: u32) -> u8 {
    let clamped = raw.min(100);
    (((clamped + 5) / 10) * 10) as u8
}

fn first_hours(pattern: &str, text: &str) -> Option<f64> {
    let captures = first_capture(pattern, text)?;
    parse_hours(captures.get(1)?.as_str())
}

/// First `%<1-3 digits>` token whose value is at most 100; leading zeros allowed.
fn first_percent(text: &str) -> Option<u8> {
    let pattern = Regex::new(PERCENT_PATTERN).ok()?;
    let percent = pattern
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|digits| digits.as_str())
        .filter(|digits| digits.len() <= MAX_PERCENT_DIGITS)
        .filter_map(|digits| digits.parse::<u32>().ok())
        .find(|value| *value <= 100)
        .map(round_percent);
    percent
}

/// Scans `text` for the estimate, record and percent keywords.
pub fn extract_keywords(text: &str) -> KeywordTokens {
    KeywordTokens {
        estimate: first_hours(ESTIMATE_PATTERN, text),
        record: first_hours(RECORD_PATTERN, text),
        percent: first_percent(text),
    }
}

/// Removes the first `$<n>h` token from `text` and returns its value.
///
/// Text is returned unchanged when there is no token or its number does not parse.
pub fn strip_estimate_token(text: &str) -> (Option<f64>, String) {
    let Some(captures) = first_capture(ESTIMATE_PATTERN, text) else {
        return (None, text.to_string());
    };
    let (Some(whole), Some(number)) = (captures.get(0), captures.get(1)) else {
        return (None, text.to_string());
    };
    let Some(hours) = parse_hours(number.as_str()) else {
        return (None, text.to_string());
    };
    let mut cleaned = String::with_capacity(text.len());
    cleaned.push_str(&text[..whole.start()]);
    cleaned.push_str(&text[whole.end()..]);
    (Some(hours), cleaned)
}
