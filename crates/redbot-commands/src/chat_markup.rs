//! Chat markup helpers: link degradation, mention resolution, issue links and
//! comment quoting.

use std::collections::BTreeMap;

use regex::{Captures, Regex};

const CHAT_LINK_PATTERN: &str = r"<([^@#!<>|][^<>|]*)(?:\|([^<>]*))?>";
const MENTION_PATTERN: &str = r"<@([A-Za-z0-9]+)(?:\|[^<>]*)?>";
const CODE_FENCE_MARKER: &str = "```";
pub const UNKNOWN_MENTION: &str = "@UNKNOWN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How a `<url|label>` link is degraded to plain text.
pub enum LinkMode {
    /// Keep only the label; used for issue subjects.
    LabelOnly,
    /// Keep only the url; used for comment bodies.
    UrlOnly,
}

/// Degrades every `<url|label>` (or bare `<url>`) link in `text`.
pub fn rewrite_chat_links(text: &str, mode: LinkMode) -> String {
    let Ok(pattern) = Regex::new(CHAT_LINK_PATTERN) else {
        return text.to_string();
    };
    pattern
        .replace_all(text, |captures: &Captures<'_>| {
            let url = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            match (mode, captures.get(2)) {
                (LinkMode::LabelOnly, Some(label)) if !label.as_str().is_empty() => {
                    label.as_str().to_string()
                }
                _ => url.to_string(),
            }
        })
        .into_owned()
}

/// Replaces every `<@id>` mention with `@displayName`, or `@UNKNOWN` when the
/// id is missing from `directory`.
pub fn resolve_mentions(text: &str, directory: &BTreeMap<String, String>) -> String {
    let Ok(pattern) = Regex::new(MENTION_PATTERN) else {
        return text.to_string();
    };
    pattern
        .replace_all(text, |captures: &Captures<'_>| {
            let id = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            match directory.get(id) {
                Some(name) if !name.trim().is_empty() => format!("@{}", name.trim()),
                _ => UNKNOWN_MENTION.to_string(),
            }
        })
        .into_owned()
}

/// Returns the user id when `token` is exactly one mention token.
pub fn parse_mention_id(token: &str) -> Option<String> {
    let pattern = Regex::new(&format!("^{MENTION_PATTERN}$")).ok()?;
    let captures = pattern.captures(token.trim())?;
    captures.get(1).map(|m| m.as_str().to_string())
}

/// Mention markup for a chat user id.
pub fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

/// Escapes the characters that would break chat link markup.
pub fn escape_chat_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn issue_url(external_base: &str, issue_id: u64) -> String {
    format!("{}/issues/{issue_id}", external_base.trim_end_matches('/'))
}

pub fn issue_link(external_base: &str, issue_id: u64) -> String {
    format!("<{}|#{issue_id}>", issue_url(external_base, issue_id))
}

pub fn issue_subject_link(external_base: &str, issue_id: u64, subject: &str) -> String {
    format!(
        "<{}|#{issue_id} {}>",
        issue_url(external_base, issue_id),
        escape_chat_text(subject.trim()).replace('|', "/")
    )
}

fn is_fence_marker(line: &str) -> bool {
    line.trim_start().starts_with(CODE_FENCE_MARKER)
}

/// Prefixes each line with a quote marker, except fenced code block lines.
pub fn quote_comment(text: &str) -> String {
    let mut in_fence = false;
    let mut lines = Vec::new();
    for line in text.lines() {
        if is_fence_marker(line) {
            in_fence = !in_fence;
            lines.push(line.to_string());
        } else if in_fence {
            lines.push(line.to_string());
        } else {
            lines.push(format!("> {line}"));
        }
    }
    lines.join("\n")
}
