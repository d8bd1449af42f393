//! Best-effort repair of structured LLM output.
//!
//! Models wrap JSON in markdown fences, prepend prose, or truncate mid-object
//! when they hit a token limit. This module recovers the common cases:
//! fence stripping, leading-text skipping, and trimming a truncated tail back
//! to the last parseable prefix. Repair is bounded; callers that still
//! cannot parse classify the output as malformed rather than looping.

use serde_json::Value;

/// Upper bound on truncation-repair attempts per input.
const MAX_REPAIR_ATTEMPTS: usize = 100;

/// Parse possibly-messy model output into a JSON value.
///
/// Tries, in order: direct parse, fence-stripped parse, and a
/// truncation-repaired parse of the first JSON object/array found.
pub fn parse_lenient(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let unfenced = strip_code_fences(trimmed);
    if let Ok(value) = serde_json::from_str(unfenced.trim()) {
        return Some(value);
    }

    let candidate = extract_json_span(unfenced.trim())?;
    if let Ok(value) = serde_json::from_str(&candidate) {
        return Some(value);
    }
    repair_truncated(&candidate)
}

/// Remove a surrounding markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let after_open = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return trimmed.to_string(),
    };
    match after_open.rfind("```") {
        Some(idx) => after_open[..idx].trim().to_string(),
        None => after_open.trim().to_string(),
    }
}

/// Slice from the first `{` or `[` to the end, skipping any leading prose.
fn extract_json_span(text: &str) -> Option<String> {
    let start = text.find(['{', '['])?;
    Some(text[start..].to_string())
}

/// Byte offsets (just past a character) at which the prefix is a structurally
/// clean place to cut: after container opens/closes, closed strings, commas,
/// and bare value characters, never inside a string.
fn cut_points(text: &str) -> Vec<usize> {
    let mut cuts = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        let end = i + ch.len_utf8();
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
                cuts.push(end);
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c.is_whitespace() => {}
            _ => cuts.push(end),
        }
    }
    cuts
}

/// Close any containers left open by the prefix.
fn close_open_containers(prefix: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for ch in prefix.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }
    let mut out = prefix.to_string();
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// Walk cut points from the end, trimming dangling separators and closing
/// open containers, until a prefix parses. Bounded by
/// [`MAX_REPAIR_ATTEMPTS`].
fn repair_truncated(text: &str) -> Option<Value> {
    let cuts = cut_points(text);
    for &cut in cuts.iter().rev().take(MAX_REPAIR_ATTEMPTS) {
        let mut prefix = text[..cut].trim_end().to_string();
        while prefix.ends_with(',') || prefix.ends_with(':') {
            prefix.pop();
            prefix.truncate(prefix.trim_end().len());
        }
        if prefix.is_empty() {
            continue;
        }
        let repaired = close_open_containers(&prefix);
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            return Some(value);
        }
    }
    None
}
