//! Tolerant parsing of model replies.
//!
//! Order: strip markdown fences, strict JSON, first `{...}` block, regex field
//! extraction, then a default `N` verdict carrying a preview of the raw text.
//! A present-but-malformed reply never produces an error.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use super::types::{Classification, Verdict};
use crate::util::truncate_chars;

const REGEX_REASON_PREVIEW: usize = 300;
const UNPARSED_PREVIEW: usize = 200;

lazy_static! {
    static ref FENCE_RE: Regex = Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").unwrap();
    static ref OBJECT_RE: Regex = Regex::new(r"\{[\s\S]*\}").unwrap();
    static ref RESULT_RE: Regex = Regex::new(r#"(?i)["\s]*result["\s]*:\s*["\s]*(Y|N)"#).unwrap();
    static ref REASON_RE: Regex = Regex::new(r#"(?i)["\s]*reason["\s]*:\s*["\s]*([^"]+)"#).unwrap();
}

/// Removes a surrounding ```json ... ``` fence if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match FENCE_RE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => trimmed,
    }
}

/// Parses a JSON object from a reply, tolerating fences and surrounding prose.
pub fn extract_json_object(raw: &str) -> Option<Map<String, Value>> {
    let cleaned = strip_code_fence(raw);
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(cleaned) {
        return Some(map);
    }
    let candidate = OBJECT_RE.find(cleaned)?;
    match serde_json::from_str::<Value>(candidate.as_str()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

pub fn parse_verdict(raw: &str, reason_limit: usize) -> Classification {
    if let Some(map) = extract_json_object(raw) {
        if map.contains_key("result") {
            return from_object(&map, reason_limit);
        }
    }

    let result = RESULT_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_uppercase());
    let reason = REASON_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    if result.is_some() || reason.is_some() {
        let verdict = match result.as_deref() {
            Some("Y") => Verdict::Yes,
            _ => Verdict::No,
        };
        let reason =
            reason.unwrap_or_else(|| truncate_chars(raw.trim(), REGEX_REASON_PREVIEW));
        return Classification {
            result: verdict,
            reason: truncate_chars(&reason, reason_limit),
            confidence: None,
        };
    }

    Classification {
        result: Verdict::No,
        reason: format!(
            "AI response could not be parsed, raw response: {}",
            truncate_chars(raw.trim(), UNPARSED_PREVIEW)
        ),
        confidence: None,
    }
}

fn from_object(map: &Map<String, Value>, reason_limit: usize) -> Classification {
    let verdict = match map.get("result").and_then(Value::as_str).map(str::trim) {
        Some(r) if r.eq_ignore_ascii_case("y") => Verdict::Yes,
        _ => Verdict::No,
    };
    let reason = map
        .get("reason")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("No reason given");
    let confidence = map.get("confidence").and_then(Value::as_f64);

    Classification {
        result: verdict,
        reason: truncate_chars(reason, reason_limit),
        confidence,
    }
}
