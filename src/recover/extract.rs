//! Response extractor — raw model text to `RecoveredFragments`.
//!
//! Candidate selection is explicit scanning, in priority order:
//!   1. a fenced block (```json or bare ```) containing a `{...}` span
//!   2. the first `{` through the last fence delimiter after it (or end)
//!   3. no `{` at all → empty fragments (explicit failure signal)
//!
//! The candidate goes through the repair engine; when every repair stage
//! fails, marker-based extraction scans for the literal `"html":` / `"css":`
//! / `"js":` labels instead. Extraction never raises — callers always get a
//! usable value.

use super::repair;
use super::sanitize::{sanitize, FragmentKind};
use super::RecoveredFragments;
use serde_json::Value;

/// Recover `{html, css, js}` from raw model output.
pub fn extract(raw_text: &str) -> RecoveredFragments {
    let candidate = match json_candidate(raw_text) {
        Some(c) => c,
        None => {
            log::warn!("[EXTRACT] No '{{' anywhere in response — returning empty fragments");
            return RecoveredFragments::default();
        }
    };

    if let Some(Value::Object(map)) = repair::repair(&candidate) {
        let field = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        return RecoveredFragments {
            html: sanitize(&field("html"), FragmentKind::Html),
            css: sanitize(&field("css"), FragmentKind::Css),
            js: sanitize(&field("js"), FragmentKind::Js),
        };
    }

    log::warn!("[EXTRACT] Structured parse failed — falling back to marker scan");
    marker_extract(raw_text)
}

/// Extract any JSON object from raw model output (fence-aware, repaired).
///
/// Used by the blueprint flow, where the object shape is model-defined.
pub fn extract_object(raw_text: &str) -> Option<Value> {
    let candidate = json_candidate(raw_text)?;
    match repair::repair(&candidate) {
        Some(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Select the JSON candidate substring from raw text.
fn json_candidate(text: &str) -> Option<String> {
    if let Some(span) = fenced_json_span(text) {
        return Some(span);
    }
    let start = text.find('{')?;
    // last fence delimiter after the opening brace, else end of text
    let end = match text.rfind("```") {
        Some(i) if i > start => i,
        _ => text.len(),
    };
    Some(text[start..end].to_string())
}

/// The `{...}` span inside the first json-tagged (or untagged) fenced block.
fn fenced_json_span(text: &str) -> Option<String> {
    let mut from = 0;
    while let Some(rel) = text[from..].find("```") {
        let open = from + rel;
        let after_ticks = open + 3;
        let line_end = after_ticks + text[after_ticks..].find('\n')?;
        let tag = text[after_ticks..line_end].trim();
        let close = text[line_end..]
            .find("```")
            .map(|i| line_end + i)
            .unwrap_or(text.len());
        if tag.is_empty() || tag.eq_ignore_ascii_case("json") {
            let body = &text[line_end..close];
            if let Some(brace) = body.find('{') {
                let last_brace = body.rfind('}').map(|i| i + 1).unwrap_or(body.len());
                if last_brace > brace {
                    return Some(body[brace..last_brace].to_string());
                }
                return Some(body[brace..].to_string());
            }
        }
        from = close + 3;
        if from >= text.len() {
            break;
        }
    }
    None
}

/// Field labels scanned, in sequence, by the fallback extractor.
const MARKERS: [(&str, FragmentKind); 3] = [
    ("\"html\":", FragmentKind::Html),
    ("\"css\":", FragmentKind::Css),
    ("\"js\":", FragmentKind::Js),
];

/// Marker-based fallback: take the text between consecutive field labels.
/// Returns whatever substrings it can find, possibly empty.
fn marker_extract(text: &str) -> RecoveredFragments {
    let mut fragments = RecoveredFragments::default();
    let mut cursor = 0;
    for (idx, (label, kind)) in MARKERS.iter().enumerate() {
        let at = match text[cursor..].find(label) {
            Some(i) => cursor + i,
            None => continue,
        };
        let value_start = at + label.len();
        // value runs to the next label in sequence, or end of text
        let value_end = MARKERS[idx + 1..]
            .iter()
            .filter_map(|(next, _)| text[value_start..].find(next))
            .min()
            .map(|i| value_start + i)
            .unwrap_or(text.len());
        let raw_value = strip_residue(&text[value_start..value_end]);
        let cleaned = sanitize(&raw_value, *kind);
        match kind {
            FragmentKind::Html => fragments.html = cleaned,
            FragmentKind::Css => fragments.css = cleaned,
            FragmentKind::Js => fragments.js = cleaned,
        }
        cursor = value_end;
    }
    if fragments.is_empty() {
        log::warn!("[EXTRACT] Marker scan found nothing either");
    }
    fragments
}

/// Strip quote-and-comma residue around a marker-scanned value: trailing
/// fence ticks, the closing `"`/`,`/`}` run that ends a JSON entry, and the
/// surrounding quotes themselves.
fn strip_residue(raw: &str) -> String {
    let mut s = raw.trim();
    while let Some(r) = s.strip_suffix("```") {
        s = r.trim_end();
    }
    // peel `}`/`,` only when a closing quote is underneath — a truncated
    // value keeps its trailing code braces
    let bytes = s.as_bytes();
    let mut end = s.len();
    while end > 0 && matches!(bytes[end - 1], b'}' | b',' | b' ' | b'\t' | b'\n' | b'\r') {
        end -= 1;
    }
    if end > 0 && bytes[end - 1] == b'"' {
        s = &s[..end];
    }
    let s = s.trim();
    let s = s.strip_prefix('"').unwrap_or(s);
    let s = s.strip_suffix('"').unwrap_or(s);
    s.trim().to_string()
}
