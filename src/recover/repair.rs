//! JSON repair engine — ordered strategies for loosely-structured model JSON.
//!
//! Model responses routinely truncate mid-structure when they hit the output
//! token budget. A strict parse would throw away a response that is 99%
//! complete, so repair escalates through three named strategies and stops at
//! the first one that parses:
//!
//!   1. clean-strict   — strip comments and trailing commas, strict parse
//!   2. balance-strict — append the missing quotes/values/brackets, strict parse
//!   3. permissive     — json5 parse of the balanced candidate
//!
//! The balancing heuristic assumes truncation happens at a value or
//! punctuation boundary, never mid-key-name. All stages are pure; `None`
//! means "no structured data recoverable" and the caller falls back to
//! marker-based extraction.

use serde_json::Value;

type Strategy = fn(&str) -> Option<Value>;

/// Repair stages in escalation order. First success wins.
const STAGES: &[(&str, Strategy)] = &[
    ("clean-strict", clean_strict),
    ("balance-strict", balance_strict),
    ("permissive", permissive),
];

/// Attempt to parse a JSON-like candidate, repairing as needed.
///
/// Returns `None` only after every strategy has failed.
pub fn repair(candidate: &str) -> Option<Value> {
    for (name, stage) in STAGES {
        if let Some(value) = stage(candidate) {
            log::debug!("[REPAIR] Parsed via stage '{}'", name);
            return Some(value);
        }
    }
    log::warn!(
        "[REPAIR] All stages failed ({} chars of candidate)",
        candidate.len()
    );
    None
}

fn clean_strict(candidate: &str) -> Option<Value> {
    serde_json::from_str(&clean(candidate)).ok()
}

fn balance_strict(candidate: &str) -> Option<Value> {
    serde_json::from_str(&balance(&clean(candidate))).ok()
}

fn permissive(candidate: &str) -> Option<Value> {
    json5::from_str(&balance(&clean(candidate))).ok()
}

/// Strip `//` line comments, `/*...*/` block comments, and commas that
/// immediately precede a closing `]`/`}`.
///
/// The scan is string-aware: comment markers and commas inside double-quoted
/// string values (e.g. a URL in a JS fragment) are left untouched.
pub fn clean(candidate: &str) -> String {
    let stripped = strip_comments(candidate);
    strip_trailing_commas(&stripped).trim().to_string()
}

fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push('"');
            }
            '/' if chars.peek() == Some(&'/') => {
                // line comment — drop to end of line, keep the newline
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                // block comment — drop to the closing */ or end of input
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn strip_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
            out.push('"');
            continue;
        }
        if c == ',' {
            // drop the comma when the next non-whitespace char closes a scope
            let next = input[i + 1..].chars().find(|n| !n.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Balance a truncated candidate by appending the missing punctuation.
///
/// In order: close an unterminated string (odd quote count), drop a trailing
/// comma, complete a dangling `:` or dangling key with `null`, then append
/// exactly the missing `]`s and `}`s.
pub fn balance(candidate: &str) -> String {
    let mut s = candidate.trim().to_string();
    if s.chars().filter(|&c| c == '"').count() % 2 != 0 {
        s.push('"');
    }
    while s.ends_with(',') {
        s.pop();
    }
    if s.ends_with(':') {
        s.push_str(" null");
    } else if ends_with_dangling_key(&s) {
        s.push_str(": null");
    }

    let (open_braces, close_braces, open_brackets, close_brackets) = count_delimiters(&s);
    for _ in close_brackets..open_brackets {
        s.push(']');
    }
    for _ in close_braces..open_braces {
        s.push('}');
    }
    s
}

/// A candidate ends with a dangling key when its final token is a quoted
/// string whose separator was lost to truncation: the last `:` sits before
/// the last `,`/`{`/`[`, so the string opens an entry rather than closing one.
fn ends_with_dangling_key(s: &str) -> bool {
    if !s.ends_with('"') || s.len() < 2 {
        return false;
    }
    // the closing quote must terminate a non-empty string
    let body = &s[..s.len() - 1];
    let open = match body.rfind('"') {
        Some(i) if i + 1 < body.len() => i,
        _ => return false,
    };
    let last_colon = s[..open].rfind(':').map(|i| i as isize).unwrap_or(-1);
    let last_opener = [',', '{', '[']
        .iter()
        .filter_map(|&c| s[..open].rfind(c))
        .max()
        .map(|i| i as isize)
        .unwrap_or(-1);
    last_opener > last_colon
}

/// Count structural delimiters outside string literals.
fn count_delimiters(s: &str) -> (usize, usize, usize, usize) {
    let (mut ob, mut cb, mut ok, mut ck) = (0, 0, 0, 0);
    let mut in_string = false;
    let mut escaped = false;
    for c in s.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => ob += 1,
            '}' => cb += 1,
            '[' => ok += 1,
            ']' => ck += 1,
            _ => {}
        }
    }
    (ob, cb, ok, ck)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_json_passes_first_stage() {
        let v = repair(r#"{"html": "<div></div>", "css": "", "js": "init();"}"#).unwrap();
        assert_eq!(v["html"], "<div></div>");
    }

    #[test]
    fn clean_strips_comments_and_trailing_commas() {
        let input = "{\n// a comment\n\"a\": 1, /* block */ \"b\": [1, 2,],\n}";
        let v = repair(input).unwrap();
        assert_eq!(v["a"], 1);
        assert_eq!(v["b"], serde_json::json!([1, 2]));
    }

    #[test]
    fn clean_leaves_slashes_inside_strings_alone() {
        let v = repair(r#"{"url": "https://example.com/a"}"#).unwrap();
        assert_eq!(v["url"], "https://example.com/a");
    }

    #[test]
    fn balance_appends_exactly_the_missing_braces() {
        let truncated = r#"{"a": {"b": {"c": 1"#;
        let balanced = balance(truncated);
        assert!(balanced.ends_with("}}}"));
        assert_eq!(balanced.matches('}').count(), 3);
        let v = repair(truncated).unwrap();
        assert_eq!(v["a"]["b"]["c"], 1);
    }

    #[test]
    fn balance_closes_unterminated_string() {
        let v = repair(r#"{"html": "<div>hello"#).unwrap();
        assert_eq!(v["html"], "<div>hello");
    }

    #[test]
    fn balance_completes_dangling_colon_with_null() {
        let v = repair(r#"{"html": "<div></div>", "css":"#).unwrap();
        assert_eq!(v["css"], Value::Null);
    }

    #[test]
    fn balance_completes_dangling_key_with_null() {
        let v = repair(r#"{"html": "<div></div>", "css""#).unwrap();
        assert_eq!(v["css"], Value::Null);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_count() {
        let v = repair(r#"{"js": "function f() { return {}; }""#).unwrap();
        assert_eq!(v["js"], "function f() { return {}; }");
    }

    #[test]
    fn permissive_stage_accepts_single_quotes() {
        let v = repair("{'html': '<div></div>', 'css': ''}").unwrap();
        assert_eq!(v["html"], "<div></div>");
    }

    #[test]
    fn hopeless_input_returns_none() {
        assert!(repair("not anything like json").is_none());
    }
}
