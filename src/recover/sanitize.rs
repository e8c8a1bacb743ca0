//! Code sanitizer — pure text transforms applied to recovered fragments.
//!
//! The generation prompt forbids markdown fences, document wrapper tags and
//! browser storage APIs, but models emit them anyway. Sanitization strips
//! what it can before validation; `repair_js` is the one-shot auto-repair
//! applied after a failed JS validation.
//!
//! All matching here is an explicit scan: "first occurrence of the opening
//! delimiter, then the nearest occurrence of the closing one". No reliance
//! on greedy/lazy regex semantics.

use std::fmt;

/// Which fragment a piece of code is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Html,
    Css,
    Js,
}

impl FragmentKind {
    /// Fence tags accepted for this kind (e.g. ```html).
    fn fence_tags(&self) -> &'static [&'static str] {
        match self {
            FragmentKind::Html => &["html"],
            FragmentKind::Css => &["css"],
            FragmentKind::Js => &["js", "javascript"],
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentKind::Html => write!(f, "HTML"),
            FragmentKind::Css => write!(f, "CSS"),
            FragmentKind::Js => write!(f, "JS"),
        }
    }
}

/// Clean one fragment: strip a fenced-code wrapper if present, and for HTML
/// strip the document wrapper tags the prompt forbids.
pub fn sanitize(code: &str, kind: FragmentKind) -> String {
    let code = strip_code_fence(code, kind.fence_tags());
    match kind {
        FragmentKind::Html => strip_outer_html(&code),
        _ => code,
    }
}

/// If the text contains a fenced code block (bare ``` or tagged with one of
/// `tags`), return only the interior of the first such block; otherwise the
/// whole text, trimmed.
pub fn strip_code_fence(text: &str, tags: &[&str]) -> String {
    let mut from = 0;
    while let Some(rel) = text[from..].find("```") {
        let open = from + rel;
        let after_ticks = open + 3;
        // the fence tag runs to the end of the opening line
        let line_end = match text[after_ticks..].find('\n') {
            Some(i) => after_ticks + i,
            None => break,
        };
        let tag = text[after_ticks..line_end].trim();
        if tag.is_empty() || tags.iter().any(|t| tag.eq_ignore_ascii_case(t)) {
            // nearest closing fence, else end of text
            let body_start = line_end + 1;
            let body_end = text[body_start..]
                .find("```")
                .map(|i| body_start + i)
                .unwrap_or(text.len());
            return text[body_start..body_end].trim().to_string();
        }
        // differently-tagged block — skip past it and keep scanning
        from = match text[line_end..].find("```") {
            Some(i) => line_end + i + 3,
            None => break,
        };
    }
    text.trim().to_string()
}

/// Strip the `<html>`/`<head>`/`<body>` wrapper the model sometimes emits
/// despite the prompt.
///
/// Prefers the interior of the first `<body>...</body>` span; falls back to
/// the interior of `<html>...</html>`; otherwise returns the input unchanged.
pub fn strip_outer_html(html: &str) -> String {
    if let Some(inner) = tag_interior(html, "body") {
        return inner;
    }
    if let Some(inner) = tag_interior(html, "html") {
        return inner;
    }
    html.trim().to_string()
}

/// Interior of the first `<tag ...>` up to the nearest `</tag>` after it.
/// Case-insensitive; returns None when either delimiter is absent.
fn tag_interior(text: &str, tag: &str) -> Option<String> {
    let open_pat = format!("<{}", tag);
    let close_pat = format!("</{}>", tag);
    let mut from = 0;
    loop {
        let open = find_ascii_ci(text, &open_pat, from)?;
        let name_end = open + open_pat.len();
        // require a real tag, not a longer element name (<body> vs <bodyguard>)
        match text.as_bytes().get(name_end) {
            Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/') => {}
            _ => {
                from = name_end;
                continue;
            }
        }
        let gt = find_ascii_ci(text, ">", open)?;
        let close = find_ascii_ci(text, &close_pat, gt + 1)?;
        return Some(text[gt + 1..close].trim().to_string());
    }
}

/// ASCII case-insensitive substring search starting at byte `from`.
pub(crate) fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || from + n.len() > h.len() {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// One-shot JS auto-repair, invoked after a failed validation:
/// - replace call-like `localStorage.x(...)` / `sessionStorage.x(...)`
///   expressions with an inert comment
/// - if an `init` function is defined but never invoked, append `init();`
pub fn repair_js(code: &str) -> String {
    let mut out = remove_storage_calls(code);
    if defines_init(&out) && !invokes_init(&out) {
        log::info!("[SANITIZE] init() never invoked — appending call");
        out.push_str("\n\ninit();\n");
    }
    out
}

const STORAGE_OBJECTS: [&str; 2] = ["localStorage", "sessionStorage"];
const STORAGE_PLACEHOLDER: &str = "/* storage call removed */";

fn remove_storage_calls(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    loop {
        let hit = STORAGE_OBJECTS
            .iter()
            .filter_map(|obj| rest.find(obj).map(|i| (i, *obj)))
            .min_by_key(|(i, _)| *i);
        let (at, obj) = match hit {
            Some(h) => h,
            None => {
                out.push_str(rest);
                return out;
            }
        };
        match storage_call_len(&rest[at..], obj) {
            Some(len) => {
                log::info!(
                    "[SANITIZE] Removed storage call: {}",
                    &rest[at..at + len.min(60)]
                );
                out.push_str(&rest[..at]);
                out.push_str(STORAGE_PLACEHOLDER);
                rest = &rest[at + len..];
            }
            None => {
                // bare reference, not a call — leave it for the validator
                out.push_str(&rest[..at + obj.len()]);
                rest = &rest[at + obj.len()..];
            }
        }
    }
}

/// Length of a `localStorage.method(...)` expression starting at the head of
/// `text`, argument parens matched by depth with string awareness.
fn storage_call_len(text: &str, obj: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = obj.len();
    if bytes.get(i) != Some(&b'.') {
        return None;
    }
    i += 1;
    let method_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i == method_start || bytes.get(i) != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    while i < bytes.len() {
        let c = bytes[i];
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == b'\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
        } else {
            match c {
                b'\'' | b'"' | b'`' => quote = Some(c),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

fn defines_init(code: &str) -> bool {
    regex::Regex::new(r"function\s+init\s*\(")
        .map(|re| re.is_match(code))
        .unwrap_or(false)
}

fn invokes_init(code: &str) -> bool {
    let re = match regex::Regex::new(r"init\s*\(") {
        Ok(re) => re,
        Err(_) => return true,
    };
    for m in re.find_iter(code) {
        let before = &code[..m.start()];
        // skip the definition itself
        if regex::Regex::new(r"function\s+$")
            .map(|d| d.is_match(before))
            .unwrap_or(false)
        {
            continue;
        }
        // skip identifiers that merely end in "init" (myinit, obj.init is a call)
        if let Some(prev) = before.chars().last() {
            if prev.is_alphanumeric() || prev == '_' {
                continue;
            }
        }
        return true;
    }
    false
}
