//! Code validator — independent structural checks per fragment kind.
//!
//! Runs after sanitization and never mutates its input. HTML gets a real
//! fragment parse, JS a syntax-only tree-sitter parse, CSS only a brace
//! parity check.

use super::sanitize::{find_ascii_ci, FragmentKind};
use scraper::{Html, Selector};

/// Pass/fail plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub ok: bool,
    pub reason: String,
}

impl ValidationResult {
    pub fn pass() -> Self {
        Self {
            ok: true,
            reason: "OK".to_string(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
        }
    }
}

/// Validate one fragment by kind.
pub fn validate(code: &str, kind: FragmentKind) -> ValidationResult {
    let result = match kind {
        FragmentKind::Html => validate_html(code),
        FragmentKind::Css => validate_css(code),
        FragmentKind::Js => validate_js(code),
    };
    if !result.ok {
        log::warn!("[VALIDATE] {} rejected: {}", kind, result.reason);
    }
    result
}

/// Wrapper tags the prompt forbids in an embeddable fragment.
const WRAPPER_TAGS: [&str; 3] = ["html", "head", "body"];

fn validate_html(code: &str) -> ValidationResult {
    // Wrapper detection is a tag-level scan: the HTML5 fragment algorithm
    // silently drops stray <html>/<head>/<body> tags during parsing, so a
    // post-parse query can never see them.
    for tag in WRAPPER_TAGS {
        if contains_tag(code, tag) {
            return ValidationResult::fail(format!("forbidden wrapper tag <{}>", tag));
        }
    }

    let fragment = Html::parse_fragment(code);
    let div = Selector::parse("div").expect("static selector");
    if fragment.select(&div).next().is_none() {
        return ValidationResult::fail("no content element: fragment has no <div>");
    }
    ValidationResult::pass()
}

/// True when `<tag ...>` appears as an element (not a longer name sharing the
/// prefix). Case-insensitive.
fn contains_tag(code: &str, tag: &str) -> bool {
    let pat = format!("<{}", tag);
    let mut from = 0;
    while let Some(at) = find_ascii_ci(code, &pat, from) {
        match code.as_bytes().get(at + pat.len()) {
            Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/')
            | None => return true,
            _ => from = at + pat.len(),
        }
    }
    false
}

fn validate_js(code: &str) -> ValidationResult {
    let mut parser = tree_sitter::Parser::new();
    if parser
        .set_language(&tree_sitter_javascript::LANGUAGE.into())
        .is_err()
    {
        return ValidationResult::fail("JS grammar failed to load");
    }
    let tree = match parser.parse(code, None) {
        Some(tree) => tree,
        None => return ValidationResult::fail("JS parse did not produce a tree"),
    };
    if tree.root_node().has_error() {
        let reason = match first_syntax_error(tree.root_node()) {
            Some((row, column)) => {
                format!("JS syntax error at line {}, column {}", row + 1, column + 1)
            }
            None => "JS syntax error".to_string(),
        };
        return ValidationResult::fail(reason);
    }

    for forbidden in ["localStorage", "sessionStorage"] {
        if code.contains(forbidden) {
            return ValidationResult::fail(format!("forbidden storage API: {}", forbidden));
        }
    }
    ValidationResult::pass()
}

/// Position of the first ERROR or missing node, depth-first.
fn first_syntax_error(root: tree_sitter::Node) -> Option<(usize, usize)> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let point = node.start_position();
            return Some((point.row, point.column));
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                if child.has_error() || child.is_missing() {
                    stack.push(child);
                }
            }
        }
    }
    None
}

fn validate_css(code: &str) -> ValidationResult {
    let open = code.matches('{').count();
    let close = code.matches('}').count();
    if open != close {
        return ValidationResult::fail(format!(
            "unbalanced braces: {} opening vs {} closing",
            open, close
        ));
    }
    ValidationResult::pass()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_div_fragment_passes() {
        let r = validate("<div id=\"sim\"><button>Start</button></div>", FragmentKind::Html);
        assert!(r.ok, "reason: {}", r.reason);
    }

    #[test]
    fn wrapper_body_tag_fails() {
        let r = validate("<body><div>x</div></body>", FragmentKind::Html);
        assert!(!r.ok);
        assert!(r.reason.contains("forbidden wrapper tag"));
    }

    #[test]
    fn head_element_fails_regardless_of_other_content() {
        let r = validate("<head><style></style></head><div>x</div>", FragmentKind::Html);
        assert!(!r.ok);
        assert!(r.reason.contains("<head>"));
    }

    #[test]
    fn header_element_is_not_mistaken_for_head() {
        let r = validate("<header>t</header><div>x</div>", FragmentKind::Html);
        assert!(r.ok, "reason: {}", r.reason);
    }

    #[test]
    fn fragment_without_div_fails() {
        let r = validate("<p>just a paragraph</p>", FragmentKind::Html);
        assert!(!r.ok);
        assert!(r.reason.contains("no content element"));
    }

    #[test]
    fn valid_js_passes() {
        let r = validate("function init() { let x = 1; }\ninit();", FragmentKind::Js);
        assert!(r.ok, "reason: {}", r.reason);
    }

    #[test]
    fn broken_js_fails_with_position() {
        let r = validate("function init( { ]", FragmentKind::Js);
        assert!(!r.ok);
        assert!(r.reason.contains("JS syntax error"), "reason: {}", r.reason);
    }

    #[test]
    fn storage_api_fails_even_when_syntax_is_fine() {
        let r = validate("localStorage.setItem('k', 'v');", FragmentKind::Js);
        assert!(!r.ok);
        assert_eq!(r.reason, "forbidden storage API: localStorage");
    }

    #[test]
    fn unbalanced_css_braces_fail() {
        let r = validate("body { color: red;", FragmentKind::Css);
        assert!(!r.ok);
        assert!(r.reason.contains("unbalanced braces"));
    }

    #[test]
    fn balanced_css_passes() {
        let r = validate(".sim { display: flex; } .btn { color: blue; }", FragmentKind::Css);
        assert!(r.ok);
    }

    #[test]
    fn empty_css_passes() {
        assert!(validate("", FragmentKind::Css).ok);
    }
}
