//! Template assembler — placeholder substitution into the output document.
//!
//! Six fixed tokens, replaced in a single pass over the template: token-shaped
//! text arriving inside a fragment value is never re-substituted. No escaping
//! is performed; fragment content is inserted verbatim.

use crate::lesson::LessonRecord;
use crate::recover::RecoveredFragments;

/// Longest summary inserted into the page header.
const SUMMARY_MAX_CHARS: usize = 200;

/// Substitute the six placeholder tokens. Unmatched tokens are left verbatim.
pub fn assemble(
    template: &str,
    record: &LessonRecord,
    fragments: &RecoveredFragments,
) -> String {
    let summary = truncate_chars(&record.content_summary, SUMMARY_MAX_CHARS);
    let replacements: [(&str, &str); 6] = [
        ("{{CHAPTER_TITLE}}", record.chapter.as_str()),
        ("{{LESSON_TITLE}}", record.lesson_title.as_str()),
        ("{{CONTENT_SUMMARY}}", summary.as_str()),
        ("{{HTML_CONTENT}}", fragments.html.as_str()),
        ("{{CSS_CONTENT}}", fragments.css.as_str()),
        ("{{JS_CONTENT}}", fragments.js.as_str()),
    ];

    // single pass: scan the template left to right, substituting the earliest
    // token each time — substituted values are never rescanned
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let next = replacements
            .iter()
            .filter_map(|(token, value)| rest.find(token).map(|i| (i, *token, *value)))
            .min_by_key(|(i, _, _)| *i);
        match next {
            Some((i, token, value)) => {
                out.push_str(&rest[..i]);
                out.push_str(value);
                rest = &rest[i + token.len()..];
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }
    out
}

/// First `max` characters, never splitting a multibyte char.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
