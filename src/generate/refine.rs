//! Refine pass — send a generated page back to the model for improvement.
//!
//! Input is a complete HTML document, output is the improved document. The
//! model is told to return bare HTML, but replies still arrive fenced or with
//! preamble often enough that the post-processing mirrors the sanitizer:
//! strip the fence, or cut the `<!DOCTYPE html> .. </html>` span out of the
//! noise.

use super::GenerateError;
use crate::llm::{prompts, GenerationParams, PromptClient};
use crate::recover::sanitize;
use std::path::{Path, PathBuf};

/// Refine one generated page. Default output path is `<input>_refined.html`.
pub async fn refine_file<C: PromptClient>(
    client: &C,
    input: &Path,
    output: Option<&Path>,
    params: &GenerationParams,
) -> Result<PathBuf, GenerateError> {
    let html = std::fs::read_to_string(input).map_err(|e| GenerateError::Input {
        path: input.to_path_buf(),
        source: e,
    })?;
    log::info!("[REFINE] Loaded {} ({} chars)", input.display(), html.len());

    let prompt = prompts::build_refine_prompt(&html);
    let response = client
        .send_prompt(&prompt, params)
        .await
        .ok_or(GenerateError::NoResponse)?;

    let refined = extract_document(&response);
    if refined.trim().is_empty() {
        return Err(GenerateError::NoResponse);
    }

    let out_path = match output {
        Some(p) => p.to_path_buf(),
        None => default_output_path(input),
    };
    std::fs::write(&out_path, refined).map_err(|e| GenerateError::Write {
        path: out_path.clone(),
        source: e,
    })?;
    log::info!("[REFINE] Saved {}", out_path.display());
    Ok(out_path)
}

/// `<dir>/<stem>_refined.<ext>` next to the input.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("refined");
    let ext = input.extension().and_then(|s| s.to_str()).unwrap_or("html");
    input.with_file_name(format!("{}_refined.{}", stem, ext))
}

/// Recover the HTML document from a possibly-fenced, possibly-chatty reply.
fn extract_document(reply: &str) -> String {
    let text = reply.trim();
    if !text.starts_with("```") {
        return text.to_string();
    }
    // an exact ```html wrapper strips directly to its interior
    let bytes = text.as_bytes();
    if bytes.len() >= 7 && bytes[3..7].eq_ignore_ascii_case(b"html") {
        return sanitize::strip_code_fence(text, &["html"]);
    }
    // anything else fenced: cut the document span out of the raw reply
    let start = sanitize::find_ascii_ci(text, "<!DOCTYPE html>", 0)
        .or_else(|| sanitize::find_ascii_ci(text, "<html", 0));
    let end = rfind_ascii_ci(text, "</html>").map(|i| i + "</html>".len());
    match (start, end) {
        (Some(s), Some(e)) if e > s => text[s..e].to_string(),
        _ => sanitize::strip_code_fence(text, &["html"]),
    }
}

fn rfind_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let mut last = None;
    let mut from = 0;
    while let Some(i) = sanitize::find_ascii_ci(haystack, needle, from) {
        last = Some(i);
        from = i + 1;
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<!DOCTYPE html>\n<html><body><div>x</div></body></html>";

    #[test]
    fn bare_document_passes_through() {
        assert_eq!(extract_document(DOC), DOC);
    }

    #[test]
    fn html_fence_is_stripped() {
        let reply = format!("```html\n{}\n```", DOC);
        assert_eq!(extract_document(&reply), DOC);
    }

    #[test]
    fn chatty_fenced_reply_is_cut_to_the_document_span() {
        let reply = format!("```\nSure! Here is the page:\n{}\ntrailing notes\n```", DOC);
        assert_eq!(extract_document(&reply), DOC);
    }

    #[test]
    fn default_output_name_gets_the_refined_suffix() {
        assert_eq!(
            default_output_path(Path::new("out/Lesson_1.html")),
            Path::new("out/Lesson_1_refined.html")
        );
    }
}
