//! Prompt builders — the contract between labgen and the model.
//!
//! The single-call prompt asks for one JSON object `{"html","css","js"}`;
//! the blueprint prompts drive the historical multi-call flow. Both embed
//! the operator's constraints text, loaded from the selected prompt file.

use crate::lesson::LessonRecord;
use std::path::Path;

/// Constraints used when no prompt file is configured or readable.
pub const DEFAULT_CONSTRAINTS: &str =
    "Requirements: HTML5, Tailwind CSS utility classes, ES6+ JavaScript.";

/// Load the operator's constraints text.
///
/// Lines containing a `$` are dropped (the prompt files use `$`-prefixed
/// lines for operator-only notes). A missing or empty file falls back to
/// the built-in default.
pub fn load_constraints(path: Option<&Path>) -> String {
    let path = match path {
        Some(p) => p,
        None => {
            log::info!("[PROMPT] No constraints file configured — using defaults");
            return DEFAULT_CONSTRAINTS.to_string();
        }
    };
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("[PROMPT] Cannot read {}: {} — using defaults", path.display(), e);
            return DEFAULT_CONSTRAINTS.to_string();
        }
    };
    let filtered: Vec<&str> = content.lines().filter(|line| !line.contains('$')).collect();
    let constraints = filtered.join("\n");
    if constraints.trim().is_empty() {
        return DEFAULT_CONSTRAINTS.to_string();
    }
    log::info!("[PROMPT] Loaded constraints from {}", path.display());
    constraints
}

/// Single-call prompt: one JSON object with all three fragments.
pub fn build_generation_prompt(record: &LessonRecord, constraints: &str) -> String {
    format!(
        r#"{constraints}

You are building an interactive experiment page for a lesson.

CHAPTER: {chapter}
LESSON: {lesson}
LESSON CONTENT: {summary}
EXPERIMENT TO SIMULATE: {description}

Respond with ONLY a JSON object in this exact shape — no prose, no markdown fences:
{{
  "html": "<markup for the #simulation-area interior>",
  "css": "<custom styles>",
  "js": "<simulation logic>"
}}

Rules:
1. "html" must contain only the elements inside the simulation area (divs,
   buttons, canvas...). NEVER emit <html>, <head> or <body> tags.
2. "html" must contain at least one <div>.
3. "js" must define an init() function and call it at the end.
4. NEVER use localStorage or sessionStorage.
5. Keep the code compact — a truncated response is a wasted response."#,
        constraints = constraints,
        chapter = record.chapter,
        lesson = record.lesson_title,
        summary = record.content_summary,
        description = record.experiment_description,
    )
}

/// Blueprint flow, step 1: a compact JSON architecture sketch.
pub fn build_blueprint_prompt(record: &LessonRecord) -> String {
    format!(
        r#"You are a software architect.
Task: produce a JSON blueprint for the experiment: {lesson}.
Description: {description}

IMPORTANT:
1. Be maximally token-frugal.
2. Do NOT include 'description' or 'version' fields.
3. No comments inside the JSON.

OUTPUT FORMAT (JSON only):
{{
    "dom_ids": {{ "canvas": "main-canvas", "startBtn": "btn-start" }},
    "state_vars": [ {{ "name": "isRunning", "default": false }} ],
    "functions": ["init", "update", "render"]
}}"#,
        lesson = record.lesson_title,
        description = record.experiment_description,
    )
}

/// Blueprint flow, step 2a: HTML for the simulation area.
pub fn build_html_prompt(record: &LessonRecord, blueprint: &str, constraints: &str) -> String {
    format!(
        r#"{constraints}
BLUEPRINT: {blueprint}
DESCRIPTION: {description}

Task: write the HTML for #simulation-area.
IMPORTANT:
- Return ONLY the inner div/button/canvas elements. NEVER write <html>, <head> or <body> tags.
- Use Tailwind CSS classes."#,
        constraints = constraints,
        blueprint = blueprint,
        description = record.experiment_description,
    )
}

/// Blueprint flow, step 2b: custom CSS.
pub fn build_css_prompt(blueprint: &str, constraints: &str) -> String {
    format!(
        "{constraints}\nBLUEPRINT: {blueprint}\nTask: write the custom CSS (keep it short).",
        constraints = constraints,
        blueprint = blueprint,
    )
}

/// Blueprint flow, step 3: core simulation logic.
pub fn build_js_logic_prompt(record: &LessonRecord, blueprint: &str, constraints: &str) -> String {
    format!(
        r#"{constraints}
BLUEPRINT: {blueprint}
DESCRIPTION: {description}

Task: write the CORE LOGIC JS.
Requirements:
- Compact, token-frugal code (no redundant comments).
- Declare the state and the updatePhysics function."#,
        constraints = constraints,
        blueprint = blueprint,
        description = record.experiment_description,
    )
}

/// Blueprint flow, step 4: UI wiring on top of the logic.
pub fn build_js_ui_prompt(blueprint: &str, js_logic: &str, constraints: &str) -> String {
    format!(
        r#"{constraints}
EXISTING LOGIC:
{js_logic}
BLUEPRINT: {blueprint}

Task: write the UI & EVENTS JS.
Requirements:
- IMPORTANT: keep the code SHORT so it does not get truncated.
- Prefer arrow functions.
- DOM init, render, events.
- Make sure init() is called at the end."#,
        constraints = constraints,
        js_logic = js_logic,
        blueprint = blueprint,
    )
}

/// Refine pass: improve an already-generated experiment page.
pub fn build_refine_prompt(html: &str) -> String {
    format!(
        r#"You are an educational web developer. You receive a complete HTML page
simulating a lesson experiment and improve it:

1. Fix any HTML/CSS/JS errors (unclosed tags, JS syntax, responsive layout).
2. Improve the UI: colors, layout, animation where it helps.
3. Add short explanatory content (equations, definitions) when relevant.
4. Add small interactions (tooltips, feedback on user input) where they fit.
5. Keep the code tidy and efficient.

PAGE TO IMPROVE:
{html}

NOTES:
- Return the COMPLETE HTML document (<!DOCTYPE html> ... </html>), NOTHING
  else — no preamble, no explanation, no ``` fences.
- Preserve the simulation's core structure and behaviour."#,
        html = html,
    )
}
