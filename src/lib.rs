//! labgen — lesson metadata to interactive HTML experiment pages.
//!
//! The operator supplies lesson records (JSON produced from a spreadsheet),
//! an HTML template, and a prompt-constraints file; labgen asks Gemini for
//! `{html, css, js}` fragments per lesson, recovers them from whatever the
//! model actually returned, validates them, and writes one templated page
//! per lesson.
//!
//! Domains:
//!   - lesson   — records + JSON ingestion
//!   - llm      — provider boundary (Gemini client, prompts)
//!   - recover  — response extraction, JSON repair, sanitizing, validation
//!   - generate — orchestration, template assembly, refine pass

pub mod generate;
pub mod lesson;
pub mod llm;
pub mod recover;
