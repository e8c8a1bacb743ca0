//! Generation orchestrator — one lesson through the full pipeline.
//!
//! Per lesson: Pending -> Requesting -> Parsing -> Validating -> Assembling
//! -> Done | Failed. Exactly one model call in the default single-call flow;
//! the historical blueprint flow (several sequential calls) survives as an
//! alternative strategy. Failures are recovered here and reported per lesson
//! — a batch always completes, one bad lesson never stops the next.

pub mod assemble;
pub mod refine;

use crate::lesson::LessonRecord;
use crate::llm::{prompts, GenerationParams, PromptClient};
use crate::recover::{self, FragmentKind, RecoveredFragments};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to read {path}: {source}")]
    Input {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no response from the model")]
    NoResponse,
    #[error("blueprint call returned no structured data")]
    NoBlueprint,
    #[error("{kind} validation failed: {reason}")]
    Validation { kind: FragmentKind, reason: String },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// How fragments are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One call returning a `{"html","css","js"}` JSON object (default).
    SingleCall,
    /// Historical multi-call flow: blueprint, HTML, CSS, JS logic, JS UI.
    Blueprint,
}

/// What to do when JS still fails validation after one auto-repair pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsPolicy {
    /// Fail the lesson.
    Strict,
    /// Write the repaired file anyway and report the lesson as degraded.
    WriteDegraded,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub template_path: PathBuf,
    pub constraints_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub params: GenerationParams,
    pub strategy: Strategy,
    pub js_policy: JsPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonStatus {
    /// Output written, all validations clean.
    Done(PathBuf),
    /// Output written, but JS needed auto-repair (or still fails validation).
    Degraded(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonOutcome {
    pub lesson_title: String,
    pub status: LessonStatus,
}

/// Run a batch of lessons sequentially. Always returns one outcome per
/// lesson, in input order.
pub async fn run_batch<C: PromptClient>(
    client: &C,
    lessons: &[LessonRecord],
    config: &GenerationConfig,
) -> Vec<LessonOutcome> {
    // template trouble is an unrecoverable input error — every lesson is
    // reported failed before any model call is made
    let template = match std::fs::read_to_string(&config.template_path) {
        Ok(t) => t,
        Err(e) => {
            log::error!(
                "[GEN] Template {} unreadable: {}",
                config.template_path.display(),
                e
            );
            let reason = format!("template unreadable: {}", e);
            return lessons
                .iter()
                .map(|l| LessonOutcome {
                    lesson_title: l.lesson_title.clone(),
                    status: LessonStatus::Failed(reason.clone()),
                })
                .collect();
        }
    };
    let constraints = prompts::load_constraints(config.constraints_path.as_deref());

    let total = lessons.len();
    let mut outcomes = Vec::with_capacity(total);
    for (i, lesson) in lessons.iter().enumerate() {
        log::info!("[GEN] [{}/{}] {}", i + 1, total, lesson.lesson_title);
        let status = match process_lesson(client, lesson, &template, &constraints, config).await {
            Ok((path, degraded)) => {
                if degraded {
                    log::warn!("[GEN] Degraded: {}", path.display());
                    LessonStatus::Degraded(path)
                } else {
                    log::info!("[GEN] Done: {}", path.display());
                    LessonStatus::Done(path)
                }
            }
            Err(e) => {
                log::error!("[GEN] Failed '{}': {}", lesson.lesson_title, e);
                LessonStatus::Failed(e.to_string())
            }
        };
        outcomes.push(LessonOutcome {
            lesson_title: lesson.lesson_title.clone(),
            status,
        });
    }
    outcomes
}

/// One lesson through request → extract → validate → assemble → write.
///
/// The returned bool is the degraded flag: the JS fragment needed auto-repair.
pub async fn process_lesson<C: PromptClient>(
    client: &C,
    lesson: &LessonRecord,
    template: &str,
    constraints: &str,
    config: &GenerationConfig,
) -> Result<(PathBuf, bool), GenerateError> {
    let mut fragments = match config.strategy {
        Strategy::SingleCall => generate_single_call(client, lesson, constraints, config).await?,
        Strategy::Blueprint => generate_blueprint_flow(client, lesson, constraints, config).await?,
    };

    // HTML violations are fatal to the lesson
    let html_result = recover::validate(&fragments.html, FragmentKind::Html);
    if !html_result.ok {
        return Err(GenerateError::Validation {
            kind: FragmentKind::Html,
            reason: html_result.reason,
        });
    }

    // a CSS failure is worth a warning, not a dead lesson
    let css_result = recover::validate(&fragments.css, FragmentKind::Css);
    if !css_result.ok {
        log::warn!("[GEN] CSS check failed ({}), keeping lesson", css_result.reason);
    }

    // JS failures get one auto-repair pass before the policy decides
    let mut degraded = false;
    let js_result = recover::validate(&fragments.js, FragmentKind::Js);
    if !js_result.ok {
        log::warn!("[GEN] JS validation failed ({}), auto-repairing", js_result.reason);
        fragments.js = recover::repair_js(&fragments.js);
        degraded = true;
        let retry = recover::validate(&fragments.js, FragmentKind::Js);
        if !retry.ok {
            match config.js_policy {
                JsPolicy::WriteDegraded => {
                    log::warn!(
                        "[GEN] JS still invalid after repair ({}), writing degraded output",
                        retry.reason
                    );
                }
                JsPolicy::Strict => {
                    return Err(GenerateError::Validation {
                        kind: FragmentKind::Js,
                        reason: retry.reason,
                    });
                }
            }
        }
    }

    let output = assemble::assemble(template, lesson, &fragments);
    let path = output_path(&config.output_dir, &lesson.lesson_title);
    std::fs::create_dir_all(&config.output_dir).map_err(|e| GenerateError::Write {
        path: config.output_dir.clone(),
        source: e,
    })?;
    std::fs::write(&path, output).map_err(|e| GenerateError::Write {
        path: path.clone(),
        source: e,
    })?;
    Ok((path, degraded))
}

async fn generate_single_call<C: PromptClient>(
    client: &C,
    lesson: &LessonRecord,
    constraints: &str,
    config: &GenerationConfig,
) -> Result<RecoveredFragments, GenerateError> {
    let prompt = prompts::build_generation_prompt(lesson, constraints);
    let response = client
        .send_prompt(&prompt, &config.params)
        .await
        .filter(|r| !r.trim().is_empty())
        .ok_or(GenerateError::NoResponse)?;
    Ok(recover::extract(&response))
}

async fn generate_blueprint_flow<C: PromptClient>(
    client: &C,
    lesson: &LessonRecord,
    constraints: &str,
    config: &GenerationConfig,
) -> Result<RecoveredFragments, GenerateError> {
    let params = config.params;

    let blueprint_resp = client
        .send_prompt(
            &prompts::build_blueprint_prompt(lesson),
            &params.with_max_tokens(4096),
        )
        .await
        .ok_or(GenerateError::NoResponse)?;
    let blueprint =
        recover::extract::extract_object(&blueprint_resp).ok_or(GenerateError::NoBlueprint)?;
    let blueprint = serde_json::to_string_pretty(&blueprint).unwrap_or_default();
    log::info!("[GEN] Blueprint ready ({} chars)", blueprint.len());

    let html_resp = client
        .send_prompt(
            &prompts::build_html_prompt(lesson, &blueprint, constraints),
            &params.with_max_tokens(4096),
        )
        .await
        .ok_or(GenerateError::NoResponse)?;
    let html = recover::sanitize(&html_resp, FragmentKind::Html);

    let css_resp = client
        .send_prompt(
            &prompts::build_css_prompt(&blueprint, constraints),
            &params.with_max_tokens(2048),
        )
        .await
        .ok_or(GenerateError::NoResponse)?;
    let css = recover::sanitize(&css_resp, FragmentKind::Css);

    let logic_resp = client
        .send_prompt(
            &prompts::build_js_logic_prompt(lesson, &blueprint, constraints),
            &params,
        )
        .await
        .ok_or(GenerateError::NoResponse)?;
    let js_logic = recover::sanitize(&logic_resp, FragmentKind::Js);

    let ui_resp = client
        .send_prompt(
            &prompts::build_js_ui_prompt(&blueprint, &js_logic, constraints),
            &params,
        )
        .await
        .ok_or(GenerateError::NoResponse)?;
    let js_ui = recover::sanitize(&ui_resp, FragmentKind::Js);

    Ok(RecoveredFragments {
        html,
        css,
        js: format!("{}\n\n{}", js_logic, js_ui),
    })
}

/// Output path for a lesson: title sanitized to `[A-Za-z0-9_-]`, `.html`.
pub fn output_path(output_dir: &Path, lesson_title: &str) -> PathBuf {
    output_dir.join(format!("{}.html", safe_filename(lesson_title)))
}

fn safe_filename(title: &str) -> String {
    let name: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() {
        "lesson".to_string()
    } else {
        name
    }
}
