//! End-to-end pipeline tests with a scripted provider.
//!
//! No network: `FakeClient` returns canned responses in order, so every
//! model behaviour the recovery pipeline must survive — clean JSON, fenced
//! JSON, truncated JSON, prose, silence — is reproducible.

use labgen::generate::{
    self, GenerationConfig, JsPolicy, LessonOutcome, LessonStatus, Strategy,
};
use labgen::lesson::LessonRecord;
use labgen::llm::{GenerationParams, PromptClient};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

struct FakeClient {
    responses: Mutex<VecDeque<Option<String>>>,
}

impl FakeClient {
    fn new<I: IntoIterator<Item = Option<String>>>(responses: I) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    fn one(response: &str) -> Self {
        Self::new([Some(response.to_string())])
    }
}

impl PromptClient for FakeClient {
    async fn send_prompt(&self, _prompt: &str, _params: &GenerationParams) -> Option<String> {
        self.responses.lock().unwrap().pop_front().flatten()
    }
}

const TEMPLATE: &str = "<h1>{{CHAPTER_TITLE}}: {{LESSON_TITLE}}</h1>\n\
<p>{{CONTENT_SUMMARY}}</p>\n\
<div id=\"simulation-area\">{{HTML_CONTENT}}</div>\n\
<style>{{CSS_CONTENT}}</style>\n\
<script>{{JS_CONTENT}}</script>\n";

fn lesson(title: &str) -> LessonRecord {
    LessonRecord {
        chapter: "Chapter 1".to_string(),
        lesson_title: title.to_string(),
        content_summary: "Summary text".to_string(),
        experiment_description: "An experiment".to_string(),
    }
}

fn config(dir: &Path, js_policy: JsPolicy) -> GenerationConfig {
    let template_path = dir.join("template.html");
    std::fs::write(&template_path, TEMPLATE).unwrap();
    GenerationConfig {
        template_path,
        constraints_path: None,
        output_dir: dir.join("out"),
        params: GenerationParams::default(),
        strategy: Strategy::SingleCall,
        js_policy,
    }
}

fn only(outcomes: Vec<LessonOutcome>) -> LessonOutcome {
    assert_eq!(outcomes.len(), 1);
    outcomes.into_iter().next().unwrap()
}

// Scenario A: clean fenced JSON response.
#[tokio::test]
async fn fenced_json_response_produces_a_complete_page() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), JsPolicy::Strict);
    let raw = "```json\n{\"html\":\"<div id='x'></div>\",\"css\":\"\",\"js\":\"function init(){}\\ninit();\"}\n```";
    let client = FakeClient::one(raw);

    let outcome = only(generate::run_batch(&client, &[lesson("Lesson One")], &cfg).await);
    let LessonStatus::Done(path) = outcome.status else {
        panic!("expected Done, got {:?}", outcome.status);
    };
    let page = std::fs::read_to_string(&path).unwrap();
    assert!(page.contains("Chapter 1: Lesson One"));
    assert!(page.contains("<div id='x'></div>"));
    assert!(page.contains("function init(){}\ninit();"));
    assert!(!page.contains("{{"), "all tokens replaced: {}", page);
}

// Scenario B: same response truncated before the final quote and brace.
#[tokio::test]
async fn truncated_json_response_is_repaired_to_the_same_page() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), JsPolicy::Strict);
    let raw = "{\"html\":\"<div id='x'></div>\",\"css\":\"\",\"js\":\"function init(){}\\ninit();";
    let client = FakeClient::one(raw);

    let outcome = only(generate::run_batch(&client, &[lesson("Lesson One")], &cfg).await);
    let LessonStatus::Done(path) = outcome.status else {
        panic!("expected Done, got {:?}", outcome.status);
    };
    let page = std::fs::read_to_string(&path).unwrap();
    assert!(page.contains("<div id='x'></div>"));
    assert!(page.contains("function init(){}\ninit();"));
}

// Scenario C: no '{' anywhere — empty fragments, HTML validation fails.
#[tokio::test]
async fn prose_only_response_fails_the_lesson() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), JsPolicy::Strict);
    let client = FakeClient::one("Sorry, I cannot generate that experiment.");

    let outcome = only(generate::run_batch(&client, &[lesson("Lesson One")], &cfg).await);
    let LessonStatus::Failed(reason) = outcome.status else {
        panic!("expected Failed, got {:?}", outcome.status);
    };
    assert!(reason.contains("no content element"), "reason: {}", reason);
    assert!(!cfg.output_dir.join("Lesson_One.html").exists());
}

#[tokio::test]
async fn absent_response_fails_the_lesson() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), JsPolicy::Strict);
    let client = FakeClient::new([None]);

    let outcome = only(generate::run_batch(&client, &[lesson("Lesson One")], &cfg).await);
    let LessonStatus::Failed(reason) = outcome.status else {
        panic!("expected Failed, got {:?}", outcome.status);
    };
    assert!(reason.contains("no response"), "reason: {}", reason);
}

#[tokio::test]
async fn wrapper_tags_in_html_are_stripped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), JsPolicy::Strict);
    let raw = r#"{"html": "<html><body><div>inner</div></body></html>", "css": "", "js": "function init(){}\ninit();"}"#;
    let client = FakeClient::one(raw);

    let outcome = only(generate::run_batch(&client, &[lesson("Wrapped")], &cfg).await);
    let LessonStatus::Done(path) = outcome.status else {
        panic!("expected Done, got {:?}", outcome.status);
    };
    let page = std::fs::read_to_string(&path).unwrap();
    assert!(page.contains("<div>inner</div>"));
    assert!(!page.contains("<body>"));
}

#[tokio::test]
async fn storage_api_in_js_is_repaired_and_reported_degraded() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), JsPolicy::Strict);
    let raw = r#"{"html": "<div>x</div>", "css": "", "js": "localStorage.setItem('k', 'v');\nfunction init(){}\ninit();"}"#;
    let client = FakeClient::one(raw);

    let outcome = only(generate::run_batch(&client, &[lesson("Storage")], &cfg).await);
    let LessonStatus::Degraded(path) = outcome.status else {
        panic!("expected Degraded, got {:?}", outcome.status);
    };
    let page = std::fs::read_to_string(&path).unwrap();
    assert!(!page.contains("localStorage"));
    assert!(page.contains("function init(){}"));
}

#[tokio::test]
async fn unfixable_js_fails_under_strict_policy() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), JsPolicy::Strict);
    let raw = r#"{"html": "<div>x</div>", "css": "", "js": "function ( { ]"}"#;
    let client = FakeClient::one(raw);

    let outcome = only(generate::run_batch(&client, &[lesson("Broken JS")], &cfg).await);
    let LessonStatus::Failed(reason) = outcome.status else {
        panic!("expected Failed, got {:?}", outcome.status);
    };
    assert!(reason.contains("JS"), "reason: {}", reason);
}

#[tokio::test]
async fn unfixable_js_is_written_under_write_degraded_policy() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), JsPolicy::WriteDegraded);
    let raw = r#"{"html": "<div>x</div>", "css": "", "js": "function ( { ]"}"#;
    let client = FakeClient::one(raw);

    let outcome = only(generate::run_batch(&client, &[lesson("Broken JS")], &cfg).await);
    let LessonStatus::Degraded(path) = outcome.status else {
        panic!("expected Degraded, got {:?}", outcome.status);
    };
    assert!(path.exists());
}

#[tokio::test]
async fn one_failing_lesson_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), JsPolicy::Strict);
    let good = "{\"html\":\"<div>ok</div>\",\"css\":\"\",\"js\":\"function init(){}\\ninit();\"}";
    let client = FakeClient::new([
        Some("no structured data here".to_string()),
        Some(good.to_string()),
    ]);

    let lessons = [lesson("Bad"), lesson("Good")];
    let outcomes = generate::run_batch(&client, &lessons, &cfg).await;
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0].status, LessonStatus::Failed(_)));
    assert!(matches!(outcomes[1].status, LessonStatus::Done(_)));
}

#[tokio::test]
async fn missing_template_fails_every_lesson_without_calling_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = GenerationConfig {
        template_path: dir.path().join("missing.html"),
        constraints_path: None,
        output_dir: dir.path().join("out"),
        params: GenerationParams::default(),
        strategy: Strategy::SingleCall,
        js_policy: JsPolicy::Strict,
    };
    let client = FakeClient::one("{\"html\":\"<div>x</div>\",\"css\":\"\",\"js\":\"\"}");

    let lessons = [lesson("A"), lesson("B")];
    let outcomes = generate::run_batch(&client, &lessons, &cfg).await;
    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert!(matches!(outcome.status, LessonStatus::Failed(_)));
    }
    // no response was consumed
    assert_eq!(client.responses.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn output_filename_is_sanitized_from_the_lesson_title() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), JsPolicy::Strict);
    let raw = "{\"html\":\"<div>x</div>\",\"css\":\"\",\"js\":\"function init(){}\\ninit();\"}";
    let client = FakeClient::one(raw);

    let outcome = only(generate::run_batch(&client, &[lesson("Bài 5: Phản ứng!")], &cfg).await);
    let LessonStatus::Done(path) = outcome.status else {
        panic!("expected Done, got {:?}", outcome.status);
    };
    assert_eq!(path.file_name().unwrap(), "B_i_5__Ph_n__ng_.html");
}

#[tokio::test]
async fn blueprint_strategy_assembles_fragments_from_sequential_calls() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), JsPolicy::Strict);
    cfg.strategy = Strategy::Blueprint;
    let client = FakeClient::new([
        Some("```json\n{\"dom_ids\": {\"canvas\": \"c\"}, \"functions\": [\"init\"]}\n```".to_string()),
        Some("```html\n<div id=\"c\"></div>\n```".to_string()),
        Some("```css\n#c { width: 100%; }\n```".to_string()),
        Some("```js\nlet state = { running: false };\nconst updatePhysics = () => {};\n```".to_string()),
        Some("```js\nfunction init() { render(); }\nconst render = () => {};\ninit();\n```".to_string()),
    ]);

    let outcome = only(generate::run_batch(&client, &[lesson("Blueprint")], &cfg).await);
    let LessonStatus::Done(path) = outcome.status else {
        panic!("expected Done, got {:?}", outcome.status);
    };
    let page = std::fs::read_to_string(&path).unwrap();
    assert!(page.contains("<div id=\"c\"></div>"));
    assert!(page.contains("#c { width: 100%; }"));
    assert!(page.contains("updatePhysics"));
    assert!(page.contains("init()"));
}
