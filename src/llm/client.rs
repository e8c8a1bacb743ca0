//! Gemini client — non-streaming `generateContent` via the Google AI API.
//!
//! API key goes in a URL query param. A generated candidate may arrive split
//! across multiple text parts; they are joined in order. A `MAX_TOKENS`
//! finish reason is logged loudly because truncated JSON is exactly what the
//! repair engine downstream exists for.

use super::{GenerationParams, PromptClient};
use serde_json::Value;

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// Build a client from `GEMINI_API_KEY` (+ optional `GEMINI_MODEL`).
    pub fn from_env() -> Result<Self, String> {
        let api_key = match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => return Err("GEMINI_API_KEY not set — add it to .env or the environment".into()),
        };
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        log::info!("[LLM] Model: {}", model);
        Ok(Self::new(api_key, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl PromptClient for GeminiClient {
    async fn send_prompt(&self, prompt: &str, params: &GenerationParams) -> Option<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            API_BASE, self.model, self.api_key
        );

        log::info!(
            "[LLM] Calling {}: temp={}, top_p={}, max_tokens={}",
            self.model,
            params.temperature,
            params.top_p,
            params.max_output_tokens
        );
        let start = std::time::Instant::now();

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "contents": [
                    {
                        "role": "user",
                        "parts": [{ "text": prompt }]
                    }
                ],
                "generationConfig": {
                    "temperature": params.temperature,
                    "topP": params.top_p,
                    "maxOutputTokens": params.max_output_tokens,
                    "candidateCount": 1
                }
            }))
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                let status = r.status();
                let body = r.text().await.unwrap_or_default();
                log::error!("[LLM] API returned {}: {}", status, body);
                return None;
            }
            Err(e) => {
                log::error!("[LLM] HTTP request failed: {}", e);
                return None;
            }
        };

        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                log::error!("[LLM] Failed to read response body: {}", e);
                return None;
            }
        };
        log::info!("[LLM] API latency: {}ms", start.elapsed().as_millis());

        let text = extract_candidate_text(&body)?;
        log::info!("[LLM] Response: {} chars", text.len());
        Some(text)
    }
}

/// Join the candidate's text parts; log the finish reason when it explains a
/// degraded response. `None` when there is no usable text at all.
fn extract_candidate_text(body: &Value) -> Option<String> {
    let candidate = body.get("candidates")?.get(0)?;

    if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
        if reason.contains("MAX_TOKENS") || reason.contains("LENGTH") {
            log::warn!("[LLM] Response truncated: finishReason={}", reason);
        } else if reason.contains("SAFETY") {
            log::error!("[LLM] Response blocked by safety filter");
        }
    }

    let parts = candidate.get("content")?.get("parts")?.as_array()?;
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        log::error!("[LLM] Candidate has no text parts");
        return None;
    }
    if texts.len() > 1 {
        log::info!("[LLM] Joined {} text parts", texts.len());
    }
    let joined = texts.join("\n").trim().to_string();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
