//! LLM domain — provider boundary and prompt construction.
//!
//! The rest of the crate treats the model as an opaque request/response
//! function: a prompt and sampling parameters go in, maybe a text comes
//! back. `None` covers every failure mode (network, auth, quota, safety
//! block, empty candidate) — callers degrade, they never crash.
//!
//!   - client.rs  — GeminiClient over the Google AI HTTP API
//!   - prompts.rs — prompt builders + constraints loading

pub mod client;
pub mod prompts;

pub use client::GeminiClient;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.8,
            max_output_tokens: 8192,
        }
    }
}

impl GenerationParams {
    /// Same sampling, different token budget.
    pub fn with_max_tokens(self, max_output_tokens: u32) -> Self {
        Self {
            max_output_tokens,
            ..self
        }
    }
}

/// The opaque request/response boundary to the model provider.
///
/// An absent response is a recoverable failure, not a crash; implementations
/// log the cause and return `None`.
pub trait PromptClient {
    fn send_prompt(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> impl std::future::Future<Output = Option<String>> + Send;
}
