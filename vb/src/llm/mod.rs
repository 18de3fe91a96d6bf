//! Completion service client
//!
//! Provides single-shot completion requests against an OpenAI-compatible
//! chat completions endpoint (Gemini exposes one).

use std::sync::Arc;

use tracing::{debug, warn};

pub mod client;
mod error;
mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// Create a completion client based on the provider specified in config
///
/// Supports "openai" and its alias "gemini".
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "openai" | "gemini" => {
            debug!("create_client: creating OpenAI-compatible client");
            Ok(Arc::new(OpenAIClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::Config(format!(
                "Unknown LLM provider: '{}'. Supported: openai, gemini",
                other
            )))
        }
    }
}

/// Single-prompt completion returning trimmed text
///
/// An empty or filtered completion is an error so callers treat it the same
/// as a malformed reply.
pub async fn complete_text(
    llm: &dyn LlmClient,
    system_prompt: &str,
    prompt: &str,
    max_tokens: u32,
) -> Result<String, LlmError> {
    debug!(prompt_len = prompt.len(), %max_tokens, "complete_text: called");
    let request = CompletionRequest {
        system_prompt: system_prompt.to_string(),
        messages: vec![Message::user(prompt)],
        max_tokens,
    };

    let response = llm.complete(request).await?;
    debug!(
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        stop_reason = ?response.stop_reason,
        "complete_text: completion received"
    );
    if response.stop_reason == StopReason::MaxTokens {
        warn!(output_tokens = response.usage.output_tokens, max_tokens, "complete_text: completion truncated");
    }
    if response.stop_reason == StopReason::ContentFilter {
        warn!("complete_text: completion withheld by content filter");
        return Err(LlmError::Blocked);
    }
    match response.content.map(|c| c.trim().to_string()) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => {
            debug!("complete_text: empty completion");
            Err(LlmError::InvalidResponse("Empty completion".to_string()))
        }
    }
}
