use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::Credentials;

/// Ceiling applied to the token budget unless configured otherwise
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

/// Returned when the completion carries no usable content
pub const FALLBACK_SUMMARY: &str = "Summary could not be generated.";

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Which instruction pair is sent with the transcript
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Plain, organized summary
    #[default]
    Concise,
    /// Summary that keeps programming code in separate code blocks
    Code,
}

impl PromptStyle {
    pub fn system_prompt(self) -> &'static str {
        match self {
            PromptStyle::Concise => "You are an expert text summarizer. Keep responses concise and well-structured.",
            PromptStyle::Code => {
                "You are an expert summarizer that preserves programming code from technical discussions. \
                 Extract and format any code snippets separately from the summary."
            }
        }
    }

    pub fn user_prompt(self, transcript: &str) -> String {
        match self {
            PromptStyle::Concise => format!("Summarize this YouTube transcript in an organized format:\n\n{transcript}"),
            PromptStyle::Code => format!(
                "Summarize this YouTube transcript, but make sure to include any programming code in a separate code block:\n\n{transcript}"
            ),
        }
    }
}

/// Estimate the completion budget from the word count: ceil(words * 1.2), capped at `ceiling`.
///
/// Words are an approximation of tokens, so the estimate may overshoot. Never returns 0.
pub fn estimate_max_tokens(text: &str, ceiling: u32) -> u32 {
    let words = text.split_whitespace().count() as u64;
    // ceil(words * 6 / 5) in integers
    let estimated = (words * 6).div_ceil(5);
    estimated.min(u64::from(ceiling)).max(1) as u32
}

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("{var} environment variable not set (required for {provider} summarization)")]
    MissingApiKey { var: &'static str, provider: &'static str },

    #[error("{provider} API returned {status}: {body}")]
    Upstream {
        provider: &'static str,
        status: u16,
        body: Value,
    },

    #[error("request to completion service failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl SummarizeError {
    /// Diagnostic detail suitable for forwarding to the caller
    pub fn details(&self) -> Value {
        match self {
            SummarizeError::Upstream { body, .. } => body.clone(),
            other => Value::String(other.to_string()),
        }
    }
}

/// Produces a summary for transcript text
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizeError>;
}

/// Summarizer backed by the OpenAI or Anthropic HTTP APIs, picked by model name
#[derive(Debug, Clone)]
pub struct LlmSummarizer {
    client: reqwest::Client,
    model: String,
    max_tokens: u32,
    prompt: PromptStyle,
    credentials: Credentials,
}

impl LlmSummarizer {
    pub fn new(
        client: reqwest::Client,
        model: impl Into<String>,
        max_tokens: u32,
        prompt: PromptStyle,
        credentials: Credentials,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
            prompt,
            credentials,
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizeError> {
        let budget = estimate_max_tokens(transcript, self.max_tokens);
        let preview: String = transcript.chars().take(100).collect();
        info!("Summarizing transcript with {} (max_tokens={budget}, prompt={:?})", self.model, self.prompt);
        debug!("Transcript input: {preview}...");

        let content = if is_anthropic_model(&self.model) {
            self.summarize_anthropic(transcript, budget).await?
        } else {
            self.summarize_openai(transcript, budget).await?
        };

        Ok(summary_or_fallback(content))
    }
}

impl LlmSummarizer {
    async fn summarize_anthropic(&self, transcript: &str, max_tokens: u32) -> Result<Option<String>, SummarizeError> {
        let api_key = self
            .credentials
            .anthropic_api_key
            .as_deref()
            .ok_or(SummarizeError::MissingApiKey {
                var: api_key_var(&self.model),
                provider: "Claude",
            })?;

        let body = self.anthropic_body(transcript, max_tokens);

        let request = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let json = send("Anthropic", request).await?;
        Ok(extract_anthropic_text(&json))
    }

    async fn summarize_openai(&self, transcript: &str, max_tokens: u32) -> Result<Option<String>, SummarizeError> {
        let api_key = self
            .credentials
            .openai_api_key
            .as_deref()
            .ok_or(SummarizeError::MissingApiKey {
                var: api_key_var(&self.model),
                provider: "OpenAI",
            })?;

        let body = self.openai_body(transcript, max_tokens);

        let request = self.client.post(OPENAI_URL).bearer_auth(api_key).json(&body);

        let json = send("OpenAI", request).await?;
        Ok(extract_openai_text(&json))
    }

    fn anthropic_body(&self, transcript: &str, max_tokens: u32) -> Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "system": self.prompt.system_prompt(),
            "messages": [
                {
                    "role": "user",
                    "content": self.prompt.user_prompt(transcript)
                }
            ]
        })
    }

    fn openai_body(&self, transcript: &str, max_tokens: u32) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": self.prompt.system_prompt()
                },
                {
                    "role": "user",
                    "content": self.prompt.user_prompt(transcript)
                }
            ],
            "max_tokens": max_tokens
        })
    }
}

async fn send(provider: &'static str, request: reqwest::RequestBuilder) -> Result<Value, SummarizeError> {
    let resp = request.send().await?;
    let status = resp.status();

    if !status.is_success() {
        let text = match resp.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                error!("{provider} API returned {status}, reading the error body failed: {e}");
                None
            }
        };
        let err = upstream_error(provider, status, text);
        error!("{err}");
        return Err(err);
    }

    Ok(resp.json().await?)
}

/// JSON bodies are forwarded as-is; anything else as a string, or the reason phrase if unreadable
fn upstream_error(provider: &'static str, status: reqwest::StatusCode, text: Option<String>) -> SummarizeError {
    let body = match text {
        Some(text) if !text.trim().is_empty() => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        _ => Value::String(status.canonical_reason().unwrap_or("no response body").to_string()),
    };
    SummarizeError::Upstream {
        provider,
        status: status.as_u16(),
        body,
    }
}

/// Claude models go to the Anthropic API, everything else to OpenAI
pub fn is_anthropic_model(model: &str) -> bool {
    model.starts_with("claude")
}

/// Environment variable holding the key for `model`'s provider
pub fn api_key_var(model: &str) -> &'static str {
    if is_anthropic_model(model) {
        "ANTHROPIC_API_KEY"
    } else {
        "OPENAI_API_KEY"
    }
}

fn summary_or_fallback(content: Option<String>) -> String {
    content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| FALLBACK_SUMMARY.to_string())
}

fn extract_anthropic_text(json: &Value) -> Option<String> {
    let text = json
        .get("content")?
        .as_array()?
        .iter()
        .filter_map(|block| {
            if block.get("type")?.as_str()? == "text" {
                block.get("text")?.as_str()
            } else {
                None
            }
        })
        .collect::<String>();
    Some(text)
}

fn extract_openai_text(json: &Value) -> Option<String> {
    json.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}
