//! Judgment Service
//!
//! The engagement cycle asks one question shape of the model: "here is a
//! prompt and some background snippets, answer in text". Nothing about the
//! output shape is guaranteed, so structured answers go through the
//! defensive parsers at the bottom of this file.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const JUDGE_TIMEOUT: Duration = Duration::from_secs(120);
const JUDGE_MAX_TOKENS: usize = 1024;

/// Answers prompts, optionally grounded by context snippets
#[async_trait]
pub trait Judge: Send + Sync {
    async fn answer(&self, prompt: &str, context: &[String]) -> Result<String>;
}

/// Claude-backed judge
#[derive(Clone)]
pub struct ClaudeJudge {
    client: Client,
    api_key: Option<String>,
    model: String,
}

/// System message block
#[derive(Debug, Serialize)]
struct SystemBlock {
    r#type: String,
    text: String,
}

/// Message in conversation
#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// API request
#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<SystemBlock>,
    messages: Vec<Message>,
}

/// API response
#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    r#type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: usize,
    output_tokens: usize,
}

impl ClaudeJudge {
    pub fn new(api_key: Option<&str>, model: &str) -> Self {
        let client = Client::builder()
            .timeout(JUDGE_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.map(|s| s.to_string()),
            model: model.to_string(),
        }
    }

    /// Create from config
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(config.anthropic_api_key.as_deref(), &config.judge_model)
    }

    /// Check if API key is configured
    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Get model ID from hint
    fn model_id(model: &str) -> &'static str {
        match model.to_lowercase().as_str() {
            "haiku" => "claude-3-5-haiku-20241022",
            "opus" => "claude-3-opus-20240229",
            _ => "claude-sonnet-4-20250514",
        }
    }
}

/// Numbered context block, `[1] ...` per snippet
pub fn format_context(context: &[String]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[{}] {}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Judge for ClaudeJudge {
    async fn answer(&self, prompt: &str, context: &[String]) -> Result<String> {
        let model_id = Self::model_id(&self.model);

        let mut system = Vec::new();
        if !context.is_empty() {
            system.push(SystemBlock {
                r#type: "text".to_string(),
                text: format!("Background context:\n{}", format_context(context)),
            });
        }

        let request = MessageRequest {
            model: model_id.to_string(),
            max_tokens: JUDGE_MAX_TOKENS,
            system,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        debug!("Calling Claude API: model={}, prompt_len={}", model_id, prompt.len());

        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("ANTHROPIC_API_KEY not set - judge unavailable"))?;

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            anyhow::bail!("Claude API error {}: {}", status, text);
        }

        let result: MessageResponse = response.json().await?;

        let content = result
            .content
            .into_iter()
            .filter_map(|b| if b.r#type == "text" { b.text } else { None })
            .collect::<Vec<_>>()
            .join("\n");

        info!(
            "Judge response: model={}, in={}, out={}",
            model_id, result.usage.input_tokens, result.usage.output_tokens
        );

        Ok(content)
    }
}

/// Drop markdown code fence lines (```json / ```) around a model answer
pub fn strip_code_fence(raw: &str) -> String {
    let raw = raw.trim();
    if !raw.starts_with("```") {
        return raw.to_string();
    }
    raw.lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parse a model answer as JSON of the expected shape
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str(&cleaned).map_err(|e| anyhow::anyhow!("unparseable judge output: {}", e))
}

/// Remove one pair of wrapping double quotes and unescape `\n`
pub fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\\n", "\n")
    } else {
        trimmed.to_string()
    }
}
