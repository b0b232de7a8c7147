//! Oracle client for OpenAI-compatible chat-completions endpoints

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::prompts;
use super::{ExtractionContext, Oracle, OracleError};
use crate::config::{ExtractionTransport, OracleConfig};
use crate::learning::extraction;
use crate::types::Statement;

const SUMMARY_TEMPERATURE: f32 = 0.5;
const SUMMARY_MAX_TOKENS: u32 = 150;
const LINES_TEMPERATURE: f32 = 0.2;
const LINES_MAX_TOKENS: u32 = 200;
const TOOL_TEMPERATURE: f32 = 0.1;
const TOOL_MAX_TOKENS: u32 = 500;

// ============ Provider Configuration ============

/// Connection settings for an OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL for the API (e.g., "https://api.openai.com/v1")
    pub base_url: String,
    /// Bearer credential; `None` means every call fails with MissingCredential
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

/// Oracle backed by a hosted chat-completions API
#[derive(Clone)]
pub struct OpenAiOracle {
    client: Arc<Client>,
    provider: ProviderConfig,
    summary_model: String,
    extraction_model: String,
    transport: ExtractionTransport,
    timeout: Duration,
}

impl OpenAiOracle {
    /// Build a client from configuration and an optional credential
    pub fn new(config: &OracleConfig, api_key: Option<String>) -> Result<Self, OracleError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Request(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
            provider: ProviderConfig::new(config.base_url.clone(), api_key),
            summary_model: config.summary_model.clone(),
            extraction_model: config.extraction_model.clone(),
            transport: config.extraction_transport,
            timeout,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Send a chat completion request and return the first choice's message
    async fn send(&self, request: &ChatRequest) -> Result<Value, OracleError> {
        let api_key = self
            .provider
            .api_key
            .as_deref()
            .ok_or(OracleError::MissingCredential)?;

        tracing::debug!(
            "Oracle request: model={}, {} message(s), tools={}",
            request.model,
            request.messages.len(),
            request.tools.is_some()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.provider.base_url))
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.timeout)
                } else {
                    OracleError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api { status, body });
        }

        let body = response
            .text()
            .await
            .map_err(|e| OracleError::Request(format!("failed to read response body: {}", e)))?;

        // Parse as raw Value first; providers disagree on optional fields
        let raw: Value = serde_json::from_str(body.trim())
            .map_err(|e| OracleError::Malformed(format!("invalid JSON: {}", e)))?;

        raw.get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .cloned()
            .ok_or_else(|| OracleError::Malformed("no message in response".to_string()))
    }

    async fn extract_via_lines(&self, ctx: &ExtractionContext) -> Result<Vec<String>, OracleError> {
        let request = ChatRequest {
            model: self.extraction_model.clone(),
            messages: vec![
                ChatMessage::system(prompts::EXTRACTION_SYSTEM_PROMPT_LINES),
                ChatMessage::user(prompts::extraction_prompt_lines(ctx)),
            ],
            temperature: LINES_TEMPERATURE,
            max_tokens: LINES_MAX_TOKENS,
            tools: None,
            tool_choice: None,
        };
        let message = self.send(&request).await?;
        let reply = content_as_text(&message).unwrap_or_default();
        Ok(extraction::lines_from_reply(&reply))
    }

    async fn extract_via_tool(&self, ctx: &ExtractionContext) -> Result<Vec<String>, OracleError> {
        let request = ChatRequest {
            model: self.extraction_model.clone(),
            messages: vec![
                ChatMessage::system(prompts::EXTRACTION_SYSTEM_PROMPT_TOOL),
                ChatMessage::user(prompts::extraction_prompt_tool(ctx)),
            ],
            temperature: TOOL_TEMPERATURE,
            max_tokens: TOOL_MAX_TOKENS,
            tools: Some(vec![prompts::extraction_tool_schema()]),
            tool_choice: Some(serde_json::json!({
                "type": "function",
                "function": { "name": prompts::EXTRACTION_TOOL_NAME }
            })),
        };
        let message = self.send(&request).await?;
        let arguments = tool_call_arguments(&message, prompts::EXTRACTION_TOOL_NAME)?;
        extraction::items_from_tool_arguments(&arguments).ok_or_else(|| {
            OracleError::Malformed("tool arguments lack a 'relevant_observations' list".to_string())
        })
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn summarize(&self, document: &str, rules: &[Statement]) -> Result<String, OracleError> {
        let request = ChatRequest {
            model: self.summary_model.clone(),
            messages: vec![
                ChatMessage::system(prompts::SUMMARY_SYSTEM_PROMPT),
                ChatMessage::user(prompts::summary_prompt(document, rules)),
            ],
            temperature: SUMMARY_TEMPERATURE,
            max_tokens: SUMMARY_MAX_TOKENS,
            tools: None,
            tool_choice: None,
        };
        let message = self.send(&request).await?;
        let summary = content_as_text(&message).unwrap_or_default();
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(OracleError::Malformed("empty summary".to_string()));
        }
        Ok(summary.to_string())
    }

    async fn extract_observations(
        &self,
        context: &ExtractionContext,
    ) -> Result<Vec<String>, OracleError> {
        match self.transport {
            ExtractionTransport::Lines => self.extract_via_lines(context).await,
            ExtractionTransport::ToolCall => self.extract_via_tool(context).await,
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Extract message content as plain text, handling both string and
/// array-of-content-parts formats.
fn content_as_text(message: &Value) -> Option<String> {
    match message.get("content")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter(|part| part.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect();
            if texts.is_empty() { None } else { Some(texts.join("")) }
        }
        _ => None,
    }
}

/// Find the named tool call and decode its arguments.
///
/// Arguments arrive either as a JSON string or, from some providers, as a
/// raw object.
fn tool_call_arguments(message: &Value, tool_name: &str) -> Result<Value, OracleError> {
    let call = message
        .get("tool_calls")
        .and_then(|tc| tc.as_array())
        .and_then(|calls| {
            calls.iter().find(|c| {
                c.get("function").and_then(|f| f.get("name")).and_then(|n| n.as_str())
                    == Some(tool_name)
            })
        })
        .ok_or_else(|| OracleError::Malformed(format!("model did not call '{}'", tool_name)))?;

    match call.get("function").and_then(|f| f.get("arguments")) {
        Some(Value::String(s)) => serde_json::from_str(s)
            .map_err(|e| OracleError::Malformed(format!("undecodable tool arguments: {}", e))),
        Some(Value::Null) | None => Err(OracleError::Malformed("tool call without arguments".to_string())),
        Some(other) => Ok(other.clone()),
    }
}
