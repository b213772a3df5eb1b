// src/llm.rs
//
// The language-model boundary. Given a message list and a tool catalog the
// model returns either plain text or a list of requested tool invocations.
// There is deliberately no retry here: a failed call degrades the turn to the
// fallback responder instead of blocking the user behind a backoff loop.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::config::AgentConfig;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("model request timed out")]
    Timeout,
    #[error("could not reach model provider: {0}")]
    Connection(String),
    #[error("model provider error ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("unparseable model response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: ChatContent,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: HashMap<String, PropertyDefinition>,
    pub required: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PropertyDefinition {
    #[serde(rename = "type")]
    pub prop_type: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub model: String,
    pub content: Vec<ResponseContent>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
}

impl ChatResponse {
    /// The concatenated text blocks of the response, if any.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|c| match c {
                ResponseContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    /// Requested tool invocations in the order the model produced them.
    pub fn tool_uses(&self) -> Vec<(String, String, Value)> {
        self.content
            .iter()
            .filter_map(|c| match c {
                ResponseContent::ToolUse { id, name, input } => {
                    Some((id.clone(), name.clone(), input.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

/// Call contract for the model collaborator. The HTTP client implements it;
/// tests substitute scripted doubles.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
        system: Option<String>,
    ) -> Result<ChatResponse, LlmError>;
}

#[derive(Debug, Clone)]
pub struct HttpModelClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl HttpModelClient {
    pub fn new(api_key: String, config: &AgentConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.request_timeout,
        }
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
        system: Option<String>,
    ) -> Result<ChatResponse, LlmError> {
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages,
            system,
            tools,
            temperature: self.temperature,
        };

        tracing::debug!(
            "Model request: {} messages, {} tools",
            request.messages.len(),
            request.tools.as_ref().map(|t| t.len()).unwrap_or(0)
        );

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else if e.is_connect() {
                    LlmError::Connection(e.to_string())
                } else {
                    LlmError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!("Model provider returned {}: {}", status, body);
            return Err(LlmError::Provider {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse model response: {}", e);
            LlmError::InvalidResponse(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_response() {
        let body = r#"{
            "id": "msg_01",
            "model": "claude-sonnet-4-5",
            "content": [{"type": "text", "text": "All done."}],
            "stop_reason": "end_turn"
        }"#;
        let resp: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.text().as_deref(), Some("All done."));
        assert!(resp.tool_uses().is_empty());
    }

    #[test]
    fn parses_tool_use_response_in_order() {
        let body = r#"{
            "id": "msg_02",
            "model": "claude-sonnet-4-5",
            "content": [
                {"type": "tool_use", "id": "tu_1", "name": "add_todo",
                 "input": {"user_id": "7", "title": "Buy groceries"}},
                {"type": "tool_use", "id": "tu_2", "name": "list_todos",
                 "input": {"user_id": "7"}}
            ],
            "stop_reason": "tool_use"
        }"#;
        let resp: ChatResponse = serde_json::from_str(body).unwrap();
        let uses = resp.tool_uses();
        assert_eq!(uses.len(), 2);
        assert_eq!(uses[0].1, "add_todo");
        assert_eq!(uses[1].1, "list_todos");
        assert_eq!(uses[0].2["title"], "Buy groceries");
    }

    #[test]
    fn tool_result_block_serializes_with_tag() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "tu_1".to_string(),
            content: "{\"success\":true}".to_string(),
            is_error: None,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool_use_id"], "tu_1");
        assert!(json.get("is_error").is_none());
    }
}
