// src/models/chat.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatSession {
    pub id: i32,
    pub session_uuid: String,
    pub user_id: i32,
    pub title: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Who produced a stored conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }

    pub fn from_str(role: &str) -> Self {
        match role {
            "assistant" | "model" => MessageRole::Assistant,
            "tool" | "function" => MessageRole::Tool,
            _ => MessageRole::User,
        }
    }
}

/// One persisted conversation turn entry. Immutable once written; ordering
/// within a session is defined by `created_at`.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: i32,
    pub session_id: i32,
    pub user_id: i32,
    pub role: MessageRole,
    pub content: String,
    pub tool_calls: Option<Value>,
    pub tool_results: Option<Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Fields of a message before it has been assigned an id and timestamp.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    pub tool_calls: Option<Value>,
    pub tool_results: Option<Value>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: None,
            tool_results: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: None,
            tool_results: None,
        }
    }

    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Value) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: Some(tool_calls),
            tool_results: None,
        }
    }

    pub fn tool_result(content: impl Into<String>, tool_result: Value) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: None,
            tool_results: Some(tool_result),
        }
    }
}
