// src/storage/conversations.rs
//
// Session and message persistence for the assistant. Every read and write is
// scoped by (session, user) together; a session id alone never resolves to
// another user's conversation.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::chat::{ChatSession, MessageRole, NewMessage, StoredMessage};

#[derive(Error, Debug)]
pub enum StoreError {
    /// Session missing, or owned by a different user.
    #[error("session not found")]
    SessionNotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_session(&self, user_id: i32) -> Result<ChatSession, StoreError>;

    async fn get_session(
        &self,
        session_uuid: &str,
        user_id: i32,
    ) -> Result<Option<ChatSession>, StoreError>;

    /// Appends one message and advances the session's `updated_at`.
    async fn append_message(
        &self,
        session_uuid: &str,
        user_id: i32,
        message: NewMessage,
    ) -> Result<StoredMessage, StoreError>;

    /// The most recent `max_messages` messages in chronological order.
    /// Read-only and stable across repeated calls.
    async fn history(
        &self,
        session_uuid: &str,
        user_id: i32,
        max_messages: i64,
    ) -> Result<Vec<StoredMessage>, StoreError>;

    async fn list_sessions(&self, user_id: i32) -> Result<Vec<ChatSession>, StoreError>;

    /// Deletes the session and, by cascade, all of its messages. Returns
    /// false when nothing owned by this user matched.
    async fn delete_session(&self, session_uuid: &str, user_id: i32) -> Result<bool, StoreError>;
}

pub struct PgConversationStore {
    db_pool: PgPool,
}

impl PgConversationStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    async fn session_db_id(&self, session_uuid: &str, user_id: i32) -> Result<i32, StoreError> {
        sqlx::query_as::<_, (i32,)>(
            "SELECT id FROM chat_sessions WHERE session_uuid = $1 AND user_id = $2",
        )
        .bind(session_uuid)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .map(|row| row.0)
        .ok_or(StoreError::SessionNotFound)
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn create_session(&self, user_id: i32) -> Result<ChatSession, StoreError> {
        let session_uuid = uuid::Uuid::new_v4().to_string();
        let session = sqlx::query_as::<_, ChatSession>(
            "INSERT INTO chat_sessions (session_uuid, user_id, created_at, updated_at)
             VALUES ($1, $2, NOW(), NOW())
             RETURNING id, session_uuid, user_id, title, created_at, updated_at",
        )
        .bind(&session_uuid)
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::debug!("Created chat session {} for user {}", session_uuid, user_id);
        Ok(session)
    }

    async fn get_session(
        &self,
        session_uuid: &str,
        user_id: i32,
    ) -> Result<Option<ChatSession>, StoreError> {
        let session = sqlx::query_as::<_, ChatSession>(
            "SELECT id, session_uuid, user_id, title, created_at, updated_at
             FROM chat_sessions WHERE session_uuid = $1 AND user_id = $2",
        )
        .bind(session_uuid)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(session)
    }

    async fn append_message(
        &self,
        session_uuid: &str,
        user_id: i32,
        message: NewMessage,
    ) -> Result<StoredMessage, StoreError> {
        let session_id = self.session_db_id(session_uuid, user_id).await?;

        let row = sqlx::query_as::<_, (i32, chrono::DateTime<chrono::Utc>)>(
            "INSERT INTO conversation_messages
             (session_id, user_id, role, content, tool_calls, tool_results, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW())
             RETURNING id, created_at",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.tool_calls.clone().map(sqlx::types::Json))
        .bind(message.tool_results.clone().map(sqlx::types::Json))
        .fetch_one(&self.db_pool)
        .await?;

        sqlx::query("UPDATE chat_sessions SET updated_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(&self.db_pool)
            .await?;

        Ok(StoredMessage {
            id: row.0,
            session_id,
            user_id,
            role: message.role,
            content: message.content,
            tool_calls: message.tool_calls,
            tool_results: message.tool_results,
            created_at: row.1,
        })
    }

    async fn history(
        &self,
        session_uuid: &str,
        user_id: i32,
        max_messages: i64,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let session_id = self.session_db_id(session_uuid, user_id).await?;

        // Most recent N first, then reversed back into chronological order.
        let rows = sqlx::query_as::<
            _,
            (
                i32,
                String,
                String,
                Option<sqlx::types::Json<Value>>,
                Option<sqlx::types::Json<Value>>,
                chrono::DateTime<chrono::Utc>,
            ),
        >(
            "SELECT id, role, content, tool_calls, tool_results, created_at
             FROM conversation_messages
             WHERE session_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(session_id)
        .bind(max_messages)
        .fetch_all(&self.db_pool)
        .await?;

        let mut messages: Vec<StoredMessage> = rows
            .into_iter()
            .map(
                |(id, role, content, tool_calls, tool_results, created_at)| StoredMessage {
                    id,
                    session_id,
                    user_id,
                    role: MessageRole::from_str(&role),
                    content,
                    tool_calls: tool_calls.map(|j| j.0),
                    tool_results: tool_results.map(|j| j.0),
                    created_at,
                },
            )
            .collect();
        messages.reverse();

        Ok(messages)
    }

    async fn list_sessions(&self, user_id: i32) -> Result<Vec<ChatSession>, StoreError> {
        let sessions = sqlx::query_as::<_, ChatSession>(
            "SELECT id, session_uuid, user_id, title, created_at, updated_at
             FROM chat_sessions WHERE user_id = $1
             ORDER BY updated_at DESC
             LIMIT 100",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(sessions)
    }

    async fn delete_session(&self, session_uuid: &str, user_id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE session_uuid = $1 AND user_id = $2")
            .bind(session_uuid)
            .bind(user_id)
            .execute(&self.db_pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
