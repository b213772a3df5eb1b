// src/storage/audit.rs
//
// Append-only audit trail. One row per attempted tool invocation, written
// whether the call succeeded or not, and never mutated afterwards.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use super::conversations::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Success,
    Error,
    Cancelled,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Success => "success",
            ToolStatus::Error => "error",
            ToolStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolExecutionLog {
    pub user_id: i32,
    pub session_uuid: Option<String>,
    pub tool_name: String,
    /// Redacted parameters: argument keys and non-sensitive scalars only.
    pub parameters: Value,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub execution_time_ms: i64,
    pub status: ToolStatus,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: ToolExecutionLog) -> Result<(), StoreError>;
}

pub struct PgAuditSink {
    db_pool: PgPool,
}

impl PgAuditSink {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, entry: ToolExecutionLog) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO tool_execution_logs
             (user_id, session_uuid, tool_name, parameters, result, error_message,
              execution_time_ms, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())",
        )
        .bind(entry.user_id)
        .bind(&entry.session_uuid)
        .bind(&entry.tool_name)
        .bind(sqlx::types::Json(entry.parameters))
        .bind(entry.result.map(sqlx::types::Json))
        .bind(&entry.error_message)
        .bind(entry.execution_time_ms)
        .bind(entry.status.as_str())
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }
}
