// src/storage/mod.rs
pub mod audit;
pub mod conversations;

pub use audit::{AuditSink, PgAuditSink, ToolExecutionLog, ToolStatus};
pub use conversations::{ConversationStore, PgConversationStore, StoreError};
