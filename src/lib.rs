// src/lib.rs
pub mod agent;
pub mod config;
pub mod db;
pub mod handlers;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;

use std::sync::Arc;

use agent::{AgentOrchestrator, ToolExecutor};
use config::AgentConfig;
use llm::ModelClient;
use services::todos::{PgTodoStore, TodoStore};
use services::user_context::PgUserContextStore;
use storage::audit::PgAuditSink;
use storage::conversations::{ConversationStore, PgConversationStore};

/// Shared application state: the database pool plus the assistant wired up
/// once at startup. Handlers reach collaborators through the trait objects,
/// never through the pool directly (except the auth handlers, which own the
/// users table).
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub orchestrator: AgentOrchestrator,
    pub conversations: Arc<dyn ConversationStore>,
    pub todos: Arc<dyn TodoStore>,
}

impl AppState {
    pub fn new(
        db_pool: sqlx::PgPool,
        config: AgentConfig,
        model: Option<Arc<dyn ModelClient>>,
    ) -> Arc<Self> {
        let todos: Arc<dyn TodoStore> = Arc::new(PgTodoStore::new(db_pool.clone()));
        let conversations: Arc<dyn ConversationStore> =
            Arc::new(PgConversationStore::new(db_pool.clone()));
        let user_context = Arc::new(PgUserContextStore::new(db_pool.clone()));
        let audit = Arc::new(PgAuditSink::new(db_pool.clone()));

        let executor = ToolExecutor::new(todos.clone(), user_context.clone(), audit);
        let orchestrator = AgentOrchestrator::new(
            config,
            model,
            conversations.clone(),
            user_context,
            executor,
        );

        Arc::new(Self {
            db_pool,
            orchestrator,
            conversations,
            todos,
        })
    }
}
