// src/services/user_context.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::storage::conversations::StoreError;

/// Read-mostly personalization hints for one user. Tools read this to shape
/// replies; the interaction counter is bumped asynchronously and best-effort.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserContext {
    pub user_id: i32,
    pub preferred_style: String,
    pub language: String,
    pub temperature_preference: Option<f32>,
    pub interaction_count: i64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
pub trait UserContextStore: Send + Sync {
    /// Fetch the user's context row, creating a default one on first access.
    async fn get_or_default(&self, user_id: i32) -> Result<UserContext, StoreError>;

    /// Bump the interaction counter without blocking the turn. Failures are
    /// logged and dropped.
    fn record_interaction(&self, user_id: i32);
}

pub struct PgUserContextStore {
    db_pool: PgPool,
}

impl PgUserContextStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserContextStore for PgUserContextStore {
    async fn get_or_default(&self, user_id: i32) -> Result<UserContext, StoreError> {
        let row = sqlx::query_as::<_, UserContext>(
            "INSERT INTO user_contexts (user_id) VALUES ($1)
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
             RETURNING user_id, preferred_style, language, temperature_preference,
                       interaction_count, updated_at",
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(row)
    }

    fn record_interaction(&self, user_id: i32) {
        let pool = self.db_pool.clone();
        tokio::spawn(async move {
            let result = sqlx::query(
                "INSERT INTO user_contexts (user_id, interaction_count)
                 VALUES ($1, 1)
                 ON CONFLICT (user_id) DO UPDATE
                 SET interaction_count = user_contexts.interaction_count + 1,
                     updated_at = NOW()",
            )
            .bind(user_id)
            .execute(&pool)
            .await;

            if let Err(e) = result {
                tracing::warn!("Failed to record interaction for user {}: {}", user_id, e);
            }
        });
    }
}
