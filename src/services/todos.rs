// src/services/todos.rs
//
// Ownership-scoped persistence for todos. Every query that addresses an
// existing row binds (id, user_id) together; a row owned by someone else is
// indistinguishable from a missing row.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::todo::{NewTodo, Reminder, Todo, TodoFilter, TodoPatch};

#[derive(Error, Debug)]
pub enum TodoError {
    /// Not found, or not owned by the acting user. The two cases are
    /// intentionally indistinguishable.
    #[error("todo not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn create(&self, user_id: i32, todo: NewTodo) -> Result<Todo, TodoError>;
    async fn get(&self, id: i32, user_id: i32) -> Result<Todo, TodoError>;
    async fn list(&self, user_id: i32, filter: TodoFilter) -> Result<Vec<Todo>, TodoError>;
    async fn update(&self, id: i32, user_id: i32, patch: TodoPatch) -> Result<Todo, TodoError>;
    async fn delete(&self, id: i32, user_id: i32) -> Result<Todo, TodoError>;
    async fn attach_note(&self, id: i32, user_id: i32, note: String) -> Result<Todo, TodoError>;
    async fn create_reminder(
        &self,
        todo_id: i32,
        user_id: i32,
        remind_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Reminder, TodoError>;
}

pub struct PgTodoStore {
    db_pool: PgPool,
}

impl PgTodoStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

const TODO_COLUMNS: &str =
    "id, user_id, title, description, completed, priority, due_date, notes, created_at, updated_at";

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn create(&self, user_id: i32, todo: NewTodo) -> Result<Todo, TodoError> {
        let priority = todo.priority.unwrap_or_else(|| "medium".to_string());
        let row = sqlx::query_as::<_, Todo>(&format!(
            "INSERT INTO todos (user_id, title, description, priority, due_date, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(&priority)
        .bind(todo.due_date)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(row)
    }

    async fn get(&self, id: i32, user_id: i32) -> Result<Todo, TodoError> {
        sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(TodoError::NotFound)
    }

    async fn list(&self, user_id: i32, filter: TodoFilter) -> Result<Vec<Todo>, TodoError> {
        let rows = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos
             WHERE user_id = $1
               AND ($2::boolean IS NULL OR completed = $2)
               AND ($3::varchar IS NULL OR priority = $3)
               AND ($4::varchar IS NULL OR title ILIKE '%' || $4 || '%'
                    OR description ILIKE '%' || $4 || '%')
             ORDER BY created_at DESC
             LIMIT 100"
        ))
        .bind(user_id)
        .bind(filter.completed)
        .bind(filter.priority)
        .bind(filter.search)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows)
    }

    async fn update(&self, id: i32, user_id: i32, patch: TodoPatch) -> Result<Todo, TodoError> {
        sqlx::query_as::<_, Todo>(&format!(
            "UPDATE todos SET
                 title = COALESCE($3, title),
                 description = COALESCE($4, description),
                 completed = COALESCE($5, completed),
                 priority = COALESCE($6, priority),
                 due_date = COALESCE($7, due_date),
                 updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.completed)
        .bind(patch.priority)
        .bind(patch.due_date)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(TodoError::NotFound)
    }

    async fn delete(&self, id: i32, user_id: i32) -> Result<Todo, TodoError> {
        sqlx::query_as::<_, Todo>(&format!(
            "DELETE FROM todos WHERE id = $1 AND user_id = $2 RETURNING {TODO_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(TodoError::NotFound)
    }

    async fn attach_note(&self, id: i32, user_id: i32, note: String) -> Result<Todo, TodoError> {
        sqlx::query_as::<_, Todo>(&format!(
            "UPDATE todos SET notes = notes || to_jsonb($3::text), updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(note)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(TodoError::NotFound)
    }

    async fn create_reminder(
        &self,
        todo_id: i32,
        user_id: i32,
        remind_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Reminder, TodoError> {
        // Ownership check first; the insert itself does not join on users.
        self.get(todo_id, user_id).await?;

        let row = sqlx::query_as::<_, Reminder>(
            "INSERT INTO reminders (todo_id, user_id, remind_at, created_at)
             VALUES ($1, $2, $3, NOW())
             RETURNING id, todo_id, user_id, remind_at, created_at",
        )
        .bind(todo_id)
        .bind(user_id)
        .bind(remind_at)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(row)
    }
}
