// src/handlers/todos.rs
//
// Direct CRUD over the user's todos. Thin wrappers: the acting user comes
// from the verified claims, and the store enforces ownership.

use crate::middleware::auth_middleware;
use crate::models::auth::{Claims, ErrorResponse};
use crate::models::todo::{NewTodo, TodoFilter, TodoPatch};
use crate::services::todos::TodoError;
use crate::AppState;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put, Router},
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn todo_routes() -> Router {
    Router::new()
        .route("/api/todos", get(list_todos))
        .route("/api/todos", post(create_todo))
        .route("/api/todos/:id", put(update_todo))
        .route("/api/todos/:id", delete(delete_todo))
        .layer(axum::middleware::from_fn(auth_middleware))
}

fn acting_user_id(claims: &Claims) -> Result<i32, (StatusCode, Json<ErrorResponse>)> {
    claims.sub.parse::<i32>().map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                success: false,
                message: "Invalid token subject".to_string(),
            }),
        )
    })
}

fn map_todo_error(error: TodoError) -> (StatusCode, Json<ErrorResponse>) {
    match error {
        TodoError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                success: false,
                message: "Todo not found".to_string(),
            }),
        ),
        TodoError::Database(e) => {
            tracing::error!("Database error in todo handler: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    message: "Internal server error".to_string(),
                }),
            )
        }
    }
}

async fn list_todos(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<TodoFilter>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = acting_user_id(&claims)?;
    let todos = state
        .todos
        .list(user_id, filter)
        .await
        .map_err(map_todo_error)?;

    Ok(Json(json!({
        "success": true,
        "count": todos.len(),
        "todos": todos.iter().map(|t| t.to_json()).collect::<Vec<_>>(),
    })))
}

async fn create_todo(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewTodo>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<ErrorResponse>)> {
    let user_id = acting_user_id(&claims)?;

    let title = payload.title.trim();
    if title.is_empty() || title.chars().count() > 200 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                success: false,
                message: "Title must be between 1 and 200 characters".to_string(),
            }),
        ));
    }

    let todo = state
        .todos
        .create(user_id, payload)
        .await
        .map_err(map_todo_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "todo": todo.to_json() })),
    ))
}

async fn update_todo(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(patch): Json<TodoPatch>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = acting_user_id(&claims)?;
    let todo = state
        .todos
        .update(id, user_id, patch)
        .await
        .map_err(map_todo_error)?;

    Ok(Json(json!({ "success": true, "todo": todo.to_json() })))
}

async fn delete_todo(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = acting_user_id(&claims)?;
    let todo = state
        .todos
        .delete(id, user_id)
        .await
        .map_err(map_todo_error)?;

    Ok(Json(json!({ "success": true, "deleted": todo.to_json() })))
}
