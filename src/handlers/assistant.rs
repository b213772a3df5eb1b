// src/handlers/assistant.rs
//
// HTTP surface of the assistant. One synchronous endpoint processes a turn;
// the rest list, fetch, and delete conversations. All routes require auth.

use crate::agent::TurnError;
use crate::middleware::auth_middleware;
use crate::models::auth::{Claims, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, Router},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn assistant_routes() -> Router {
    Router::new()
        .route("/api/assistant/message", post(send_message))
        .route("/api/assistant/conversations", get(list_conversations))
        .route("/api/assistant/conversations/:id", get(get_conversation))
        .route("/api/assistant/conversations/:id", delete(delete_conversation))
        .layer(axum::middleware::from_fn(auth_middleware))
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    message: String,
    session_id: Option<String>,
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

fn map_turn_error(error: TurnError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, message) = match &error {
        TurnError::EmptyMessage | TurnError::MessageTooLong(_) | TurnError::InvalidUser => {
            (StatusCode::BAD_REQUEST, error.to_string())
        }
        TurnError::SessionNotFound => (StatusCode::NOT_FOUND, error.to_string()),
        TurnError::Store(e) => {
            tracing::error!("Storage error during assistant turn: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };
    (
        status,
        Json(ErrorResponse {
            success: false,
            message,
        }),
    )
}

async fn send_message(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = acting_user_id(&claims)?;

    let outcome = state
        .orchestrator
        .process_turn(user_id, &payload.message, payload.session_id.as_deref())
        .await
        .map_err(map_turn_error)?;

    Ok(Json(json!({
        "success": true,
        "session_id": outcome.session_id,
        "message_id": outcome.message_id,
        "reply": outcome.reply_text,
        "tool_calls": outcome.tool_calls,
        "tool_results": outcome.tool_results,
        "degraded": outcome.degraded,
    })))
}

async fn list_conversations(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = acting_user_id(&claims)?;

    let sessions = state.conversations.list_sessions(user_id).await.map_err(|e| {
        tracing::error!("Failed to list conversations: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                success: false,
                message: "Internal server error".to_string(),
            }),
        )
    })?;

    Ok(Json(json!({
        "success": true,
        "conversations": sessions.iter().map(|s| json!({
            "session_id": s.session_uuid,
            "title": s.title,
            "created_at": s.created_at.to_rfc3339(),
            "updated_at": s.updated_at.to_rfc3339(),
        })).collect::<Vec<_>>(),
    })))
}

async fn get_conversation(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = acting_user_id(&claims)?;

    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                success: false,
                message: "Conversation not found".to_string(),
            }),
        )
    };

    let session = state
        .conversations
        .get_session(&session_id, user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load conversation: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    message: "Internal server error".to_string(),
                }),
            )
        })?
        .ok_or_else(not_found)?;

    let messages = state
        .conversations
        .history(&session_id, user_id, 200)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load conversation history: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    message: "Internal server error".to_string(),
                }),
            )
        })?;

    Ok(Json(json!({
        "success": true,
        "session_id": session.session_uuid,
        "title": session.title,
        "messages": messages.iter().map(|m| json!({
            "id": m.id,
            "role": m.role.as_str(),
            "content": m.content,
            "tool_calls": m.tool_calls,
            "tool_results": m.tool_results,
            "created_at": m.created_at.to_rfc3339(),
        })).collect::<Vec<_>>(),
    })))
}

async fn delete_conversation(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = acting_user_id(&claims)?;

    let deleted = state
        .conversations
        .delete_session(&session_id, user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete conversation: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    message: "Internal server error".to_string(),
                }),
            )
        })?;

    if !deleted {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                success: false,
                message: "Conversation not found".to_string(),
            }),
        ));
    }

    Ok(Json(json!({ "success": true })))
}
