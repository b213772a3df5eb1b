// src/middleware/auth.rs
//
// Bearer-token authentication for every protected route. On success the
// decoded claims are inserted into request extensions; handlers derive the
// acting user id from them and nowhere else.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use crate::handlers::auth::verify_jwt_token;
use crate::models::auth::ErrorResponse;

pub async fn auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let token = match bearer_token(&headers) {
        Ok(token) => token,
        Err(message) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    success: false,
                    message,
                }),
            ));
        }
    };

    let claims = match verify_jwt_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("JWT verification failed: {}", e);
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    success: false,
                    message: "Invalid or expired token".to_string(),
                }),
            ));
        }
    };

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, String> {
    let auth_str = headers
        .get("Authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| "Invalid Authorization header format. Expected 'Bearer <token>'".to_string())
}
