use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::{UserId, UserRole};
use crate::services::{LoginResult, Principal, UserInfo};

/// Session key holding the logged-in user's id.
pub const SESSION_USER_KEY: &str = "user_id";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub username: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the caller from, in order:
/// 1. Session cookie (from login)
/// 2. `X-Api-Key` header
/// 3. `Authorization: Bearer <api_key>` header
///
/// The resolved [`Principal`] is stored in the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = resolve_principal(&state, &headers, &session)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    if !principal.is_active {
        return Err(ApiError::Unauthorized(
            "User account is inactive".to_string(),
        ));
    }

    tracing::Span::current().record("user_id", principal.user_id.value());
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Rejects non-admin principals with 403. Must run inside [`auth_middleware`].
pub async fn require_admin(
    Extension(principal): Extension<Principal>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    principal.require_admin()?;
    Ok(next.run(request).await)
}

async fn resolve_principal(
    state: &AppState,
    headers: &HeaderMap,
    session: &Session,
) -> Result<Option<Principal>, ApiError> {
    let auth = &state.shared.auth_service;

    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_KEY).await
        && let Some(principal) = auth.principal_for_user(UserId::new(user_id)).await?
    {
        return Ok(Some(principal));
    }

    match extract_api_key(headers) {
        Some(key) => Ok(auth.principal_for_api_key(&key).await?),
        None => Ok(None),
    }
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.trim().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Public sign-up. Always creates a regular user.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .shared
        .auth_service
        .register(&payload.username, &payload.password, UserRole::User)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// POST /auth/login
/// Authenticate with username and password, returns API key on success
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let result = state
        .shared
        .auth_service
        .login(&payload.username, &payload.password)
        .await?;

    session
        .insert(SESSION_USER_KEY, result.user.id.value())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    Ok(Json(ApiResponse::success(result)))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = state
        .shared
        .auth_service
        .get_user_info(principal.user_id)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /auth/me
pub async fn update_current_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = state
        .shared
        .auth_service
        .update_username(principal.user_id, &payload.username)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /auth/password
/// Change password (requires current password verification)
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .shared
        .auth_service
        .change_password(
            principal.user_id,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}

/// POST /auth/api-key/regenerate
pub async fn regenerate_api_key(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    let api_key = state
        .shared
        .auth_service
        .regenerate_api_key(principal.user_id)
        .await?;

    Ok(Json(ApiResponse::success(ApiKeyResponse { api_key })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_key_header_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer second"));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("second"));

        headers.insert("X-Api-Key", HeaderValue::from_static(" first "));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("first"));
    }

    #[test]
    fn other_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_api_key(&headers), None);
    }

    #[test]
    fn change_password_takes_camel_case() {
        let req: ChangePasswordRequest =
            serde_json::from_str(r#"{"currentPassword": "old-secret", "newPassword": "new-secret"}"#)
                .unwrap();
        assert_eq!(req.current_password, "old-secret");
        assert_eq!(req.new_password, "new-secret");
    }
}
