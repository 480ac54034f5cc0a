use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::error::{ApiResponse, Result};
use crate::extract::ApiJson;
use crate::models::{AuthRequest, CurrentUser, RefreshSession, TokenPair};
use crate::services::AuthService;
use crate::AppState;

/// Register a new user
/// POST /api/v1/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AuthRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenPair>>)> {
    let tokens = AuthService::signup(&state.db, &state.config, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Signup successful", tokens)),
    ))
}

/// Login user
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AuthRequest>,
) -> Result<Json<ApiResponse<TokenPair>>> {
    let tokens = AuthService::login(&state.db, &state.config, req).await?;
    Ok(Json(ApiResponse::success("Login successful", tokens)))
}

/// Logout user
/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::logout(&state.db, &current_user.id).await?;
    Ok(Json(ApiResponse::<()>::success_message("Logout successful")))
}

/// Rotate the refresh token and issue a new pair
/// POST /api/v1/auth/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Extension(session): Extension<RefreshSession>,
) -> Result<Json<ApiResponse<TokenPair>>> {
    let tokens = AuthService::refresh(
        &state.db,
        &state.config,
        &session.user_id,
        &session.refresh_token,
    )
    .await?;
    Ok(Json(ApiResponse::success("New token generated", tokens)))
}
