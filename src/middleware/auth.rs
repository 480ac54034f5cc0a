use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::models::{CurrentUser, RefreshSession, TokenKind};
use crate::services::TokenService;
use crate::AppState;

/// Authentication middleware
/// Validates the access token from the Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid Authorization header".to_string())
    })?;

    let claims = TokenService::verify(token, TokenKind::Access, &state.config.jwt)?;

    let current_user = CurrentUser {
        id: claims.user_id,
        email: claims.email,
    };
    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

/// Refresh-token middleware
/// Accepts `Authorization: Bearer <refresh token>` or `X-Refresh-Token`
pub async fn refresh_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .or_else(|| {
            request
                .headers()
                .get("X-Refresh-Token")
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
        })
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?
        .to_string();

    let claims = TokenService::verify(&token, TokenKind::Refresh, &state.config.jwt)?;

    request.extensions_mut().insert(RefreshSession {
        user_id: claims.user_id,
        refresh_token: token,
    });

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
