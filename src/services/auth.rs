use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{AuthRequest, TokenPair, User};
use crate::services::{TokenService, UserService};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

/// Session lifecycle: signup, login, logout and refresh-token rotation
pub struct AuthService;

impl AuthService {
    /// Register a new user and open their first session
    pub async fn signup(db: &Database, config: &Config, req: AuthRequest) -> Result<TokenPair> {
        if !req.email.contains('@') {
            return Err(AppError::BadRequest("Invalid email format".to_string()));
        }
        if req.password.len() < 6 {
            return Err(AppError::BadRequest(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        if UserService::find_by_email(db, &req.email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let password_hash = Self::hash_data(req.password).await?;
        let user = UserService::create(db, &req.email, &password_hash).await?;

        let tokens = Self::open_session(db, config, &user).await?;
        tracing::info!("User {} signed up", user.id);
        Ok(tokens)
    }

    /// Login user. Unknown email and wrong password fail identically.
    pub async fn login(db: &Database, config: &Config, req: AuthRequest) -> Result<TokenPair> {
        let user = UserService::find_by_email(db, &req.email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !Self::verify_hash(req.password, user.password_hash.clone()).await? {
            tracing::warn!("Rejected password for user {}", user.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let tokens = Self::open_session(db, config, &user).await?;
        tracing::info!("User {} logged in", user.id);
        Ok(tokens)
    }

    /// Logout user (drop the refresh-token hash). Idempotent.
    pub async fn logout(db: &Database, user_id: &str) -> Result<()> {
        UserService::update_refresh_hash(db, user_id, None).await?;
        tracing::info!("User {} logged out", user_id);
        Ok(())
    }

    /// Exchange a refresh token for a new pair, rotating the stored hash
    pub async fn refresh(
        db: &Database,
        config: &Config,
        user_id: &str,
        refresh_token: &str,
    ) -> Result<TokenPair> {
        let user = UserService::find_by_id(db, user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))?;

        let stored_hash = user
            .refresh_token_hash
            .clone()
            .ok_or_else(|| AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))?;

        if !Self::verify_hash(refresh_token.to_string(), stored_hash.clone()).await? {
            tracing::warn!("Rejected stale refresh token for user {}", user.id);
            return Err(AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()));
        }

        let tokens = TokenService::issue_pair(&user.id, &user.email, &config.jwt).await?;
        let new_hash = Self::hash_data(tokens.refresh_token.clone()).await?;

        // Compare-and-swap: a concurrent refresh with the same token loses here
        if !UserService::rotate_refresh_hash(db, &user.id, &stored_hash, &new_hash).await? {
            tracing::warn!("Refresh token for user {} was rotated concurrently", user.id);
            return Err(AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()));
        }

        tracing::debug!("Rotated refresh token for user {}", user.id);
        Ok(tokens)
    }

    /// Issue a token pair and persist the new refresh-token hash
    async fn open_session(db: &Database, config: &Config, user: &User) -> Result<TokenPair> {
        let tokens = TokenService::issue_pair(&user.id, &user.email, &config.jwt).await?;
        let refresh_hash = Self::hash_data(tokens.refresh_token.clone()).await?;
        UserService::update_refresh_hash(db, &user.id, Some(&refresh_hash)).await?;
        Ok(tokens)
    }

    /// Hash a password or refresh token using Argon2 (salted, PHC string)
    pub async fn hash_data(data: String) -> Result<String> {
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(data.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AppError::Internal(format!("Hashing failed: {}", e)))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
    }

    /// Verify data against a stored hash. An unparsable hash is a mismatch.
    pub async fn verify_hash(data: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(data.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Stored hash is not a valid PHC string: {}", e);
                false
            }
        })
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_is_salted_and_verifiable() {
        let first = AuthService::hash_data("pw123456".to_string()).await.unwrap();
        let second = AuthService::hash_data("pw123456".to_string()).await.unwrap();
        assert_ne!(first, second);

        assert!(AuthService::verify_hash("pw123456".to_string(), first.clone())
            .await
            .unwrap());
        assert!(!AuthService::verify_hash("pw1234567".to_string(), first)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn garbage_digest_is_a_mismatch() {
        assert!(!AuthService::verify_hash("pw".to_string(), "not-a-hash".to_string())
            .await
            .unwrap());
    }
}
