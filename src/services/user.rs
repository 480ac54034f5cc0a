use chrono::Utc;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{User, UserResponse};

/// User store
pub struct UserService;

impl UserService {
    pub async fn find_by_email(db: &Database, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(db.pool())
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &Database, user_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(db.pool())
            .await?;
        Ok(user)
    }

    /// Get user by ID
    pub async fn get_user(db: &Database, user_id: &str) -> Result<User> {
        Self::find_by_id(db, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Get user profile
    pub async fn get_profile(db: &Database, user_id: &str) -> Result<UserResponse> {
        let user = Self::get_user(db, user_id).await?;
        Ok(UserResponse::from(user))
    }

    /// Insert a user. A taken email is `Conflict`, also when a concurrent
    /// signup wins the race to the unique index.
    pub async fn create(db: &Database, email: &str, password_hash: &str) -> Result<User> {
        let user_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user_id)
        .bind(email)
        .bind(password_hash)
        .bind(&now)
        .bind(&now)
        .execute(db.pool())
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("User already exists".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Self::get_user(db, &user_id).await
    }

    /// Overwrite the stored refresh-token hash; `None` ends the session
    pub async fn update_refresh_hash(
        db: &Database,
        user_id: &str,
        refresh_token_hash: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE users SET refresh_token_hash = ?, updated_at = ? WHERE id = ?")
            .bind(refresh_token_hash)
            .bind(&now)
            .bind(user_id)
            .execute(db.pool())
            .await?;
        Ok(())
    }

    /// Swap the refresh-token hash only if it still equals `expected`.
    /// Returns false when another rotation or a logout got there first.
    pub async fn rotate_refresh_hash(
        db: &Database,
        user_id: &str,
        expected: &str,
        new_hash: &str,
    ) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE users SET refresh_token_hash = ?, updated_at = ? WHERE id = ? AND refresh_token_hash = ?",
        )
        .bind(new_hash)
        .bind(&now)
        .bind(user_id)
        .bind(expected)
        .execute(db.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
