use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::error::Result;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(path: &str) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Ok(Self { pool })
    }

    /// Private in-memory database. Pinned to one connection, since every
    /// `:memory:` connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        // sqlx enables foreign_keys on every connection it opens
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                refresh_token_hash TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                name_folded TEXT,
                url TEXT NOT NULL,
                user_id TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                mime_type TEXT,
                views INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Upgrade older databases; fails harmlessly once the column exists
        let _ = sqlx::query("ALTER TABLE files ADD COLUMN name_folded TEXT")
            .execute(&self.pool)
            .await;
        self.backfill_folded_names().await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_user_id ON files(user_id)")
            .execute(&self.pool)
            .await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// SQLite `lower()` only folds ASCII, so search keys are folded here
    async fn backfill_folded_names(&self) -> Result<()> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, name FROM files WHERE name_folded IS NULL")
                .fetch_all(&self.pool)
                .await?;

        for (id, name) in &rows {
            sqlx::query("UPDATE files SET name_folded = ? WHERE id = ?")
                .bind(name.to_lowercase())
                .bind(id)
                .execute(&self.pool)
                .await?;
        }

        if !rows.is_empty() {
            tracing::info!("Folded search names for {} files", rows.len());
        }
        Ok(())
    }
}
