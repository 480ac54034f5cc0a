//! Shared helpers for filehost integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use filehost::config::{Config, JwtConfig, StorageConfig};
use filehost::db::Database;
use filehost::models::{File, NewUpload, TokenKind, User};
use filehost::services::{FileService, TokenService, UserService};
use filehost::storage::LocalStorage;
use filehost::AppState;

/// Create a test AppState with an in-memory database and a temp blob root.
pub async fn test_state(temp_dir: &tempfile::TempDir) -> AppState {
    let config = Config {
        jwt: JwtConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            ..JwtConfig::default()
        },
        storage: StorageConfig {
            local_path: temp_dir.path().to_string_lossy().to_string(),
            ..StorageConfig::default()
        },
        ..Config::default()
    };

    let db = Database::in_memory().await.expect("Failed to open test database");
    db.run_migrations().await.expect("Failed to migrate test database");

    AppState {
        db,
        config: Arc::new(config),
        storage: Arc::new(LocalStorage::new(temp_dir.path())),
    }
}

/// Insert a user directly through the store, bypassing password hashing.
pub async fn create_user(state: &AppState, email: &str) -> User {
    UserService::create(&state.db, email, "unused-hash")
        .await
        .expect("Failed to create test user")
}

pub fn user_id_of(state: &AppState, access_token: &str) -> String {
    TokenService::verify(access_token, TokenKind::Access, &state.config.jwt)
        .expect("access token should verify")
        .user_id
}

pub async fn upload(state: &AppState, user_id: &str, name: &str, tags: &[&str]) -> File {
    let upload = NewUpload {
        original_name: name.to_string(),
        mime_type: "image/png".to_string(),
        data: Bytes::from(format!("contents of {}", name)),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    };
    FileService::upload_file(&state.db, state.storage.as_ref(), user_id, upload)
        .await
        .expect("upload should succeed")
}

/// Path of a file's blob on disk
pub fn blob_path(temp_dir: &tempfile::TempDir, file: &File) -> std::path::PathBuf {
    temp_dir
        .path()
        .join(file.url.strip_prefix("/file/").expect("url under /file/"))
}
