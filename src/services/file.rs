use chrono::Utc;
use sqlx::types::Json;
use std::path::Path;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{File, FileContent, NewUpload, ServeMode};
use crate::services::pagination::Paginatable;
use crate::storage::StorageProvider;

/// Public URL prefix under which blobs are addressed
const URL_PREFIX: &str = "/file/";
const OCTET_STREAM: &str = "application/octet-stream";

impl Paginatable for File {
    const TABLE: &'static str = "files";
    const OWNER_COLUMN: &'static str = "user_id";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name_folded"];
    const ORDER_BY: &'static str = "created_at DESC, rowid DESC";
}

/// File service
pub struct FileService;

impl FileService {
    /// Store an uploaded blob under the caller's directory, then record it
    pub async fn upload_file(
        db: &Database,
        storage: &dyn StorageProvider,
        user_id: &str,
        upload: NewUpload,
    ) -> Result<File> {
        let key = Self::blob_key(user_id, &upload.original_name);
        storage.put(&key, upload.data).await?;

        let file_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", URL_PREFIX, key);
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO files (id, name, name_folded, url, user_id, tags, mime_type, views, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&file_id)
        .bind(&upload.original_name)
        .bind(upload.original_name.to_lowercase())
        .bind(&url)
        .bind(user_id)
        .bind(Json(&upload.tags))
        .bind(&upload.mime_type)
        .bind(&now)
        .bind(&now)
        .execute(db.pool())
        .await?;

        tracing::info!("User {} uploaded {} as {}", user_id, upload.original_name, key);
        Self::get_file(db, &file_id).await
    }

    /// List the caller's files. A non-empty query matches names by
    /// case-insensitive substring (Unicode folding, done in Rust) or tags exactly.
    pub async fn list_files(db: &Database, user_id: &str, query: Option<&str>) -> Result<Vec<File>> {
        let files = match query.filter(|q| !q.is_empty()) {
            Some(q) => {
                sqlx::query_as(
                    r#"
                    SELECT * FROM files
                    WHERE user_id = ?
                      AND (instr(name_folded, ?) > 0
                           OR EXISTS (SELECT 1 FROM json_each(files.tags) WHERE json_each.value = ?))
                    ORDER BY created_at ASC, rowid ASC
                    "#,
                )
                .bind(user_id)
                .bind(q.to_lowercase())
                .bind(q)
                .fetch_all(db.pool())
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM files WHERE user_id = ? ORDER BY created_at ASC, rowid ASC")
                    .bind(user_id)
                    .fetch_all(db.pool())
                    .await?
            }
        };

        Ok(files)
    }

    pub async fn find_file(db: &Database, file_id: &str) -> Result<Option<File>> {
        let file = sqlx::query_as("SELECT * FROM files WHERE id = ?")
            .bind(file_id)
            .fetch_optional(db.pool())
            .await?;
        Ok(file)
    }

    /// Get a file by ID
    pub async fn get_file(db: &Database, file_id: &str) -> Result<File> {
        Self::find_file(db, file_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }

    /// Look up a file as seen by `user_id`; other tenants' files do not exist
    async fn find_owned(db: &Database, user_id: &str, file_id: &str) -> Result<Option<File>> {
        Ok(Self::find_file(db, file_id)
            .await?
            .filter(|file| file.user_id == user_id))
    }

    async fn get_owned(db: &Database, user_id: &str, file_id: &str) -> Result<File> {
        Self::find_owned(db, user_id, file_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }

    /// Replace the tag sequence wholesale
    pub async fn update_tags(
        db: &Database,
        user_id: &str,
        file_id: &str,
        tags: Vec<String>,
    ) -> Result<File> {
        let file = Self::get_owned(db, user_id, file_id).await?;

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE files SET tags = ?, updated_at = ? WHERE id = ?")
            .bind(Json(&tags))
            .bind(&now)
            .bind(&file.id)
            .execute(db.pool())
            .await?;

        Self::get_file(db, &file.id).await
    }

    /// Delete the blob, then the record. Unknown ids are a no-op and an
    /// already missing blob does not stop the record from going.
    pub async fn delete_file(
        db: &Database,
        storage: &dyn StorageProvider,
        user_id: &str,
        file_id: &str,
    ) -> Result<()> {
        let Some(file) = Self::find_owned(db, user_id, file_id).await? else {
            tracing::debug!("Delete of unknown file {} ignored", file_id);
            return Ok(());
        };

        storage.delete(Self::key_from_url(&file.url)?).await?;

        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(&file.id)
            .execute(db.pool())
            .await?;

        tracing::info!("User {} deleted file {}", user_id, file.id);
        Ok(())
    }

    /// Fetch metadata; every fetch counts as a view
    pub async fn get_metadata(db: &Database, user_id: &str, file_id: &str) -> Result<File> {
        let file = Self::get_owned(db, user_id, file_id).await?;
        Self::increment_views(db, &file.id).await?;
        Self::get_file(db, &file.id).await
    }

    /// Serve the caller's own file as an attachment
    pub async fn download_file(
        db: &Database,
        storage: &dyn StorageProvider,
        user_id: &str,
        file_id: &str,
    ) -> Result<FileContent> {
        let file = Self::get_owned(db, user_id, file_id).await?;
        Self::serve_blob(db, storage, &file, ServeMode::Download).await
    }

    /// Serve any file inline by id. This is the public link and performs
    /// no ownership check.
    pub async fn view_file(
        db: &Database,
        storage: &dyn StorageProvider,
        file_id: &str,
    ) -> Result<FileContent> {
        let file = Self::get_file(db, file_id).await?;
        Self::serve_blob(db, storage, &file, ServeMode::View).await
    }

    async fn serve_blob(
        db: &Database,
        storage: &dyn StorageProvider,
        file: &File,
        mode: ServeMode,
    ) -> Result<FileContent> {
        let data = storage.get(Self::key_from_url(&file.url)?).await?;
        Self::increment_views(db, &file.id).await?;

        let (content_type, disposition) = match mode {
            ServeMode::Download => (OCTET_STREAM.to_string(), "attachment"),
            ServeMode::View => (
                file.mime_type
                    .clone()
                    .unwrap_or_else(|| OCTET_STREAM.to_string()),
                "inline",
            ),
        };
        let disposition = Self::content_disposition(disposition, &file.name);

        Ok(FileContent {
            data,
            content_type,
            disposition,
        })
    }

    async fn increment_views(db: &Database, file_id: &str) -> Result<()> {
        sqlx::query("UPDATE files SET views = views + 1 WHERE id = ?")
            .bind(file_id)
            .execute(db.pool())
            .await?;
        Ok(())
    }

    /// Split the raw comma-separated tag field. Entries are kept verbatim:
    /// no trimming, no dedup, empty strings included.
    pub fn parse_tags(raw: &str) -> Vec<String> {
        raw.split(',').map(str::to_string).collect()
    }

    /// Generated storage key `<user_id>/<uuid>[.<ext>]`. The original name
    /// only contributes a sanitized extension.
    pub fn blob_key(user_id: &str, original_name: &str) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.len() <= 16)
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase());

        match extension {
            Some(ext) => format!("{}/{}.{}", user_id, Uuid::new_v4(), ext),
            None => format!("{}/{}", user_id, Uuid::new_v4()),
        }
    }

    fn key_from_url(url: &str) -> Result<&str> {
        url.strip_prefix(URL_PREFIX)
            .ok_or_else(|| AppError::Internal(format!("Malformed file url: {}", url)))
    }

    fn content_disposition(kind: &str, name: &str) -> String {
        let fallback_name: String = name
            .chars()
            .map(|c| match c {
                '"' | '\\' => '_',
                c if c.is_ascii() && !c.is_ascii_control() => c,
                _ => '_',
            })
            .collect();
        let encoded_name = urlencoding::encode(name);
        format!(
            "{}; filename=\"{}\"; filename*=UTF-8''{}",
            kind, fallback_name, encoded_name
        )
    }
}
