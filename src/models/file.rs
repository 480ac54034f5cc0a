use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// File model
#[derive(Debug, Clone, FromRow)]
pub struct File {
    pub id: String,
    pub name: String,
    /// Public path of the blob, `/file/<user_id>/<key>`
    pub url: String,
    pub user_id: String,
    pub tags: Json<Vec<String>>,
    pub mime_type: Option<String>,
    pub views: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl File {
    pub fn tags(&self) -> &[String] {
        &self.tags.0
    }
}

/// File response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: String,
    pub name: String,
    pub url: String,
    pub user_id: String,
    pub tags: Vec<String>,
    pub mime_type: Option<String>,
    pub views: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<File> for FileResponse {
    fn from(file: File) -> Self {
        Self {
            id: file.id,
            name: file.name,
            url: file.url,
            user_id: file.user_id,
            tags: file.tags.0,
            mime_type: file.mime_type,
            views: file.views,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

/// Decoded upload handed from the multipart boundary to the file service
#[derive(Debug)]
pub struct NewUpload {
    pub original_name: String,
    pub mime_type: String,
    pub data: bytes::Bytes,
    pub tags: Vec<String>,
}

/// File list query parameters
#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    pub query: Option<String>,
}

/// Update tags request
#[derive(Debug, Deserialize)]
pub struct UpdateTagsRequest {
    pub tags: Option<Vec<String>>,
}

/// How a blob is handed to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    /// `Content-Disposition: attachment`
    Download,
    /// `Content-Disposition: inline`, public link
    View,
}

/// Blob bytes plus the headers they are served with
#[derive(Debug)]
pub struct FileContent {
    pub data: bytes::Bytes,
    pub content_type: String,
    pub disposition: String,
}
