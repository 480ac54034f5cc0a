use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, StatusCode},
    response::Response,
    Extension, Json,
};
use bytes::{Bytes, BytesMut};

use crate::error::{ApiResponse, AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{
    CurrentUser, File, FileContent, FileQuery, FileResponse, NewUpload, UpdateTagsRequest,
};
use crate::services::pagination::{PageQuery, Paginated};
use crate::services::{FileService, PaginationService};
use crate::AppState;

/// List the caller's files, optionally filtered
/// GET /api/v1/file?query=xxx
pub async fn list_files(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<FileQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>> {
    let files = FileService::list_files(&state.db, &current_user.id, query.query.as_deref()).await?;
    let files = files.into_iter().map(FileResponse::from).collect();
    Ok(Json(ApiResponse::success("Files fetched successfully", files)))
}

/// List the caller's files page by page
/// GET /api/v1/file/paginated?page=1&limit=10&query=xxx
pub async fn list_files_paginated(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<Paginated<FileResponse>>>> {
    let page = PaginationService::paginate::<File>(&state.db, &current_user.id, &query)
        .await?
        .map(FileResponse::from);
    Ok(Json(ApiResponse::success("Files fetched successfully", page)))
}

/// Upload a file
/// POST /api/v1/file (multipart: `file`, optional `tags`)
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>)> {
    let mut multipart = multipart?;
    let max_size = state.config.storage.max_upload_size;
    let mut upload: Option<(String, String, Bytes)> = None;
    let mut tags = String::new();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| AppError::BadRequest("No file name provided".to_string()))?;
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&file_name)
                            .first_or_octet_stream()
                            .to_string()
                    });

                let mut data = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if data.len() + chunk.len() > max_size {
                        return Err(AppError::PayloadTooLarge(format!(
                            "File exceeds the {} byte upload limit",
                            max_size
                        )));
                    }
                    data.extend_from_slice(&chunk);
                }
                upload = Some((file_name, content_type, data.freeze()));
            }
            "tags" => {
                tags = field.text().await.map_err(multipart_error)?;
            }
            _ => {}
        }
    }

    let (original_name, mime_type, data) =
        upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    if !is_allowed_mime(&mime_type) {
        return Err(AppError::UnsupportedMediaType(format!(
            "File type {} is not allowed",
            mime_type
        )));
    }

    let upload = NewUpload {
        original_name,
        mime_type,
        data,
        tags: FileService::parse_tags(&tags),
    };
    let file =
        FileService::upload_file(&state.db, state.storage.as_ref(), &current_user.id, upload)
            .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "File uploaded successfully",
            FileResponse::from(file),
        )),
    ))
}

/// Replace a file's tags
/// PATCH /api/v1/file/:id/tags
pub async fn update_tags(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateTagsRequest>,
) -> Result<Json<ApiResponse<FileResponse>>> {
    let tags = req
        .tags
        .ok_or_else(|| AppError::BadRequest("tags is required".to_string()))?;
    let file = FileService::update_tags(&state.db, &current_user.id, &id, tags).await?;
    Ok(Json(ApiResponse::success(
        "File tags updated successfully",
        FileResponse::from(file),
    )))
}

/// Delete a file
/// DELETE /api/v1/file/:id
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ApiResponse<()>>> {
    FileService::delete_file(&state.db, state.storage.as_ref(), &current_user.id, &id).await?;
    Ok(Json(ApiResponse::<()>::success_message("File deleted successfully")))
}

/// Get file metadata (counts as a view)
/// GET /api/v1/file/:id
pub async fn get_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ApiResponse<FileResponse>>> {
    let file = FileService::get_metadata(&state.db, &current_user.id, &id).await?;
    Ok(Json(ApiResponse::success(
        "File retrieved successfully",
        FileResponse::from(file),
    )))
}

/// Download a file
/// GET /api/v1/file/:id/download
pub async fn download_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<String>,
) -> Result<Response> {
    let content =
        FileService::download_file(&state.db, state.storage.as_ref(), &current_user.id, &id)
            .await?;
    blob_response(content)
}

/// Serve a file inline, no authentication
/// GET /api/v1/file/:id/view
pub async fn view_file(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Response> {
    let content = FileService::view_file(&state.db, state.storage.as_ref(), &id).await?;
    blob_response(content)
}

fn blob_response(content: FileContent) -> Result<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content.content_type)
        .header(header::CONTENT_LENGTH, content.data.len())
        .header(header::CONTENT_DISPOSITION, content.disposition)
        .body(Body::from(content.data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the request size limit".to_string())
    } else {
        AppError::BadRequest(format!("Failed to process multipart: {}", e))
    }
}

/// Images, videos and PDFs only
fn is_allowed_mime(mime_type: &str) -> bool {
    let mime_type = mime_type.to_ascii_lowercase();
    mime_type.starts_with("image/")
        || mime_type.starts_with("video/")
        || mime_type == "application/pdf"
}
