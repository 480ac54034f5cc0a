//! filehost - multi-tenant file hosting backend
//!
//! Users sign up and log in with JWT access/refresh token pairs (refresh
//! tokens rotate on every use), then upload, tag, search, download and
//! publicly share image, video and PDF files.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::storage::StorageProvider;

/// Headroom for multipart boundaries and the tags field on top of the file itself
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub storage: Arc<dyn StorageProvider>,
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = state.config.storage.max_upload_size + MULTIPART_OVERHEAD;

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .route("/file/:id/view", get(handlers::file::view_file));

    // Refresh route (refresh token required)
    let refresh_routes = Router::new()
        .route("/auth/refresh", post(handlers::auth::refresh_token))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::refresh_middleware,
        ));

    // Protected routes (access token required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/user/me", get(handlers::user::get_me))
        .route(
            "/file",
            get(handlers::file::list_files)
                .post(handlers::file::upload_file)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/file/paginated", get(handlers::file::list_files_paginated))
        .route(
            "/file/:id",
            get(handlers::file::get_file).delete(handlers::file::delete_file),
        )
        .route("/file/:id/tags", patch(handlers::file::update_tags))
        .route("/file/:id/download", get(handlers::file::download_file))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine all routes under /api/v1
    Router::new()
        .nest(
            "/api/v1",
            public_routes.merge(refresh_routes).merge(protected_routes),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
