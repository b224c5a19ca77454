use crate::{AppState, handlers, storage::UPLOADS_URL_PREFIX};
use axum::{Router, routing::get};
use std::path::Path;
use tower_http::services::ServeDir;

/// Public Router Module
///
/// Endpoints outside `/api`: the liveness probe and the uploaded images, served straight
/// from the upload directory.
pub fn public_routes(upload_dir: &Path) -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(handlers::health))
        // GET /uploads/<uuid>_<name>
        // Files written by the upload endpoint. Unknown names are a plain 404.
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(upload_dir))
}
