use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// API Router Module
///
/// Every `/api` route. Access control is not decided here: `create_router` wraps this
/// router in `auth::access_gate`, which lets login and GET reads through and demands a
/// bearer token for the rest.
pub fn api_routes(upload_max_bytes: usize) -> Router<AppState> {
    Router::new()
        // POST /api/auth/login
        .route("/api/auth/login", post(handlers::login))
        // GET/POST /api/news
        .route(
            "/api/news",
            get(handlers::list_articles).post(handlers::create_article),
        )
        // GET /api/news/category/{category}
        .route(
            "/api/news/category/{category}",
            get(handlers::list_by_category),
        )
        // POST /api/news/upload
        // Multipart image upload; the body limit replaces axum's 2 MB default.
        .route(
            "/api/news/upload",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(upload_max_bytes)),
        )
        // GET/PUT/DELETE /api/news/{id}
        .route(
            "/api/news/{id}",
            get(handlers::get_article)
                .put(handlers::update_article)
                .delete(handlers::delete_article),
        )
}
