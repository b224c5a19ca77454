use crate::{
    AppState,
    error::{ApiResult, AppError},
    models::{Article, ArticleRequest, ArticleResponse, LoginRequest, LoginResponse},
    storage::UploadError,
};
use axum::{
    Json,
    extract::{Multipart, Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;

/// Name of the multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

fn to_responses(articles: Vec<Article>) -> Vec<ArticleResponse> {
    articles.into_iter().map(ArticleResponse::from).collect()
}

// --- Auth ---

/// login
///
/// [Public Route] Exchanges the admin credentials for a bearer token. Any other pair is
/// answered with 400.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(payload) = payload?;
    let token = state
        .tokens
        .authenticate(&payload.username, &payload.password)
        .inspect_err(|e| tracing::warn!(username = %payload.username, error = %e, "login failed"))?;

    tracing::info!(username = %payload.username, "admin logged in");
    Ok(Json(LoginResponse { token }))
}

// --- Public Reads ---

/// list_articles
///
/// [Public Route] Every article, newest first.
#[utoipa::path(
    get,
    path = "/api/news",
    responses((status = 200, description = "All articles", body = [ArticleResponse]))
)]
pub async fn list_articles(State(state): State<AppState>) -> ApiResult<Json<Vec<ArticleResponse>>> {
    let articles = state.articles.list_all().await?;
    Ok(Json(to_responses(articles)))
}

/// get_article
///
/// [Public Route] A single article by id.
#[utoipa::path(
    get,
    path = "/api/news/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Found", body = ArticleResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ArticleResponse>> {
    let article = state.articles.get(id).await?;
    Ok(Json(article.into()))
}

/// list_by_category
///
/// [Public Route] Articles whose category matches exactly. No pagination.
#[utoipa::path(
    get,
    path = "/api/news/category/{category}",
    params(("category" = String, Path, description = "Exact category label")),
    responses((status = 200, description = "Articles in category", body = [ArticleResponse]))
)]
pub async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Json<Vec<ArticleResponse>>> {
    let articles = state.articles.list_by_category(&category).await?;
    Ok(Json(to_responses(articles)))
}

// --- Admin Writes (behind the access gate) ---

/// create_article
///
/// [Gated Route] Creates an article. The server assigns the id and both timestamps,
/// forces status to "published" and defaults positions to `["normal"]`. Any failure,
/// validation or storage, is answered with 400.
#[utoipa::path(
    post,
    path = "/api/news",
    request_body = ArticleRequest,
    responses(
        (status = 200, description = "Created", body = ArticleResponse),
        (status = 400, description = "Invalid article or not saved"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn create_article(
    State(state): State<AppState>,
    payload: Result<Json<ArticleRequest>, JsonRejection>,
) -> ApiResult<Json<ArticleResponse>> {
    let Json(payload) = payload?;
    tracing::info!(title = ?payload.title, "creating article");

    let new = payload
        .into_new_article(Utc::now())
        .map_err(AppError::BadRequest)?;

    let article = state.articles.create(new).await.map_err(|e| {
        tracing::error!(error = %e, "article could not be saved");
        AppError::BadRequest("article could not be saved".to_string())
    })?;

    tracing::info!(article_id = article.id, "article created");
    Ok(Json(article.into()))
}

/// update_article
///
/// [Gated Route] Overwrites title, spot, content, category, summary and positions;
/// image and status change only when provided.
#[utoipa::path(
    put,
    path = "/api/news/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    request_body = ArticleRequest,
    responses(
        (status = 200, description = "Updated", body = ArticleResponse),
        (status = 400, description = "Invalid article"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<ArticleRequest>, JsonRejection>,
) -> ApiResult<Json<ArticleResponse>> {
    let Json(payload) = payload?;
    let changes = payload.into_changes().map_err(AppError::BadRequest)?;
    let article = state.articles.update(id, changes).await?;

    tracing::info!(article_id = id, "article updated");
    Ok(Json(article.into()))
}

/// delete_article
///
/// [Gated Route] Hard delete. Returns 200 with an empty body.
#[utoipa::path(
    delete,
    path = "/api/news/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.articles.delete(id).await?;

    tracing::info!(article_id = id, "article deleted");
    Ok(StatusCode::OK)
}

/// upload_image
///
/// [Gated Route] Accepts a multipart form with a `file` field, stores it and answers with
/// the public URL as plain text (`/uploads/<uuid>_<name>`).
#[utoipa::path(
    post,
    path = "/api/news/upload",
    responses(
        (status = 200, description = "Public URL of the stored image", body = String),
        (status = 400, description = "Missing file or write failure"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("could not read upload: {e}")))?;

        let url = state.uploads.store(&original_name, bytes).await?;
        return Ok(url);
    }

    Err(UploadError::MissingFile.into())
}

/// health
///
/// Liveness probe. Touches no dependency.
pub async fn health() -> &'static str {
    "ok"
}
