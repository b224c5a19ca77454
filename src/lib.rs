use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Public surface (health, uploaded files) and the gated /api surface.
pub mod routes;
use routes::{api, public};

// --- Public Re-exports ---

pub use auth::{TokenService, TokenState};
pub use config::AppConfig;
pub use error::AppError;
pub use repository::{
    ArticleRepositoryState, InMemoryArticleRepository, PostgresArticleRepository,
};
pub use storage::{LocalUploadStore, MockUploadStore, UploadState};

/// ApiDoc
///
/// OpenAPI document for the newsroom API, served at `/api-docs/openapi.json` and rendered
/// by the Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::list_articles, handlers::get_article,
        handlers::list_by_category, handlers::create_article, handlers::update_article,
        handlers::delete_article, handlers::upload_image
    ),
    components(
        schemas(
            models::ArticleRequest, models::ArticleResponse,
            models::LoginRequest, models::LoginResponse,
        )
    ),
    tags(
        (name = "newsdesk", description = "News publishing API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Everything a request may need, cloned cheaply per request. Handlers reach into it
/// directly; middleware pulls single components through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Article persistence (Postgres or in-memory).
    pub articles: ArticleRepositoryState,
    /// Image upload storage.
    pub uploads: UploadState,
    /// Token issuance and validation.
    pub tokens: TokenState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ArticleRepositoryState {
    fn from_ref(app_state: &AppState) -> ArticleRepositoryState {
        app_state.articles.clone()
    }
}

impl FromRef<AppState> for UploadState {
    fn from_ref(app_state: &AppState) -> UploadState {
        app_state.uploads.clone()
    }
}

impl FromRef<AppState> for TokenState {
    fn from_ref(app_state: &AppState) -> TokenState {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// cors_layer
///
/// Allows the configured browser origins to call the API with credentials. Origins that
/// are not valid header values are skipped with a warning.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// create_router
///
/// Assembles the full application: Swagger UI, the public routes, the `/api` routes
/// behind the access gate, then request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes(&state.config.upload_dir))
        // The gate decides per method and path which /api requests need a token.
        .merge(
            api::api_routes(state.config.upload_max_bytes).route_layer(
                middleware::from_fn_with_state(state.tokens.clone(), auth::access_gate),
            ),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // Outermost, so pre-flight requests are answered before anything else runs.
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` set above, so every
/// log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
