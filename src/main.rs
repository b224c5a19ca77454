use newsdesk::{
    AppState,
    auth::{TokenService, TokenState},
    config::{AppConfig, Env},
    create_router,
    repository::{ArticleRepositoryState, InMemoryArticleRepository, PostgresArticleRepository},
    storage::{LocalUploadStore, UploadState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, picks the article store, wires the upload
/// directory and token service, then serves HTTP until the process is stopped.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "newsdesk=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Article store
    let articles: ArticleRepositoryState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("FATAL: Failed to run database migrations.");

            tracing::info!("Using Postgres article store");
            Arc::new(PostgresArticleRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; articles are kept in memory and lost on exit");
            Arc::new(InMemoryArticleRepository::new())
        }
    };

    // 4. Uploads and tokens
    let uploads = Arc::new(LocalUploadStore::new(config.upload_dir.clone())) as UploadState;
    tracing::info!(dir = %config.upload_dir.display(), "Serving uploads from local directory");

    let tokens: TokenState = Arc::new(TokenService::from_config(&config));

    // 5. Server
    let bind_address = config.bind_address();
    let app_state = AppState {
        articles,
        uploads,
        tokens,
        config,
    };
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_address)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check APP_HOST and APP_PORT.");

    tracing::info!("Listening on {bind_address}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_address}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
