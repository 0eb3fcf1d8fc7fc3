use feedbox::{
    AppState, TokenService, create_router,
    config::{AppConfig, Env},
    repository::{PostgresRepository, RepositoryState},
    storage::{DiskImageStore, ImageStoreState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Asynchronous entry point: initializes configuration, logging, the
/// database pool, image storage and the HTTP server.
#[tokio::main]
async fn main() {
    // Configuration loading (fail-fast on missing production secrets).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // Log level: RUST_LOG wins, with sensible local defaults otherwise.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "feedbox=debug,tower_http=info,axum=trace".into());

    // Pretty output for local debugging, JSON for production log aggregation.
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

    // Database pool.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // Image storage root; created up front so the first upload cannot race
    // the static file service.
    tokio::fs::create_dir_all(&config.image_root)
        .await
        .expect("FATAL: Failed to create image root directory.");
    let images = Arc::new(DiskImageStore::new(&config.image_root)) as ImageStoreState;

    // Token service built once from the configured secret.
    let tokens = TokenService::new(&config.token_secret);

    let port = config.port;
    let state = AppState::new(repo, images, tokens, config);
    let app = create_router(state);

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("FATAL: Failed to bind server port.");

    tracing::info!("Listening on 0.0.0.0:{port}");
    tracing::info!("Swagger UI at http://localhost:{port}/swagger-ui");
    tracing::info!("GraphiQL at http://localhost:{port}/graphql");

    axum::serve(listener, app)
        .await
        .expect("FATAL: Server terminated unexpectedly.");
}
