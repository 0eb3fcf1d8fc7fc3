use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod config;
pub mod error;
pub mod graphql;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;
pub mod security;
pub mod service;
pub mod storage;
pub mod token;

// Routing segregation (public vs authenticated).
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

// Core state types for the application entry point and integration tests.
pub use config::AppConfig;
pub use graphql::{AppSchema, build_schema};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{DiskImageStore, ImageStoreState, MockImageStore};
pub use token::TokenService;

/// ApiDoc
///
/// Auto-generated OpenAPI documentation for the REST surface, served at
/// `/api-docs/openapi.json` and browsable under `/swagger-ui`. The GraphQL
/// surface documents itself through introspection instead.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::signup, handlers::login, handlers::upload_image,
        handlers::list_posts, handlers::get_post, handlers::create_post,
        handlers::update_post, handlers::delete_post,
        handlers::get_status, handlers::update_status,
    ),
    components(
        schemas(
            models::User, models::Post, models::SignupRequest, models::LoginRequest,
            models::PostInput, models::UpdatePostInput, models::UpdateStatusRequest,
            models::AuthPayload, models::PostPage, models::SignupResponse,
            models::CreatedPostResponse, models::PostBody, models::UploadResponse,
            models::StatusResponse, models::MessageResponse, error::FieldError,
        )
    ),
    tags(
        (name = "feedbox", description = "Content publishing API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding all application services and
/// configuration, shared immutably across every request task.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Image storage behind the `ImageStore` trait.
    pub images: ImageStoreState,
    /// Issues and verifies identity tokens; holds the signing secret.
    pub tokens: TokenService,
    /// GraphQL schema with the same services installed as context data.
    pub schema: AppSchema,
    /// Immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Assembles the state from its services, building the GraphQL schema
    /// over the same repository, image store and token service so both
    /// transports observe identical behavior.
    pub fn new(
        repo: RepositoryState,
        images: ImageStoreState,
        tokens: TokenService,
        config: AppConfig,
    ) -> Self {
        let schema = build_schema(repo.clone(), images.clone(), tokens.clone());
        Self {
            repo,
            images,
            tokens,
            schema,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Allow handlers and middleware to pull individual components from the shared
// AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for ImageStoreState {
    fn from_ref(app_state: &AppState) -> ImageStoreState {
        app_state.images.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppSchema {
    fn from_ref(app_state: &AppState) -> AppSchema {
        app_state.schema.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's routing structure, the identity middleware and
/// the observability layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Documentation: auto-generated Swagger UI for the REST surface.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes, including /graphql.
        .merge(public::public_routes())
        // Routes whose handlers demand an authenticated identity.
        .merge(authenticated::authenticated_routes())
        // Stored images are served statically, mirroring their storage paths.
        .nest_service("/images", ServeDir::new(&state.config.image_root))
        // Identity middleware: runs on every request, resolves the bearer
        // token to an identity (or anonymous) and attaches it. Never rejects;
        // the guard decisions happen at the handlers/resolvers.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity::attach_identity,
        ))
        .with_state(state);

    // Observability and correlation layers, applied outermost.
    base_router
        .layer(
            ServiceBuilder::new()
                // Unique id for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // A tracing span wrapping each request/response lifecycle.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echo the request id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Customizes span creation for `TraceLayer`: every log line for a request is
/// correlated by the generated x-request-id.
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
