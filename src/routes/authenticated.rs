use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Authenticated Router Module
///
/// Every handler here takes the `AuthUser` extractor, so anonymous requests
/// are answered with 401 before any handler body runs. Owner-only rules
/// (update/delete) are enforced one layer down, in the service, so the
/// GraphQL surface applies them identically.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // PUT /post-image
        // Multipart image upload ahead of post creation; returns the storage
        // path that the post payload then references.
        .route("/post-image", put(handlers::upload_image))
        // GET/POST /posts
        // Paginated listing (newest first) and post creation.
        .route(
            "/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        // GET/PUT/DELETE /posts/{id}
        // Single-post read, owner-only update, owner-only delete.
        .route(
            "/posts/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        // GET/PATCH /status
        // The requesting user's free-text status line.
        .route(
            "/status",
            get(handlers::get_status).patch(handlers::update_status),
        )
}
