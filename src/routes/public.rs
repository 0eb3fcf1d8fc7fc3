use crate::{AppState, graphql, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a credential. The GraphQL endpoint lives here
/// because its read/write operations enforce their own authentication rules
/// per-resolver; login must work anonymously over the same route.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /signup
        // Account creation. Aggregated validation errors, 409 on duplicate email.
        .route("/signup", post(handlers::signup))
        // POST /login
        // Credential exchange for a signed identity token.
        .route("/login", post(handlers::login))
        // POST /graphql (+ GET playground)
        // The query/mutation surface, sharing the service layer with REST.
        .route(
            "/graphql",
            post(graphql::graphql_handler).get(graphql::graphiql),
        )
}
