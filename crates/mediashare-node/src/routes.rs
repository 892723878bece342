//! HTTP route definitions

use crate::{handlers, middleware, NodeState};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the main router
pub fn create_router(state: Arc<NodeState>) -> Router {
    // Control plane, callable by the gateway only
    let gateway = Router::new()
        .route("/user/{username}/authenticate", post(handlers::authenticate_user))
        .route(
            "/user/{username}/unauthenticate",
            post(handlers::unauthenticate_user),
        )
        .route("/file/{username}", post(handlers::upload_file))
        .route("/file/{username}/{filename}", delete(handlers::delete_file))
        .route("/files/{username}/shares", post(handlers::share_files))
        .route(
            "/files/{username}/shares/remove",
            post(handlers::unshare_files),
        )
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::gateway_auth_middleware,
        ));

    Router::new()
        .merge(gateway)
        .route("/health", get(handlers::health_check))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .with_state(state)
}
