//! HTTP route definitions

use crate::{handlers, middleware, AppState};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    let rate_limiter = middleware::create_rate_limiter(state.config.rate_limit_rps);

    // Routes that act on behalf of a user session
    let protected = Router::new()
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/session", get(handlers::current_session))
        .route("/nodes", get(handlers::list_nodes).post(handlers::create_node))
        .route("/node/{id}", delete(handlers::delete_node))
        .route(
            "/node/{id}/secret",
            get(handlers::get_node_secret).post(handlers::refresh_node_secret),
        )
        .route("/media", get(handlers::list_media))
        .route(
            "/media/{id}",
            get(handlers::get_media)
                .post(handlers::upload_media)
                .delete(handlers::delete_media),
        )
        .route("/media/{id}/shares", post(handlers::share_media))
        .route("/media/{id}/shares/remove", post(handlers::unshare_media))
        .layer(axum_middleware::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::auth_middleware,
        ));

    // Node self-registration authenticates by secret, not by session
    let public = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/node/{id}/authenticate", post(handlers::authenticate_node));

    let router = Router::new()
        .merge(protected)
        .merge(public)
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(state.config.max_body_size));

    let router = if state.config.cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
