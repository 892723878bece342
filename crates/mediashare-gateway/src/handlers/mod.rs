//! HTTP request handlers

mod media;
mod node;
mod session;

pub use media::*;
pub use node::*;
pub use session::*;

use axum::{http::StatusCode, response::IntoResponse};

/// GET /health - Health check
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
