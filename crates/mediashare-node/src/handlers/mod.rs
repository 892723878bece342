//! HTTP request handlers

mod file;
mod user;

pub use file::*;
pub use user::*;

use axum::{http::StatusCode, response::IntoResponse};

/// GET /health - Health check
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
