//! API route definitions
//!
//! - /api/v1/health - Engine liveness and counters
//! - /api/v1/report - Latest cycle report
//! - /api/v1/machines - Machine trends and range status from the latest cycle
//! - /api/v1/machines/:name - Live machine roll-up
//! - /api/v1/sensors/:id - Live sensor analysis

use axum::{routing::get, Router};

use super::handlers::{self, ApiState};

pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/report", get(handlers::report))
        .route("/machines", get(handlers::machines))
        .route("/machines/:name", get(handlers::machine))
        .route("/sensors/:id", get(handlers::sensor))
        .with_state(state)
}
