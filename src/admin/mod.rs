//! Local endpoints answered by the proxy itself.
//!
//! - `GET /health` → `{"status":"ok"}`
//! - `GET /stats` → request counters

pub mod handlers;

use axum::{routing::get, Router};

use crate::http::server::AppState;
use self::handlers::*;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(get_health))
        .route("/stats", get(get_stats))
}
