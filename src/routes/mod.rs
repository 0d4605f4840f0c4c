pub mod health;
pub mod research;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/research", post(research::create_research))
        .route("/api/research/stream", post(research::stream_research))
        .route("/api/research/download", post(research::download_research))
        .with_state(state)
}
