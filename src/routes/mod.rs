pub mod batches;

use axum::Router;
use axum::routing::{get, post};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/batches", post(batches::create))
        .route("/api/v1/batches/process", post(batches::process))
        .route("/api/v1/batches/{id}", get(batches::status))
}
