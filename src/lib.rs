pub mod config;
pub mod error;
pub mod state;
pub mod auth;
pub mod delivery;
pub mod models;
pub mod routes;
pub mod store;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::{AppState, SharedState};
use crate::store::{NotificationSink, Store};

pub fn build_state(
    store: Arc<dyn Store>,
    sink: Arc<dyn NotificationSink>,
    config: Config,
) -> SharedState {
    Arc::new(AppState {
        store,
        sink,
        config,
    })
}

pub fn build_app(state: SharedState) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
