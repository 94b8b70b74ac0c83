use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::poller::{CycleReport, Poller};

pub struct AppState {
    pub poller: Arc<Poller>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub cycle_running: bool,
    pub last_cycle: Option<CycleReport>,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        cycle_running: state.poller.guard().is_active(),
        last_cycle: state.poller.last_report().await,
    })
}
