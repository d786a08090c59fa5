use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::agent::config::Config;
use crate::agent::logger::MessageLogger;
use crate::monitoring::IngestSnapshot;
use crate::transport::ConnectionState;

type SharedState = Arc<AppState>;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub logger: Arc<MessageLogger>,
}

impl AppState {
    pub fn new(config: Arc<Config>, logger: Arc<MessageLogger>) -> Self {
        Self { config, logger }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub endpoint: String,
    pub output_path: String,
    pub state: ConnectionState,
    pub stats: IngestSnapshot,
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let current = state.logger.state();
    if current.is_terminal() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "down", "state": current})),
        )
    } else {
        (StatusCode::OK, Json(json!({"status": "ok", "state": current})))
    }
}

async fn status(State(state): State<SharedState>) -> impl IntoResponse {
    Json(StatusResponse {
        endpoint: state.config.endpoint.clone(),
        output_path: state.config.output_path.display().to_string(),
        state: state.logger.state(),
        stats: state.logger.stats(),
    })
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(state)
}

pub async fn serve(state: SharedState, port: u16) -> Result<()> {
    let app = create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("status API listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
