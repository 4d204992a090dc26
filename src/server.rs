use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::shell::ShellHandle;

pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    server_handle: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.server_handle.await;
    }
}

#[derive(Clone)]
struct ServerState {
    shell: ShellHandle,
}

/// Serve the control API on `addr`, forwarding every request to the shell.
pub async fn start_server(addr: SocketAddr, shell: ShellHandle) -> Result<ServerHandle> {
    let state = Arc::new(ServerState { shell });

    let router = Router::new()
        .route("/hash", post(set_hash))
        .route("/location", get(location))
        .route("/document", get(document))
        .route("/trigger", post(trigger))
        .route("/reload", post(reload))
        .with_state(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let graceful =
        axum::serve(listener, router.into_make_service()).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

    let handle = tokio::spawn(async move {
        if let Err(err) = graceful.await {
            tracing::error!(target: "server", error = %err, "control server error");
        }
    });

    tracing::info!(target: "server", addr = %local_addr, "control server listening");
    Ok(ServerHandle {
        addr: local_addr,
        shutdown_tx,
        server_handle: handle,
    })
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

struct ServerError(anyhow::Error);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        tracing::warn!(target: "server", error = %self.0, "request failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"value": ErrorResponse { error: self.0.to_string() }})),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

fn value(value: impl Serialize) -> Json<Value> {
    Json(json!({ "value": value }))
}

#[derive(Deserialize)]
struct HashPayload {
    hash: String,
}

async fn set_hash(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<HashPayload>,
) -> Result<Json<Value>, ServerError> {
    let changed = state.shell.set_hash(&payload.hash).await?;
    Ok(value(changed))
}

async fn location(State(state): State<Arc<ServerState>>) -> Result<Json<Value>, ServerError> {
    Ok(value(state.shell.snapshot().await?))
}

async fn document(State(state): State<Arc<ServerState>>) -> Result<Json<Value>, ServerError> {
    Ok(value(state.shell.document().await?))
}

async fn trigger(
    State(state): State<Arc<ServerState>>,
    Json(event): Json<Value>,
) -> Result<Json<Value>, ServerError> {
    Ok(value(state.shell.trigger(event).await?))
}

async fn reload(State(state): State<Arc<ServerState>>) -> Result<Json<Value>, ServerError> {
    state.shell.reload().await?;
    Ok(value(Value::Null))
}
