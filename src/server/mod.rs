//! Websocket server for interactive runs.
//!
//! Clients connect to `GET /ws` and send `{"type":"start","task":{...}}`.
//! The server streams progress events as `{"type","content","output"}`
//! frames, asks for plan feedback with `"type":"human_feedback"` frames
//! (answered with `{"type":"human_feedback","content":"..."}`), and ends
//! with a `"type":"report"` frame carrying the markdown report.

pub mod session;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::config::ReportConfig;
use crate::agent::progress::ProgressEvent;
use crate::error::AgentError;
use session::{ClientMessage, SocketFeedback, run_session, wire_json};

/// Shared server state.
struct ServerState {
    config: ReportConfig,
    shutdown: CancellationToken,
}

/// Builds the router.
fn router(config: ReportConfig, shutdown: CancellationToken) -> Router {
    let state = Arc::new(ServerState { config, shutdown });
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Serves on `addr` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: &str, config: ReportConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "websocket server listening on /ws");

    let app = router(config, shutdown.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("server failed")?;
    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if let Err(e) = sender.send(Message::Text(text.into())).await {
                debug!(error = %e, "socket send failed");
                break;
            }
        }
    });

    let cancel = state.shutdown.child_token();
    let mut replies: Option<mpsc::UnboundedSender<Result<String, AgentError>>> = None;
    let mut run: Option<tokio::task::JoinHandle<()>> = None;

    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(ClientMessage::Start { task }) => {
                if run.as_ref().is_some_and(|h| !h.is_finished()) {
                    let _ = out_tx.send(wire_json(&ProgressEvent::log(
                        "SERVER",
                        "error",
                        "a run is already in progress".to_string(),
                    )));
                    continue;
                }
                info!(query = %task.query, "starting socket run");
                let (feedback, reply_tx) = SocketFeedback::new(out_tx.clone());
                replies = Some(reply_tx);
                run = Some(tokio::spawn(run_session(
                    task,
                    state.config.clone(),
                    out_tx.clone(),
                    Arc::new(feedback),
                    cancel.clone(),
                )));
            }
            Ok(ClientMessage::HumanFeedback { content }) => {
                if let Some(tx) = &replies {
                    let _ = tx.send(Ok(content));
                }
            }
            Err(e) => {
                warn!(error = %e, "unexpected socket message");
                if let Some(tx) = &replies {
                    let _ = tx.send(Err(AgentError::Feedback {
                        message: format!("malformed message: {e}"),
                    }));
                }
            }
        }
    }

    info!("socket closed");
    cancel.cancel();
    if let Some(handle) = run {
        let _ = handle.await;
    }
    drop(out_tx);
    let _ = writer.await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_builds() {
        let config = ReportConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let _router = router(config, CancellationToken::new());
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let config = ReportConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let result = serve("127.0.0.1:0", config, shutdown).await;
        assert!(result.is_ok());
    }
}
