//! WebSocket chat endpoint — axum upgrade handler and per-connection loop.
//!
//! The socket's receive loop is the session's serialization point: one
//! incoming message is fully handled (turn driven to a terminal state)
//! before the next is read, so a thread never sees two unresolved runs.

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::AppState;
use crate::agents::AgentsClient;
use crate::credentials::ChainCredential;
use crate::session::AgentSession;

/// Frames sent to the chat page.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Transient progress indicator ("initializing", "processing", …).
    Status { message: String },
    /// The session is connected and accepting input.
    Ready {
        agent_id: String,
        thread_id: String,
        mcp_server_label: String,
    },
    /// Assistant reply for the last user message.
    Reply { content: String },
    /// Session- or turn-level error; the socket stays open.
    Error { message: String },
}

/// Frame received from the chat page.
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub content: String,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles one chat session over an established WebSocket.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    tracing::info!(%session_id, "chat session opened");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    // Sender task: forward frames to the WebSocket.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("failed to serialize server frame: {e}");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let _ = tx.send(ServerFrame::Status {
        message: "initializing agent session".to_string(),
    });

    // One session per socket. A failed connect leaves the socket usable for
    // error reporting only; the user restarts the session by reconnecting.
    let session = match connect_session(&state).await {
        Ok(session) => {
            let _ = tx.send(ServerFrame::Ready {
                agent_id: session.agent_id().unwrap_or_default().to_string(),
                thread_id: session.thread_id().unwrap_or_default().to_string(),
                mcp_server_label: session.mcp().server_label().to_string(),
            });
            Some(session)
        }
        Err(e) => {
            tracing::error!(%session_id, "session connect failed: {e:#}");
            let _ = tx.send(ServerFrame::Error {
                message: format!("could not initialize the agent session: {e:#}"),
            });
            None
        }
    };

    // Receive loop: strictly one turn at a time.
    while let Some(Ok(ws_msg)) = receiver.next().await {
        let text = match ws_msg {
            WsMessage::Text(t) => t,
            WsMessage::Close(_) => break,
            _ => continue,
        };

        let frame: ClientFrame = match serde_json::from_str(&text) {
            Ok(f) => f,
            Err(e) => {
                let _ = tx.send(ServerFrame::Error {
                    message: format!("invalid message: {e}"),
                });
                continue;
            }
        };

        let Some(session) = session.as_ref() else {
            let _ = tx.send(ServerFrame::Error {
                message: "the agent session is not initialized; reconnect to retry".to_string(),
            });
            continue;
        };

        let _ = tx.send(ServerFrame::Status {
            message: "processing".to_string(),
        });

        match session.turn(&frame.content).await {
            Ok(reply) => {
                let content = reply.text();
                let _ = tx.send(ServerFrame::Reply {
                    content: if content.is_empty() {
                        "No response received from agent.".to_string()
                    } else {
                        content
                    },
                });
            }
            Err(e) => {
                tracing::warn!(%session_id, "turn failed: {e}");
                let _ = tx.send(ServerFrame::Error {
                    message: e.to_string(),
                });
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
    tracing::info!(%session_id, "chat session closed");
}

/// Resolves credentials and creates the per-connection agent session.
async fn connect_session(state: &AppState) -> anyhow::Result<AgentSession> {
    let credential = ChainCredential::default_chain();
    let client = AgentsClient::connect(&state.settings.project_endpoint, &credential).await?;
    let session = AgentSession::connect(client, &state.settings).await?;
    Ok(session)
}
