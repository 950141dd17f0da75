//! WebSocket transport for the service.
//!
//! `/rpc` answers any client message with one ordered response per
//! request; the connection survives protocol errors. `/interact` runs the
//! [`StreamSession`] state machine: evaluate requests only, and an unknown
//! calc id terminates the stream and the connection.

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use stackcalc_session::Dispatcher;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::rpc::handle_message;
use crate::stream::StreamSession;

const CHANNEL_CAPACITY: usize = 32;

/// Shared WebSocket handler state.
#[derive(Clone)]
pub struct WsState {
    /// The request dispatcher.
    pub dispatcher: Arc<Dispatcher>,
}

impl WsState {
    /// Create new WebSocket state.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

/// Upgrade handler for the unary `/rpc` route.
pub async fn rpc_handler(
    ws: WebSocketUpgrade,
    State(state): State<WsState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_rpc_socket(socket, state))
}

/// Upgrade handler for the streaming `/interact` route.
pub async fn interact_handler(
    ws: WebSocketUpgrade,
    State(state): State<WsState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_interact_socket(socket, state))
}

/// Extract the text payload of a WebSocket message, if any.
fn message_text(msg: Message) -> Option<String> {
    match msg {
        Message::Text(text) => Some(text.as_str().to_owned()),
        Message::Binary(data) => String::from_utf8(data.to_vec()).ok(),
        _ => None,
    }
}

async fn handle_rpc_socket(socket: WebSocket, state: WsState) {
    let conn_id = Uuid::new_v4();
    tracing::info!(%conn_id, "rpc connection opened");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(CHANNEL_CAPACITY);

    // Forward responses to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Close(_)) => break,
            Ok(m) => match message_text(m) {
                Some(t) => t,
                None => continue,
            },
            Err(e) => {
                tracing::error!("WebSocket error: {e}");
                break;
            }
        };

        let response = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(m) => handle_message(&state.dispatcher, m).await,
            Err(e) => {
                tracing::warn!("Invalid client message: {e}");
                ServerMessage::Error {
                    message: format!("invalid message: {e}"),
                }
            }
        };
        if tx.send(response).await.is_err() {
            break;
        }
    }

    drop(tx);
    let _ = send_task.await;
    tracing::info!(%conn_id, "rpc connection closed");
}

async fn handle_interact_socket(socket: WebSocket, state: WsState) {
    let conn_id = Uuid::new_v4();
    tracing::info!(%conn_id, "interactive stream opened");

    let (mut sender, mut receiver) = socket.split();
    let (in_tx, in_rx) = mpsc::channel::<ClientMessage>(CHANNEL_CAPACITY);
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(CHANNEL_CAPACITY);

    let session = StreamSession::new(Arc::clone(&state.dispatcher), in_rx, out_tx.clone());
    let mut session_task = tokio::spawn(session.run());

    let send_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    loop {
        tokio::select! {
            // The stream closed itself (unknown id or non-evaluate input).
            _ = &mut session_task => break,
            msg = receiver.next() => {
                let text = match msg {
                    None | Some(Ok(Message::Close(_))) => break,
                    Some(Ok(m)) => match message_text(m) {
                        Some(t) => t,
                        None => continue,
                    },
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {e}");
                        break;
                    }
                };
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(m) => {
                        if in_tx.send(m).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Invalid client message: {e}");
                        let _ = out_tx
                            .send(ServerMessage::Error {
                                message: format!("invalid message: {e}"),
                            })
                            .await;
                    }
                }
            }
        }
    }

    // Close the inbound half so the stream terminates, then let the send
    // task drain the final responses.
    drop(in_tx);
    drop(out_tx);
    let _ = send_task.await;
    tracing::info!(%conn_id, "interactive stream closed");
}

/// Create the service router with the `/rpc` and `/interact` routes.
#[must_use]
pub fn create_router(dispatcher: Arc<Dispatcher>) -> axum::Router {
    axum::Router::new()
        .route("/rpc", axum::routing::get(rpc_handler))
        .route("/interact", axum::routing::get(interact_handler))
        .with_state(WsState::new(dispatcher))
}
