//! In-process channel bridge for local clients.
//!
//! Lets a client in the same process (e.g. the interactive shell) exchange
//! the wire messages with a dispatcher without a network transport.

use std::sync::Arc;

use stackcalc_session::Dispatcher;
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::rpc::handle_message;
use crate::stream::StreamSession;

const CHANNEL_CAPACITY: usize = 32;

/// Client half of an in-process connection.
///
/// Both connection flavors answer every accepted request with exactly one
/// response, so a single `call` method covers unary and interactive use.
pub struct LocalClient {
    tx: mpsc::Sender<ClientMessage>,
    rx: mpsc::Receiver<ServerMessage>,
}

impl LocalClient {
    /// Open a unary connection: every request is answered, and protocol
    /// errors leave the connection usable.
    #[must_use]
    pub fn connect_rpc(dispatcher: Arc<Dispatcher>) -> Self {
        let (client_tx, mut client_rx) = mpsc::channel::<ClientMessage>(CHANNEL_CAPACITY);
        let (server_tx, server_rx) = mpsc::channel::<ServerMessage>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            while let Some(msg) = client_rx.recv().await {
                let resp = handle_message(&dispatcher, msg).await;
                if server_tx.send(resp).await.is_err() {
                    break;
                }
            }
        });

        Self {
            tx: client_tx,
            rx: server_rx,
        }
    }

    /// Open an interactive stream governed by [`StreamSession`]: evaluate
    /// requests only, and an unknown calc id ends the connection.
    #[must_use]
    pub fn connect_interact(dispatcher: Arc<Dispatcher>) -> Self {
        let (client_tx, client_rx) = mpsc::channel::<ClientMessage>(CHANNEL_CAPACITY);
        let (server_tx, server_rx) = mpsc::channel::<ServerMessage>(CHANNEL_CAPACITY);

        tokio::spawn(StreamSession::new(dispatcher, client_rx, server_tx).run());

        Self {
            tx: client_tx,
            rx: server_rx,
        }
    }

    /// Send one request and await its response.
    ///
    /// Returns `None` once the connection is closed.
    pub async fn call(&mut self, msg: ClientMessage) -> Option<ServerMessage> {
        self.tx.send(msg).await.ok()?;
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rpc_connection_survives_protocol_errors() {
        let dispatcher = Arc::new(Dispatcher::new());
        let mut client = LocalClient::connect_rpc(dispatcher);

        let resp = client
            .call(ClientMessage::GetState {
                calc_id: "nope".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(resp, ServerMessage::Error { .. }));

        let resp = client
            .call(ClientMessage::CreateCalc { stack_depth: 3 })
            .await
            .unwrap();
        assert!(matches!(resp, ServerMessage::CalcCreated { .. }));
    }

    #[tokio::test]
    async fn test_interact_connection_closes_on_unknown_id() {
        let dispatcher = Arc::new(Dispatcher::new());
        let id = dispatcher.create_calc(3).await;
        let mut client = LocalClient::connect_interact(dispatcher);

        let resp = client
            .call(ClientMessage::Evaluate {
                calc_id: id,
                statement: "1 2 +".parse().unwrap(),
            })
            .await
            .unwrap();
        assert!(matches!(resp, ServerMessage::Evaluation { .. }));

        let resp = client
            .call(ClientMessage::Evaluate {
                calc_id: "gone".to_string(),
                statement: "1".parse().unwrap(),
            })
            .await
            .unwrap();
        assert!(matches!(resp, ServerMessage::Error { .. }));

        let resp = client
            .call(ClientMessage::Evaluate {
                calc_id: "gone".to_string(),
                statement: "1".parse().unwrap(),
            })
            .await;
        assert!(resp.is_none());
    }
}
