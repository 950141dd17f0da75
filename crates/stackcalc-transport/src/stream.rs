//! Interactive evaluation stream: one open channel, many statements.

use std::sync::Arc;

use stackcalc_session::{Dispatcher, Evaluation};
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage};

/// Stream lifecycle. `Closed` is terminal; a new stream must be opened to
/// continue interacting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Open,
    Closed,
}

/// Drives one interactive stream.
///
/// Pulls evaluate requests from the inbound channel in order, dispatches
/// each synchronously, and pushes exactly one response per request to the
/// outbound channel; response `n` always corresponds to request `n`.
///
/// The stream closes when the caller ends the inbound channel, when the
/// outbound peer goes away, or fatally when a request names an unknown
/// calc id - the `Error` response for that request is the stream's final
/// message, and later requests are never processed.
pub struct StreamSession {
    dispatcher: Arc<Dispatcher>,
    inbound: mpsc::Receiver<ClientMessage>,
    outbound: mpsc::Sender<ServerMessage>,
}

impl StreamSession {
    /// Create a stream session over a channel pair.
    #[must_use]
    pub const fn new(
        dispatcher: Arc<Dispatcher>,
        inbound: mpsc::Receiver<ClientMessage>,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            dispatcher,
            inbound,
            outbound,
        }
    }

    /// Run the stream to completion.
    pub async fn run(mut self) {
        let mut state = StreamState::Open;
        while state == StreamState::Open {
            state = match self.inbound.recv().await {
                Some(msg) => self.handle(msg).await,
                // Caller closed the inbound half: clean termination.
                None => StreamState::Closed,
            };
        }
        tracing::debug!("interactive stream closed");
    }

    async fn handle(&mut self, msg: ClientMessage) -> StreamState {
        let ClientMessage::Evaluate { calc_id, statement } = msg else {
            let _ = self
                .outbound
                .send(ServerMessage::Error {
                    message: "interactive streams accept only evaluate requests".to_string(),
                })
                .await;
            return StreamState::Closed;
        };

        match self.dispatcher.evaluate(&calc_id, &statement).await {
            Ok(Evaluation { state, err }) => {
                if self
                    .outbound
                    .send(ServerMessage::Evaluation { state, err })
                    .await
                    .is_err()
                {
                    return StreamState::Closed;
                }
                StreamState::Open
            }
            Err(e) => {
                tracing::debug!(%calc_id, "unknown calc ends interactive stream");
                let _ = self
                    .outbound
                    .send(ServerMessage::Error {
                        message: e.to_string(),
                    })
                    .await;
                StreamState::Closed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use stackcalc_core::EvalError;

    use super::*;

    fn evaluate(calc_id: &str, text: &str) -> ClientMessage {
        ClientMessage::Evaluate {
            calc_id: calc_id.to_string(),
            statement: text.parse().unwrap(),
        }
    }

    async fn spawn_stream(
        dispatcher: Arc<Dispatcher>,
    ) -> (
        mpsc::Sender<ClientMessage>,
        mpsc::Receiver<ServerMessage>,
        tokio::task::JoinHandle<()>,
    ) {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, out_rx) = mpsc::channel(8);
        let task = tokio::spawn(StreamSession::new(dispatcher, in_rx, out_tx).run());
        (in_tx, out_rx, task)
    }

    #[tokio::test]
    async fn test_responses_preserve_request_order() {
        let dispatcher = Arc::new(Dispatcher::new());
        let id = dispatcher.create_calc(4).await;
        let (in_tx, mut out_rx, task) = spawn_stream(Arc::clone(&dispatcher)).await;

        in_tx.send(evaluate(&id, "10 3")).await.unwrap();
        in_tx.send(evaluate(&id, "-")).await.unwrap();

        match out_rx.recv().await.unwrap() {
            ServerMessage::Evaluation { state, err } => {
                assert_eq!(err, None);
                assert_eq!(state.vals, vec![10, 3]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
        match out_rx.recv().await.unwrap() {
            ServerMessage::Evaluation { state, .. } => assert_eq!(state.vals, vec![7]),
            other => panic!("unexpected response: {other:?}"),
        }

        drop(in_tx);
        task.await.unwrap();
        assert!(out_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_id_ends_stream_after_one_response() {
        let dispatcher = Arc::new(Dispatcher::new());
        let id = dispatcher.create_calc(4).await;
        let (in_tx, mut out_rx, task) = spawn_stream(Arc::clone(&dispatcher)).await;

        in_tx.send(evaluate(&id, "1")).await.unwrap();
        in_tx.send(evaluate("missing", "2")).await.unwrap();
        // Never processed: the stream is closed by the unknown id above.
        let _ = in_tx.send(evaluate(&id, "3")).await;

        match out_rx.recv().await.unwrap() {
            ServerMessage::Evaluation { state, .. } => assert_eq!(state.vals, vec![1]),
            other => panic!("unexpected response: {other:?}"),
        }
        match out_rx.recv().await.unwrap() {
            ServerMessage::Error { message } => {
                assert_eq!(message, "Calc not found for ID 'missing'");
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert!(out_rx.recv().await.is_none());

        task.await.unwrap();
        // The third request was dropped, not evaluated.
        let state = dispatcher.get_state(&id).await.unwrap();
        assert_eq!(state.vals, vec![1]);
    }

    #[tokio::test]
    async fn test_evaluation_errors_do_not_end_stream() {
        let dispatcher = Arc::new(Dispatcher::new());
        let id = dispatcher.create_calc(4).await;
        let (in_tx, mut out_rx, _task) = spawn_stream(dispatcher).await;

        in_tx.send(evaluate(&id, "+")).await.unwrap();
        in_tx.send(evaluate(&id, "1 2 +")).await.unwrap();

        match out_rx.recv().await.unwrap() {
            ServerMessage::Evaluation { err, .. } => {
                assert_eq!(err, Some(EvalError::StackUnderflow));
            }
            other => panic!("unexpected response: {other:?}"),
        }
        match out_rx.recv().await.unwrap() {
            ServerMessage::Evaluation { state, err } => {
                assert_eq!(err, None);
                assert_eq!(state.vals, vec![3]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_evaluate_request_ends_stream() {
        let dispatcher = Arc::new(Dispatcher::new());
        let (in_tx, mut out_rx, task) = spawn_stream(dispatcher).await;

        in_tx
            .send(ClientMessage::ListCalcs { limit: 10 })
            .await
            .unwrap();

        assert!(matches!(
            out_rx.recv().await.unwrap(),
            ServerMessage::Error { .. }
        ));
        assert!(out_rx.recv().await.is_none());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_end_of_input_closes_cleanly() {
        let dispatcher = Arc::new(Dispatcher::new());
        let (in_tx, mut out_rx, task) = spawn_stream(dispatcher).await;

        drop(in_tx);
        task.await.unwrap();
        assert!(out_rx.recv().await.is_none());
    }
}
