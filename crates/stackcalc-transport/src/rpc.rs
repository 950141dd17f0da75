//! Unary request handling: one client message in, one server message out.

use stackcalc_session::{Dispatcher, Evaluation, RegistryError};

use crate::protocol::{ClientMessage, ServerMessage};

/// Dispatch a single unary request and translate the outcome.
///
/// Registry failures become protocol-level `Error` messages naming the
/// missing id; evaluation failures travel as data inside a normal
/// `Evaluation` response.
pub async fn handle_message(dispatcher: &Dispatcher, msg: ClientMessage) -> ServerMessage {
    match msg {
        ClientMessage::CreateCalc { stack_depth } => ServerMessage::CalcCreated {
            calc_id: dispatcher.create_calc(stack_depth).await,
        },
        ClientMessage::DestroyCalc { calc_id } => {
            match dispatcher.destroy_calc(&calc_id).await {
                Ok(()) => ServerMessage::CalcDestroyed,
                Err(e) => not_found(&e),
            }
        }
        ClientMessage::ListCalcs { limit } => ServerMessage::CalcList {
            calc_ids: dispatcher.list_calcs(limit).await,
        },
        ClientMessage::Evaluate { calc_id, statement } => {
            match dispatcher.evaluate(&calc_id, &statement).await {
                Ok(Evaluation { state, err }) => ServerMessage::Evaluation { state, err },
                Err(e) => not_found(&e),
            }
        }
        ClientMessage::GetState { calc_id } => match dispatcher.get_state(&calc_id).await {
            Ok(state) => ServerMessage::State { state },
            Err(e) => not_found(&e),
        },
    }
}

fn not_found(err: &RegistryError) -> ServerMessage {
    ServerMessage::Error {
        message: err.to_string(),
    }
}
