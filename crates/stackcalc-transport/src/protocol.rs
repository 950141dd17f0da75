//! Wire protocol for client-server communication.

use serde::{Deserialize, Serialize};
use stackcalc_core::{CalcState, EvalError, Statement};

/// Stack depth applied when a create request omits it.
const fn default_stack_depth() -> usize {
    3
}

/// List limit applied when a list request omits it.
const fn default_limit() -> usize {
    10
}

/// Message from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a calc with the given stack capacity.
    CreateCalc {
        #[serde(default = "default_stack_depth")]
        stack_depth: usize,
    },
    /// Destroy a calc.
    DestroyCalc { calc_id: String },
    /// List up to `limit` calc ids.
    ListCalcs {
        #[serde(default = "default_limit")]
        limit: usize,
    },
    /// Evaluate a statement against a calc.
    Evaluate {
        calc_id: String,
        statement: Statement,
    },
    /// Snapshot a calc's state.
    GetState { calc_id: String },
}

/// Message from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A calc was created.
    CalcCreated { calc_id: String },
    /// A calc was destroyed.
    CalcDestroyed,
    /// Listing of calc ids.
    CalcList { calc_ids: Vec<String> },
    /// Post-evaluation state; `err` carries the failure that halted
    /// evaluation, if any.
    Evaluation {
        state: CalcState,
        #[serde(default)]
        err: Option<EvalError>,
    },
    /// State snapshot.
    State { state: CalcState },
    /// Protocol-level failure, e.g. an unknown calc id.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults_stack_depth() {
        let msg: ClientMessage = serde_json::from_str("{\"type\":\"create_calc\"}").unwrap();
        if let ClientMessage::CreateCalc { stack_depth } = msg {
            assert_eq!(stack_depth, 3);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_list_defaults_limit() {
        let msg: ClientMessage = serde_json::from_str("{\"type\":\"list_calcs\"}").unwrap();
        if let ClientMessage::ListCalcs { limit } = msg {
            assert_eq!(limit, 10);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_evaluate_roundtrip() {
        let msg = ClientMessage::Evaluate {
            calc_id: "a".to_string(),
            statement: "1 2 +".parse().unwrap(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"evaluate\""));

        let parsed: ClientMessage = serde_json::from_str(&json).unwrap();
        if let ClientMessage::Evaluate { calc_id, statement } = parsed {
            assert_eq!(calc_id, "a");
            assert_eq!(statement.tokens.len(), 3);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_evaluation_error_serialization() {
        let msg = ServerMessage::Evaluation {
            state: CalcState {
                stack_depth: 3,
                vals: vec![5, 0],
            },
            err: Some(EvalError::StackUnderflow),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"err\":\"stack_underflow\""));

        let ok = ServerMessage::Evaluation {
            state: CalcState {
                stack_depth: 3,
                vals: vec![7],
            },
            err: None,
        };
        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains("\"err\":null"));
    }

    #[test]
    fn test_destroyed_is_empty_on_success() {
        let json = serde_json::to_string(&ServerMessage::CalcDestroyed).unwrap();
        assert_eq!(json, "{\"type\":\"calc_destroyed\"}");
    }
}
