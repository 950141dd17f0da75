//! Wire protocol and transports for the stackcalc service.
//!
//! Provides:
//! - Wire protocol (JSON message enums)
//! - Unary request handling
//! - `StreamSession` - Interactive evaluation stream state machine
//! - `LocalClient` - In-process channel bridge
//! - WebSocket transport (feature: websocket)

pub mod local;
pub mod protocol;
pub mod rpc;
pub mod stream;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use local::LocalClient;
pub use protocol::{ClientMessage, ServerMessage};
pub use rpc::handle_message;
pub use stream::StreamSession;
