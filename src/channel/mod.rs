// src/channel/mod.rs

//! Push channels.
//!
//! - [`supervisor`] owns the connect / probe / reconnect lifecycle.
//! - [`transport`] is the socket seam; [`ws`] implements it with
//!   `tokio-tungstenite`.
//! - [`endpoints`] derives websocket URLs from the HTTP origin.

pub mod endpoints;
pub mod supervisor;
pub mod transport;
pub mod ws;

pub use endpoints::Endpoints;
pub use supervisor::{ChannelOptions, ChannelSupervisor, PING_TEXT};
pub use transport::{
    Connector, Frame, Socket, ABNORMAL_CLOSURE, NORMAL_CLOSURE, NO_STATUS_RECEIVED,
};
pub use ws::WsConnector;
