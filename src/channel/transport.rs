// src/channel/transport.rs

//! Socket abstraction under the channel supervisor.
//!
//! Production uses [`WsConnector`](super::ws::WsConnector); tests script
//! their own frames.

use url::Url;

use crate::errors::Result;
use crate::types::BoxFuture;

/// Close code of an orderly shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Reported when the stream ends without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Reported for a close frame that carries no code.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// What a socket produced next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Closed { code: u16 },
    /// Transport failure; the socket is unusable afterwards.
    Error(String),
}

pub trait Socket: Send {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<()>>;

    /// Next meaningful frame. Control frames are handled underneath.
    fn next_frame(&mut self) -> BoxFuture<'_, Frame>;

    fn close(&mut self, code: u16) -> BoxFuture<'_, Result<()>>;
}

pub trait Connector: Send + Sync {
    fn connect<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Box<dyn Socket>>>;
}
