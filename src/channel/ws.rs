// src/channel/ws.rs

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use crate::channel::transport::{Connector, Frame, Socket, ABNORMAL_CLOSURE, NO_STATUS_RECEIVED};
use crate::errors::{LiveError, Result};
use crate::types::BoxFuture;

/// Opens real websockets, presenting the `access_token` cookie.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    access_token: Option<String>,
}

impl WsConnector {
    pub fn new(access_token: Option<String>) -> Self {
        Self { access_token }
    }
}

impl Connector for WsConnector {
    fn connect<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Box<dyn Socket>>> {
        Box::pin(async move {
            let mut request = url
                .as_str()
                .into_client_request()
                .map_err(|e| LiveError::InvalidUrl(format!("{url}: {e}")))?;

            if let Some(token) = &self.access_token {
                let cookie = HeaderValue::from_str(&format!("access_token={token}"))
                    .map_err(|e| LiveError::ConfigError(format!("invalid access token: {e}")))?;
                request.headers_mut().insert(COOKIE, cookie);
            }

            let (stream, _) = connect_async(request)
                .await
                .map_err(|e| LiveError::Transport(e.to_string()))?;
            debug!(%url, "websocket connected");

            Ok(Box::new(WsSocket { stream }) as Box<dyn Socket>)
        })
    }
}

struct WsSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Socket for WsSocket {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.stream
                .send(Message::Text(text))
                .await
                .map_err(|e| LiveError::Transport(e.to_string()))
        })
    }

    fn next_frame(&mut self) -> BoxFuture<'_, Frame> {
        Box::pin(async move {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => return Frame::Text(text),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => return Frame::Text(text),
                        Err(_) => debug!("dropping non-utf8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame
                            .map(|f| u16::from(f.code))
                            .unwrap_or(NO_STATUS_RECEIVED);
                        return Frame::Closed { code };
                    }
                    // Ping/pong are answered by tungstenite.
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => return Frame::Error(err.to_string()),
                    None => return Frame::Closed {
                        code: ABNORMAL_CLOSURE,
                    },
                }
            }
        })
    }

    fn close(&mut self, code: u16) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let frame = CloseFrame {
                code: CloseCode::from(code),
                reason: "".into(),
            };
            self.stream
                .close(Some(frame))
                .await
                .map_err(|e| LiveError::Transport(e.to_string()))
        })
    }
}
