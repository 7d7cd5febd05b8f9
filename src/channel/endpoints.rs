// src/channel/endpoints.rs

use url::Url;

use crate::errors::{LiveError, Result};
use crate::types::TaskId;

/// Websocket addresses derived from the HTTP origin the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    ws_origin: Url,
}

impl Endpoints {
    /// `http` maps to `ws` and `https` to `wss`.
    pub fn from_base(base: &Url) -> Result<Self> {
        let scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(LiveError::InvalidUrl(format!(
                    "unsupported scheme '{other}' in {base}"
                )));
            }
        };

        let mut ws_origin = base.clone();
        ws_origin
            .set_scheme(scheme)
            .map_err(|_| LiveError::InvalidUrl(format!("cannot derive websocket url from {base}")))?;
        ws_origin.set_query(None);
        ws_origin.set_fragment(None);

        Ok(Self { ws_origin })
    }

    pub fn global(&self) -> Result<Url> {
        self.join("/ws")
    }

    pub fn task_log(&self, task_id: TaskId) -> Result<Url> {
        self.join(&format!("/api/logs/ws/{task_id}"))
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.ws_origin
            .join(path)
            .map_err(|e| LiveError::InvalidUrl(format!("{path}: {e}")))
    }
}
