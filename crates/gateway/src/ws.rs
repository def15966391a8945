//! WebSocket transport.

use async_trait::async_trait;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use devloop_core::{Error, Result};
use serde_json::Value;

use crate::message::ServerMessage;
use crate::session::Transport;

pub struct WebSocketTransport {
    socket: WebSocket,
}

impl WebSocketTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn recv(&mut self) -> Option<Result<Value>> {
        loop {
            let text = match self.socket.recv().await? {
                Ok(WsMessage::Text(text)) => text,
                Ok(WsMessage::Close(_)) | Err(_) => return None,
                Ok(_) => continue, // binary, ping, pong
            };
            return Some(
                serde_json::from_str(text.as_str())
                    .map_err(|_| Error::MalformedClientMessage("Invalid JSON".into())),
            );
        }
    }

    async fn send(&mut self, message: &ServerMessage) -> Result<()> {
        let text = serde_json::to_string(message)?;
        self.socket
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| Error::Internal(format!("WebSocket send failed: {e}")))
    }
}
