use std::io;

use futures_util::SinkExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to start client runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// Connects to `url`, sends `message` as a single text frame, and closes.
pub async fn send_message(url: &str, message: &str) -> Result<(), ClientError> {
    let (mut socket, _response) = connect_async(url).await?;
    socket.send(Message::Text(message.to_string())).await?;
    socket.close(None).await?;
    Ok(())
}

/// Blocking wrapper around [`send_message`] for callers without a runtime.
pub fn send_message_blocking(url: &str, message: &str) -> Result<(), ClientError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ClientError::Runtime)?;
    runtime.block_on(send_message(url, message))
}
