use crate::error::SignalingError;
use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// What the raw transport delivers: text frames until the connection
/// ends, then exactly one `Closed` frame (code is absent when the
/// stream broke without a close handshake).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketFrame {
    Text(String),
    Closed { code: Option<u16> },
}

/// Write half of one established connection.
#[async_trait]
pub trait SocketSink: Send + Sync {
    async fn send(&mut self, text: String) -> Result<(), SignalingError>;

    async fn close(&mut self);
}

pub struct SocketHandle {
    pub sink: Box<dyn SocketSink>,
    pub frames: mpsc::Receiver<SocketFrame>,
}

/// The reliable-message transport boundary (WebSocket-equivalent).
/// The adapter owns reconnection policy; implementations only dial.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<SocketHandle, SignalingError>;
}
