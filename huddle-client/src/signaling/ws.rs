use crate::error::SignalingError;
use crate::signaling::socket::{SocketConnector, SocketFrame, SocketHandle, SocketSink};
use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::warn;
use url::Url;

/// Production `SocketConnector` over tokio-tungstenite.
pub struct WsSocketConnector;

struct WsSink {
    write: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
}

#[async_trait]
impl SocketSink for WsSink {
    async fn send(&mut self, text: String) -> Result<(), SignalingError> {
        self.write
            .send(Message::Text(text))
            .await
            .map_err(|_| SignalingError::Closed)
    }

    async fn close(&mut self) {
        let _ = self
            .write
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "leaving room".into(),
            })))
            .await;
        let _ = self.write.close().await;
    }
}

#[async_trait]
impl SocketConnector for WsSocketConnector {
    async fn connect(&self, url: &Url) -> Result<SocketHandle, SignalingError> {
        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| SignalingError::Connect(e.to_string()))?;

        let (write, mut read) = ws.split();
        let (frame_tx, frame_rx) = mpsc::channel(64);

        tokio::spawn(async move {
            loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if frame_tx.send(SocketFrame::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.map(|f| u16::from(f.code));
                        let _ = frame_tx.send(SocketFrame::Closed { code }).await;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {:?}", e);
                        let _ = frame_tx.send(SocketFrame::Closed { code: None }).await;
                        break;
                    }
                    None => {
                        let _ = frame_tx.send(SocketFrame::Closed { code: None }).await;
                        break;
                    }
                }
            }
        });

        Ok(SocketHandle {
            sink: Box::new(WsSink { write }),
            frames: frame_rx,
        })
    }
}
