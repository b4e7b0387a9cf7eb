use crate::config::RoomConfig;
use crate::error::SignalingError;
use crate::signaling::socket::{
    CLOSE_GOING_AWAY, CLOSE_NORMAL, SocketConnector, SocketFrame, SocketSink,
};
use huddle_core::model::JoinData;
use huddle_core::{RoomId, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

/// What the adapter feeds into the controller's inbound queue. Every
/// event carries the sequence number of the connection it came from so
/// that nothing from a torn-down connection can silently resume.
#[derive(Debug)]
pub enum SignalEvent {
    Message { seq: u64, message: SignalMessage },
    Closed { seq: u64, code: Option<u16> },
    ReconnectDue { seq: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    /// Belongs to a connection that was already replaced.
    Stale,
    /// Normal or going-away close; no recovery.
    Normal,
    /// Anything else; negotiators must be reset and a reconnect armed.
    Abnormal,
}

/// Owns the one logical signaling connection of a room membership.
/// Reconnects with a fixed delay, bounds send retries, and stamps all
/// inbound traffic with a connection sequence number.
pub struct SignalingAdapter {
    connector: Arc<dyn SocketConnector>,
    config: RoomConfig,
    room_id: RoomId,
    local: JoinData,
    inbound_tx: mpsc::Sender<SignalEvent>,
    sink: Option<Box<dyn SocketSink>>,
    pump: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    seq: u64,
}

impl SignalingAdapter {
    pub fn new(
        connector: Arc<dyn SocketConnector>,
        config: RoomConfig,
        room_id: RoomId,
        local: JoinData,
        inbound_tx: mpsc::Sender<SignalEvent>,
    ) -> Self {
        Self {
            connector,
            config,
            room_id,
            local,
            inbound_tx,
            sink: None,
            pump: None,
            reconnect_timer: None,
            seq: 0,
        }
    }

    pub async fn connect(&mut self) -> Result<(), SignalingError> {
        self.open_connection().await
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    /// True between an abnormal closure and the completed reconnect.
    /// Negotiators abort rather than queue offer attempts while this
    /// holds.
    pub fn is_resetting(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    pub fn current_seq(&self) -> u64 {
        self.seq
    }

    /// Deliver one message, retrying up to the configured bound with
    /// fixed spacing and a reconnect attempt per retry. Fails closed:
    /// returns false instead of blocking indefinitely.
    pub async fn send(&mut self, message: &SignalMessage) -> bool {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode signaling message: {}", e);
                return false;
            }
        };

        for attempt in 0..self.config.send_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.send_retry_spacing).await;
            }

            if self.sink.is_none() {
                debug!(
                    attempt = attempt + 1,
                    of = self.config.send_attempts,
                    "Signaling channel not open, reconnecting"
                );
                if let Err(e) = self.open_connection().await {
                    warn!("Signaling reconnect during send failed: {}", e);
                    continue;
                }
            }

            if let Some(sink) = self.sink.as_mut() {
                match sink.send(json.clone()).await {
                    Ok(()) => return true,
                    Err(e) => {
                        warn!("Signaling send failed: {}", e);
                        self.drop_connection();
                    }
                }
            }
        }

        error!(
            "Failed to deliver signaling message after {} attempts",
            self.config.send_attempts
        );
        false
    }

    /// Single-attempt delivery for best-effort notifications during
    /// teardown (the `leave` message must never block leaving).
    pub async fn send_once(&mut self, message: &SignalMessage) -> bool {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode signaling message: {}", e);
                return false;
            }
        };
        match self.sink.as_mut() {
            Some(sink) => sink.send(json).await.is_ok(),
            None => false,
        }
    }

    pub fn classify_closure(&self, seq: u64, code: Option<u16>) -> ClosureKind {
        if seq != self.seq {
            return ClosureKind::Stale;
        }
        match code {
            Some(CLOSE_NORMAL) | Some(CLOSE_GOING_AWAY) => ClosureKind::Normal,
            _ => ClosureKind::Abnormal,
        }
    }

    /// Arm the reconnect timer after an abnormal closure. The caller
    /// resets its negotiators first; the timer fires a `ReconnectDue`
    /// back through the inbound queue.
    pub fn schedule_reconnect(&mut self) {
        self.drop_connection();
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }

        let seq = self.seq;
        let delay = self.config.reconnect_delay;
        let tx = self.inbound_tx.clone();
        self.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SignalEvent::ReconnectDue { seq }).await;
        }));
        info!("Signaling reconnect scheduled in {:?}", delay);
    }

    /// Reconnect after the timer fired. Re-arms the timer when the
    /// attempt fails; stale timer events are ignored.
    pub async fn reconnect(&mut self, seq: u64) -> bool {
        if seq != self.seq {
            debug!("Ignoring stale reconnect timer");
            return false;
        }
        self.reconnect_timer = None;

        match self.open_connection().await {
            Ok(()) => {
                info!("Signaling channel re-established");
                true
            }
            Err(e) => {
                warn!("Signaling reconnect failed: {}", e);
                self.schedule_reconnect();
                false
            }
        }
    }

    /// Close deliberately: cancel timers, stop the pump, send a normal
    /// close on the wire.
    pub async fn close(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if let Some(mut sink) = self.sink.take() {
            sink.close().await;
        }
        self.seq += 1;
        info!("Signaling channel closed");
    }

    async fn open_connection(&mut self) -> Result<(), SignalingError> {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if let Some(mut sink) = self.sink.take() {
            sink.close().await;
        }

        self.seq += 1;
        let seq = self.seq;
        let url = self.build_url()?;

        let mut handle = self
            .connector
            .connect(&url)
            .await
            .map_err(|e| SignalingError::Connect(e.to_string()))?;
        info!(room_id = %self.room_id, "Signaling channel connected");

        // Announce membership before anything else so the server keys
        // this connection to the room.
        let join = SignalMessage::Join {
            room_id: self.room_id.clone(),
            data: self.local.clone(),
        };
        let json = serde_json::to_string(&join)?;
        handle.sink.send(json).await?;

        let inbound_tx = self.inbound_tx.clone();
        let mut frames = handle.frames;
        self.pump = Some(tokio::spawn(async move {
            loop {
                match frames.recv().await {
                    Some(SocketFrame::Text(text)) => {
                        match serde_json::from_str::<SignalMessage>(&text) {
                            Ok(message) => {
                                if inbound_tx
                                    .send(SignalEvent::Message { seq, message })
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                            }
                            Err(e) => warn!("Invalid signaling message: {:?}", e),
                        }
                    }
                    Some(SocketFrame::Closed { code }) => {
                        let _ = inbound_tx.send(SignalEvent::Closed { seq, code }).await;
                        break;
                    }
                    None => break,
                }
            }
        }));
        self.sink = Some(handle.sink);
        Ok(())
    }

    fn build_url(&self) -> Result<Url, SignalingError> {
        let mut url = Url::parse(&self.config.signaling_url)
            .map_err(|e| SignalingError::Url(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SignalingError::Url("signaling url cannot carry a path".to_owned()))?;
            segments.push("ws");
            segments.push("signaling");
            segments.push(self.room_id.0.as_str());
        }
        url.query_pairs_mut()
            .append_pair("userId", self.local.user_id.as_str());
        Ok(url)
    }

    fn drop_connection(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.sink = None;
        // Anything still in flight from the dead connection is stale.
        self.seq += 1;
    }
}
