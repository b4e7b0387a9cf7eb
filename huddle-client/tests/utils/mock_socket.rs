use async_trait::async_trait;
use huddle_client::error::SignalingError;
use huddle_client::signaling::{SocketConnector, SocketFrame, SocketHandle, SocketSink};
use huddle_core::SignalMessage;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use url::Url;

/// Scripted signaling transport. Captures everything the adapter sends
/// (across reconnects) and lets tests inject inbound frames on the
/// connection that is currently live.
#[derive(Default)]
pub struct MockSocketConnector {
    sent: Arc<Mutex<Vec<String>>>,
    fail_sends: Arc<AtomicBool>,
    frame_tx: Mutex<Option<mpsc::Sender<SocketFrame>>>,
    urls: Mutex<Vec<Url>>,
    connects: AtomicUsize,
    fail_connects: AtomicBool,
}

struct MockSink {
    sent: Arc<Mutex<Vec<String>>>,
    fail_sends: Arc<AtomicBool>,
}

#[async_trait]
impl SocketSink for MockSink {
    async fn send(&mut self, text: String) -> Result<(), SignalingError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SignalingError::Closed);
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&mut self) {}
}

impl MockSocketConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn set_fail_connects(&self, fail: bool) {
        self.fail_connects.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Every message sent so far, decoded, in order, across all
    /// connections.
    pub fn sent_messages(&self) -> Vec<SignalMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|text| serde_json::from_str(text).expect("adapter sent invalid JSON"))
            .collect()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn last_url(&self) -> Option<Url> {
        self.urls.lock().unwrap().last().cloned()
    }

    /// Deliver a message on the live connection.
    pub async fn push_message(&self, message: &SignalMessage) {
        let text = serde_json::to_string(message).expect("failed to encode test message");
        let tx = self
            .frame_tx
            .lock()
            .unwrap()
            .clone()
            .expect("no live connection to push into");
        tx.send(SocketFrame::Text(text))
            .await
            .expect("adapter read pump gone");
    }

    /// Close the live connection with the given code.
    pub async fn push_close(&self, code: Option<u16>) {
        let tx = self
            .frame_tx
            .lock()
            .unwrap()
            .clone()
            .expect("no live connection to close");
        let _ = tx.send(SocketFrame::Closed { code }).await;
    }
}

#[async_trait]
impl SocketConnector for MockSocketConnector {
    async fn connect(&self, url: &Url) -> Result<SocketHandle, SignalingError> {
        if self.fail_connects.load(Ordering::SeqCst) {
            return Err(SignalingError::Connect("mock connector refusal".to_string()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.clone());

        let (frame_tx, frame_rx) = mpsc::channel(64);
        *self.frame_tx.lock().unwrap() = Some(frame_tx);

        Ok(SocketHandle {
            sink: Box::new(MockSink {
                sent: self.sent.clone(),
                fail_sends: self.fail_sends.clone(),
            }),
            frames: frame_rx,
        })
    }
}
