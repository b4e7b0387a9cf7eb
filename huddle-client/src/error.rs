use thiserror::Error;

/// Faults on the signaling channel transport itself.
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("failed to connect signaling channel: {0}")]
    Connect(String),
    #[error("signaling channel is closed")]
    Closed,
    #[error("invalid signaling url: {0}")]
    Url(String),
    #[error("failed to encode signaling message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Faults raised by the SDP/ICE primitive during negotiation.
#[derive(Debug, Error)]
pub enum PeerSessionError {
    #[error("failed to create peer session: {0}")]
    Create(String),
    #[error("failed to produce local description: {0}")]
    LocalDescription(String),
    #[error("remote description rejected: {0}")]
    RemoteDescription(String),
    #[error("failed to apply ICE candidate: {0}")]
    Candidate(String),
    #[error("failed to attach local track: {0}")]
    TrackAttach(String),
    #[error("offer could not be delivered over the signaling channel")]
    SignalingSend,
    #[error("peer session is closed")]
    Closed,
}

/// Media capture denial or absence. The only fault class that is
/// surfaced to the caller and blocks room entry.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("media capture denied: {0}")]
    Denied(String),
    #[error("no capture device available: {0}")]
    Unavailable(String),
}

/// Errors returned through the public room handle.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Signaling(#[from] SignalingError),
    #[error("already joined to room {0}")]
    AlreadyJoined(huddle_core::RoomId),
    #[error("not joined to any room")]
    NotJoined,
    #[error("room controller is no longer running")]
    ControllerGone,
}
