use crate::error::PeerSessionError;
use crate::media::MediaTrack;
use crate::peer::PeerEvent;
use async_trait::async_trait;
use huddle_core::{IceCandidateInit, ParticipantId, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Connectivity of one media transport session, as reported by the
/// underlying ICE machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    New,
    Checking,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// The SDP/ICE primitive consumed by a session negotiator: one
/// RTCPeerConnection-equivalent. Implementations push `PeerEvent`s
/// into the channel handed to the factory instead of invoking
/// callbacks, which keeps all reactions on the controller's single
/// event loop.
#[async_trait]
pub trait PeerSession: Send + Sync {
    /// Produce a local offer. `ice_restart` renegotiates the network
    /// path of an existing session without changing party roles.
    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription, PeerSessionError>;

    async fn create_answer(&self) -> Result<SessionDescription, PeerSessionError>;

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), PeerSessionError>;

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), PeerSessionError>;

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), PeerSessionError>;

    /// Attach one local capture track to the outgoing session.
    async fn attach_track(&self, track: Arc<dyn MediaTrack>) -> Result<(), PeerSessionError>;

    /// Substitute the outgoing video track without renegotiating.
    async fn replace_video_track(
        &self,
        track: Arc<dyn MediaTrack>,
    ) -> Result<(), PeerSessionError>;

    fn connectivity(&self) -> ConnectivityState;

    async fn close(&self);
}

#[async_trait]
pub trait PeerSessionFactory: Send + Sync {
    /// Create a session for one remote participant. All events it
    /// generates carry that participant id and flow through `events`.
    async fn create(
        &self,
        participant_id: ParticipantId,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerSession>, PeerSessionError>;
}
