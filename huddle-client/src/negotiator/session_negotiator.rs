use crate::error::PeerSessionError;
use crate::media::MediaStreamRegistry;
use crate::negotiator::CandidateBuffer;
use crate::peer::{ConnectivityState, PeerEvent, PeerSession, PeerSessionFactory};
use crate::signaling::SignalingAdapter;
use huddle_core::{IceCandidateInit, ParticipantId, RoomId, SessionDescription, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Where this negotiator stands in the offer/answer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    Idle,
    Offering,
    Answering,
    Stable,
    Reconnecting,
    Closed,
}

/// The three-valued signaling state the offer/answer rules key off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
}

/// What the controller should do about a connectivity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    None,
    /// Renegotiate the network path on the existing session.
    RestartIce,
    /// The session is beyond repair; rebuild it and offer again.
    Recreate,
    /// Recovery budget exhausted; destroy the negotiator.
    GiveUp,
}

/// Drives the offer/answer exchange with exactly one remote
/// participant. Owns the peer session, the pending-candidate buffer,
/// and a bounded recovery counter. Every await is followed by a check
/// of the closed flag so that a teardown during suspension cannot
/// resurrect the exchange.
pub struct SessionNegotiator {
    room_id: RoomId,
    local_id: ParticipantId,
    remote_id: ParticipantId,
    factory: Arc<dyn PeerSessionFactory>,
    peer_events: mpsc::Sender<PeerEvent>,
    session: Arc<dyn PeerSession>,
    phase: NegotiationPhase,
    signaling: SignalingState,
    buffer: CandidateBuffer,
    buffer_capacity: usize,
    max_recovery_attempts: u32,
    /// Set once the remote description has been applied; candidates
    /// arriving before that are buffered.
    remote_set: bool,
    tracks_attached: bool,
    recovery_attempts: u32,
    closed: bool,
}

impl SessionNegotiator {
    pub async fn connect(
        room_id: RoomId,
        local_id: ParticipantId,
        remote_id: ParticipantId,
        factory: Arc<dyn PeerSessionFactory>,
        peer_events: mpsc::Sender<PeerEvent>,
        buffer_capacity: usize,
        max_recovery_attempts: u32,
    ) -> Result<Self, PeerSessionError> {
        let session = factory
            .create(remote_id.clone(), peer_events.clone())
            .await?;
        info!(remote_id = %remote_id, "Session negotiator created");

        Ok(Self {
            room_id,
            local_id,
            remote_id,
            factory,
            peer_events,
            session,
            phase: NegotiationPhase::Idle,
            signaling: SignalingState::Stable,
            buffer: CandidateBuffer::new(buffer_capacity),
            buffer_capacity,
            max_recovery_attempts,
            remote_set: false,
            tracks_attached: false,
            recovery_attempts: 0,
            closed: false,
        })
    }

    pub fn remote_id(&self) -> &ParticipantId {
        &self.remote_id
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    pub fn signaling_state(&self) -> SignalingState {
        self.signaling
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.session.connectivity()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Create and send an offer. Only valid from the stable signaling
    /// state; skipped while the signaling channel is mid-reset, since
    /// any offer sent then would land on a dead connection.
    pub async fn start_offer(
        &mut self,
        ice_restart: bool,
        registry: &MediaStreamRegistry,
        adapter: &mut SignalingAdapter,
    ) -> Result<(), PeerSessionError> {
        if self.closed {
            return Err(PeerSessionError::Closed);
        }
        if adapter.is_resetting() {
            debug!(remote_id = %self.remote_id, "Signaling channel resetting, offer aborted");
            return Ok(());
        }
        if self.signaling != SignalingState::Stable && !ice_restart {
            debug!(
                remote_id = %self.remote_id,
                state = ?self.signaling,
                "Offer skipped outside stable signaling state"
            );
            return Ok(());
        }

        self.attach_local_tracks(registry).await?;

        let offer = self.session.create_offer(ice_restart).await?;
        if self.closed {
            return Err(PeerSessionError::Closed);
        }
        self.session.set_local_description(offer.clone()).await?;
        if self.closed {
            return Err(PeerSessionError::Closed);
        }
        self.signaling = SignalingState::HaveLocalOffer;
        self.phase = NegotiationPhase::Offering;

        let delivered = adapter
            .send(&SignalMessage::Offer {
                room_id: self.room_id.clone(),
                sender_id: Some(self.local_id.clone()),
                target_session_id: Some(self.remote_id.clone()),
                data: offer,
            })
            .await;
        if !delivered {
            return Err(PeerSessionError::SignalingSend);
        }
        info!(remote_id = %self.remote_id, ice_restart, "Offer sent");
        Ok(())
    }

    /// Apply a remote offer and answer it. Glare (an inbound offer
    /// while our own offer is outstanding) is broken deterministically:
    /// the side with the smaller participant id keeps its offer, the
    /// other rolls its session back and answers.
    pub async fn handle_offer(
        &mut self,
        desc: SessionDescription,
        registry: &MediaStreamRegistry,
        adapter: &mut SignalingAdapter,
    ) -> Result<(), PeerSessionError> {
        if self.closed {
            return Err(PeerSessionError::Closed);
        }

        if self.signaling == SignalingState::HaveLocalOffer {
            if self.local_id < self.remote_id {
                info!(
                    remote_id = %self.remote_id,
                    "Offer glare, keeping local offer (smaller id wins)"
                );
                return Ok(());
            }
            info!(
                remote_id = %self.remote_id,
                "Offer glare, yielding to remote offer (larger id rolls back)"
            );
            self.rebuild_session().await?;
        }

        self.session.set_remote_description(desc).await?;
        if self.closed {
            return Err(PeerSessionError::Closed);
        }
        self.remote_set = true;
        self.signaling = SignalingState::HaveRemoteOffer;
        self.phase = NegotiationPhase::Answering;
        self.drain_buffer().await;

        self.attach_local_tracks(registry).await?;

        let answer = self.session.create_answer().await?;
        if self.closed {
            return Err(PeerSessionError::Closed);
        }
        self.session.set_local_description(answer.clone()).await?;
        if self.closed {
            return Err(PeerSessionError::Closed);
        }
        self.signaling = SignalingState::Stable;
        self.phase = NegotiationPhase::Stable;

        let delivered = adapter
            .send(&SignalMessage::Answer {
                room_id: self.room_id.clone(),
                sender_id: Some(self.local_id.clone()),
                target_session_id: Some(self.remote_id.clone()),
                data: answer,
            })
            .await;
        if !delivered {
            return Err(PeerSessionError::SignalingSend);
        }
        info!(remote_id = %self.remote_id, "Answer sent");
        Ok(())
    }

    /// Apply a remote answer. Answers are only meaningful while our
    /// offer is outstanding; anything else is stale (a reconnect or a
    /// glare loser's answer crossing on the wire) and is discarded.
    pub async fn handle_answer(
        &mut self,
        desc: SessionDescription,
    ) -> Result<(), PeerSessionError> {
        if self.closed {
            return Err(PeerSessionError::Closed);
        }
        if self.signaling != SignalingState::HaveLocalOffer {
            warn!(
                remote_id = %self.remote_id,
                state = ?self.signaling,
                "Stale answer discarded"
            );
            return Ok(());
        }

        self.session.set_remote_description(desc).await?;
        if self.closed {
            return Err(PeerSessionError::Closed);
        }
        self.remote_set = true;
        self.signaling = SignalingState::Stable;
        self.phase = NegotiationPhase::Stable;
        self.drain_buffer().await;
        info!(remote_id = %self.remote_id, "Answer applied");
        Ok(())
    }

    /// Apply a remote candidate immediately when the remote description
    /// is in place, otherwise park it in the buffer.
    pub async fn handle_candidate(
        &mut self,
        candidate: IceCandidateInit,
    ) -> Result<(), PeerSessionError> {
        if self.closed {
            return Err(PeerSessionError::Closed);
        }
        if !self.remote_set {
            debug!(remote_id = %self.remote_id, "Remote description pending, candidate buffered");
            self.buffer.push(candidate);
            return Ok(());
        }
        if let Err(e) = self.session.add_ice_candidate(candidate).await {
            // A single bad candidate is not fatal to the exchange.
            warn!(remote_id = %self.remote_id, "Failed to apply ICE candidate: {}", e);
        }
        Ok(())
    }

    /// Classify a connectivity change into the recovery action the
    /// controller should take. Connected clears the recovery budget.
    /// Disconnected and failed both prefer an ICE restart while the
    /// session is still open, since the cheap repair usually suffices;
    /// only a session that is already closed forces a full rebuild.
    /// The budget caps both paths.
    pub fn handle_connectivity(&mut self, state: ConnectivityState) -> RecoveryAction {
        if self.closed {
            return RecoveryAction::None;
        }
        match state {
            ConnectivityState::Connected => {
                self.recovery_attempts = 0;
                self.phase = NegotiationPhase::Stable;
                RecoveryAction::None
            }
            ConnectivityState::Disconnected | ConnectivityState::Failed => {
                if !self.begin_recovery() {
                    return RecoveryAction::GiveUp;
                }
                self.phase = NegotiationPhase::Reconnecting;
                if self.session.connectivity() != ConnectivityState::Closed {
                    RecoveryAction::RestartIce
                } else {
                    RecoveryAction::Recreate
                }
            }
            _ => RecoveryAction::None,
        }
    }

    /// Charge one attempt against the recovery budget. Returns false
    /// once the budget is spent, at which point the negotiator should
    /// be destroyed rather than retried.
    pub fn begin_recovery(&mut self) -> bool {
        self.recovery_attempts += 1;
        if self.recovery_attempts > self.max_recovery_attempts {
            warn!(
                remote_id = %self.remote_id,
                attempts = self.recovery_attempts - 1,
                "Recovery budget exhausted"
            );
            return false;
        }
        true
    }

    pub fn recovery_attempts(&self) -> u32 {
        self.recovery_attempts
    }

    /// Tear down the peer session and build a fresh one, keeping the
    /// recovery counter. Used for the recreate recovery path and for
    /// the glare rollback.
    pub async fn rebuild_session(&mut self) -> Result<(), PeerSessionError> {
        self.session.close().await;
        if self.closed {
            return Err(PeerSessionError::Closed);
        }
        self.session = self
            .factory
            .create(self.remote_id.clone(), self.peer_events.clone())
            .await?;
        self.signaling = SignalingState::Stable;
        self.phase = NegotiationPhase::Idle;
        self.buffer = CandidateBuffer::new(self.buffer_capacity);
        self.remote_set = false;
        self.tracks_attached = false;
        debug!(remote_id = %self.remote_id, "Peer session rebuilt");
        Ok(())
    }

    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.phase = NegotiationPhase::Closed;
        self.session.close().await;
        info!(remote_id = %self.remote_id, "Session negotiator closed");
    }

    /// Substitute the outgoing video track on the live session, used by
    /// screen-share start/stop. No renegotiation.
    pub async fn replace_video_track(
        &self,
        track: Arc<dyn crate::media::MediaTrack>,
    ) -> Result<(), PeerSessionError> {
        if self.closed {
            return Err(PeerSessionError::Closed);
        }
        self.session.replace_video_track(track).await
    }

    async fn attach_local_tracks(
        &mut self,
        registry: &MediaStreamRegistry,
    ) -> Result<(), PeerSessionError> {
        if self.tracks_attached {
            return Ok(());
        }
        registry.attach_local_tracks_to(self.session.as_ref()).await?;
        self.tracks_attached = true;
        Ok(())
    }

    async fn drain_buffer(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let candidates = self.buffer.drain();
        debug!(
            remote_id = %self.remote_id,
            count = candidates.len(),
            "Draining buffered ICE candidates"
        );
        for candidate in candidates {
            if let Err(e) = self.session.add_ice_candidate(candidate).await {
                warn!(remote_id = %self.remote_id, "Buffered ICE candidate rejected: {}", e);
            }
        }
    }
}
