use async_trait::async_trait;
use huddle_client::error::PeerSessionError;
use huddle_client::media::{MediaStream, MediaTrack};
use huddle_client::peer::{ConnectivityState, PeerEvent, PeerSession, PeerSessionFactory};
use huddle_core::{IceCandidateInit, ParticipantId, SessionDescription};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Scripted SDP/ICE primitive. Records everything the negotiator does
/// to it and lets the test push peer events into the controller queue
/// as a real session would.
pub struct MockPeerSession {
    participant_id: ParticipantId,
    events: mpsc::Sender<PeerEvent>,
    offer_seq: AtomicUsize,
    ice_restarts: AtomicUsize,
    local_descriptions: Mutex<Vec<SessionDescription>>,
    remote_descriptions: Mutex<Vec<SessionDescription>>,
    candidates: Mutex<Vec<IceCandidateInit>>,
    attached_tracks: Mutex<Vec<Arc<dyn MediaTrack>>>,
    video_substitutions: Mutex<Vec<Arc<dyn MediaTrack>>>,
    connectivity: Mutex<ConnectivityState>,
    fail_next_offer: AtomicBool,
    closed: AtomicBool,
}

impl MockPeerSession {
    fn new(participant_id: ParticipantId, events: mpsc::Sender<PeerEvent>) -> Self {
        Self {
            participant_id,
            events,
            offer_seq: AtomicUsize::new(0),
            ice_restarts: AtomicUsize::new(0),
            local_descriptions: Mutex::new(Vec::new()),
            remote_descriptions: Mutex::new(Vec::new()),
            candidates: Mutex::new(Vec::new()),
            attached_tracks: Mutex::new(Vec::new()),
            video_substitutions: Mutex::new(Vec::new()),
            connectivity: Mutex::new(ConnectivityState::New),
            fail_next_offer: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn offer_count(&self) -> usize {
        self.offer_seq.load(Ordering::SeqCst)
    }

    pub fn ice_restart_count(&self) -> usize {
        self.ice_restarts.load(Ordering::SeqCst)
    }

    pub fn remote_descriptions(&self) -> Vec<SessionDescription> {
        self.remote_descriptions.lock().unwrap().clone()
    }

    pub fn applied_candidates(&self) -> Vec<IceCandidateInit> {
        self.candidates.lock().unwrap().clone()
    }

    pub fn attached_track_ids(&self) -> Vec<String> {
        self.attached_tracks
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.id().to_string())
            .collect()
    }

    pub fn substituted_track_ids(&self) -> Vec<String> {
        self.video_substitutions
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.id().to_string())
            .collect()
    }

    /// Make the next `create_offer` call fail once.
    pub fn set_fail_next_offer(&self) {
        self.fail_next_offer.store(true, Ordering::SeqCst);
    }

    /// Push a connectivity change into the controller queue, as the
    /// ICE machinery would.
    pub async fn emit_connectivity(&self, state: ConnectivityState) {
        *self.connectivity.lock().unwrap() = state;
        self.emit_connectivity_notice(state).await;
    }

    /// Push a connectivity change without moving the session's own
    /// reported state, like a notice that raced the session closing.
    pub async fn emit_connectivity_notice(&self, state: ConnectivityState) {
        self.events
            .send(PeerEvent::ConnectivityChanged {
                participant_id: self.participant_id.clone(),
                state,
            })
            .await
            .expect("controller queue closed");
    }

    pub async fn emit_remote_stream(&self, stream: MediaStream) {
        self.events
            .send(PeerEvent::RemoteStream {
                participant_id: self.participant_id.clone(),
                stream,
            })
            .await
            .expect("controller queue closed");
    }

    pub async fn emit_candidate(&self, candidate: IceCandidateInit) {
        self.events
            .send(PeerEvent::CandidateGenerated {
                participant_id: self.participant_id.clone(),
                candidate,
            })
            .await
            .expect("controller queue closed");
    }
}

#[async_trait]
impl PeerSession for MockPeerSession {
    async fn create_offer(
        &self,
        ice_restart: bool,
    ) -> Result<SessionDescription, PeerSessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PeerSessionError::Closed);
        }
        if self.fail_next_offer.swap(false, Ordering::SeqCst) {
            return Err(PeerSessionError::LocalDescription(
                "mock offer refusal".to_string(),
            ));
        }
        if ice_restart {
            self.ice_restarts.fetch_add(1, Ordering::SeqCst);
        }
        let n = self.offer_seq.fetch_add(1, Ordering::SeqCst);
        Ok(SessionDescription::offer(format!(
            "offer-for-{}-{}",
            self.participant_id, n
        )))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerSessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PeerSessionError::Closed);
        }
        Ok(SessionDescription::answer(format!(
            "answer-for-{}",
            self.participant_id
        )))
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), PeerSessionError> {
        self.local_descriptions.lock().unwrap().push(desc);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), PeerSessionError> {
        self.remote_descriptions.lock().unwrap().push(desc);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), PeerSessionError> {
        self.candidates.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn attach_track(&self, track: Arc<dyn MediaTrack>) -> Result<(), PeerSessionError> {
        self.attached_tracks.lock().unwrap().push(track);
        Ok(())
    }

    async fn replace_video_track(
        &self,
        track: Arc<dyn MediaTrack>,
    ) -> Result<(), PeerSessionError> {
        self.video_substitutions.lock().unwrap().push(track);
        Ok(())
    }

    fn connectivity(&self) -> ConnectivityState {
        *self.connectivity.lock().unwrap()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        *self.connectivity.lock().unwrap() = ConnectivityState::Closed;
    }
}

/// Factory handing out `MockPeerSession`s and keeping every one it
/// ever created for later inspection.
#[derive(Default)]
pub struct MockPeerFactory {
    sessions: Mutex<Vec<Arc<MockPeerSession>>>,
    fail_create: AtomicBool,
    fail_first_offer: AtomicBool,
}

impl MockPeerFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// The next session handed out refuses its first `create_offer`.
    pub fn set_fail_first_offer(&self) {
        self.fail_first_offer.store(true, Ordering::SeqCst);
    }

    pub fn created_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Most recent session created for a participant.
    pub fn session_for(&self, participant_id: &ParticipantId) -> Option<Arc<MockPeerSession>> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.participant_id() == participant_id)
            .cloned()
    }

    pub fn sessions_for(&self, participant_id: &ParticipantId) -> Vec<Arc<MockPeerSession>> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.participant_id() == participant_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PeerSessionFactory for MockPeerFactory {
    async fn create(
        &self,
        participant_id: ParticipantId,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerSession>, PeerSessionError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PeerSessionError::Create("mock factory refusal".to_string()));
        }
        let session = Arc::new(MockPeerSession::new(participant_id, events));
        if self.fail_first_offer.swap(false, Ordering::SeqCst) {
            session.set_fail_next_offer();
        }
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }
}
