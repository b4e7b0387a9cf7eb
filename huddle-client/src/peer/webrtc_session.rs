use crate::error::PeerSessionError;
use crate::media::{MediaStream, MediaTrack, TrackKind};
use crate::peer::event::PeerEvent;
use crate::peer::session::{ConnectivityState, PeerSession, PeerSessionFactory};
use async_trait::async_trait;
use huddle_core::{IceCandidateInit, IceServerConfig, ParticipantId, SdpType, SessionDescription};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

type OnEnded = std::sync::Mutex<Option<Box<dyn Fn() + Send + Sync>>>;

/// Local capture track backed by a `webrtc` sample track. The capture
/// pipeline writes media samples through `sample_track()`; this handle
/// only carries control state.
pub struct LocalRtcTrack {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    live: AtomicBool,
    on_ended: OnEnded,
    inner: Arc<TrackLocalStaticSample>,
}

impl LocalRtcTrack {
    pub fn audio(id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self::with_mime(id, stream_id, TrackKind::Audio, MIME_TYPE_OPUS)
    }

    pub fn video(id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self::with_mime(id, stream_id, TrackKind::Video, MIME_TYPE_VP8)
    }

    fn with_mime(
        id: impl Into<String>,
        stream_id: impl Into<String>,
        kind: TrackKind,
        mime_type: &str,
    ) -> Self {
        let id = id.into();
        let inner = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            id.clone(),
            stream_id.into(),
        ));
        Self {
            id,
            kind,
            enabled: AtomicBool::new(true),
            live: AtomicBool::new(true),
            on_ended: OnEnded::default(),
            inner,
        }
    }

    /// The underlying sample sink for the capture pipeline.
    pub fn sample_track(&self) -> Arc<TrackLocalStaticSample> {
        self.inner.clone()
    }

    /// To be called by the capture pipeline when the source terminates
    /// itself (e.g. the user ends a screen capture from the OS).
    pub fn notify_ended(&self) {
        self.live.store(false, Ordering::SeqCst);
        if let Ok(guard) = self.on_ended.lock() {
            if let Some(callback) = guard.as_ref() {
                callback();
            }
        }
    }
}

impl MediaTrack for LocalRtcTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn set_on_ended(&self, callback: Box<dyn Fn() + Send + Sync>) {
        if let Ok(mut guard) = self.on_ended.lock() {
            *guard = Some(callback);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Read-side wrapper over an inbound `webrtc` track.
struct RemoteRtcTrack {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    live: AtomicBool,
    on_ended: OnEnded,
    _inner: Arc<TrackRemote>,
}

impl RemoteRtcTrack {
    fn new(inner: Arc<TrackRemote>) -> Self {
        let kind = match inner.kind() {
            RTPCodecType::Audio => TrackKind::Audio,
            _ => TrackKind::Video,
        };
        Self {
            id: inner.id(),
            kind,
            enabled: AtomicBool::new(true),
            live: AtomicBool::new(true),
            on_ended: OnEnded::default(),
            _inner: inner,
        }
    }
}

impl MediaTrack for RemoteRtcTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn set_on_ended(&self, callback: Box<dyn Fn() + Send + Sync>) {
        if let Ok(mut guard) = self.on_ended.lock() {
            *guard = Some(callback);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One media transport session backed by `webrtc::RTCPeerConnection`.
struct WebRtcPeerSession {
    participant_id: ParticipantId,
    pc: Arc<RTCPeerConnection>,
    senders: Mutex<Vec<(TrackKind, Arc<RTCRtpSender>)>>,
}

fn map_state(state: RTCPeerConnectionState) -> ConnectivityState {
    match state {
        RTCPeerConnectionState::New | RTCPeerConnectionState::Unspecified => ConnectivityState::New,
        RTCPeerConnectionState::Connecting => ConnectivityState::Checking,
        RTCPeerConnectionState::Connected => ConnectivityState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectivityState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectivityState::Failed,
        RTCPeerConnectionState::Closed => ConnectivityState::Closed,
    }
}

fn to_rtc_description(desc: &SessionDescription) -> Result<RTCSessionDescription, PeerSessionError> {
    let result = match desc.kind {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp.clone()),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp.clone()),
    };
    result.map_err(|e| PeerSessionError::RemoteDescription(e.to_string()))
}

fn from_rtc_description(desc: &RTCSessionDescription, kind: SdpType) -> SessionDescription {
    SessionDescription {
        kind,
        sdp: desc.sdp.clone(),
    }
}

fn local_track_of(track: &Arc<dyn MediaTrack>) -> Result<&LocalRtcTrack, PeerSessionError> {
    track
        .as_any()
        .downcast_ref::<LocalRtcTrack>()
        .ok_or_else(|| {
            PeerSessionError::TrackAttach(
                "webrtc sessions can only carry LocalRtcTrack instances".to_owned(),
            )
        })
}

#[async_trait]
impl PeerSession for WebRtcPeerSession {
    async fn create_offer(
        &self,
        ice_restart: bool,
    ) -> Result<SessionDescription, PeerSessionError> {
        let options = RTCOfferOptions {
            ice_restart,
            ..Default::default()
        };
        let offer = self
            .pc
            .create_offer(Some(options))
            .await
            .map_err(|e| PeerSessionError::LocalDescription(e.to_string()))?;
        Ok(from_rtc_description(&offer, SdpType::Offer))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerSessionError> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| PeerSessionError::LocalDescription(e.to_string()))?;
        Ok(from_rtc_description(&answer, SdpType::Answer))
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), PeerSessionError> {
        let rtc_desc = to_rtc_description(&desc)?;
        self.pc
            .set_local_description(rtc_desc)
            .await
            .map_err(|e| PeerSessionError::LocalDescription(e.to_string()))
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), PeerSessionError> {
        let rtc_desc = to_rtc_description(&desc)?;
        self.pc
            .set_remote_description(rtc_desc)
            .await
            .map_err(|e| PeerSessionError::RemoteDescription(e.to_string()))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), PeerSessionError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: None,
        };
        self.pc
            .add_ice_candidate(init)
            .await
            .map_err(|e| PeerSessionError::Candidate(e.to_string()))
    }

    async fn attach_track(&self, track: Arc<dyn MediaTrack>) -> Result<(), PeerSessionError> {
        let local = local_track_of(&track)?;
        let sender = self
            .pc
            .add_track(local.sample_track() as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| PeerSessionError::TrackAttach(e.to_string()))?;
        debug!(participant_id = %self.participant_id, track_id = track.id(), "Local track attached");
        self.senders.lock().await.push((track.kind(), sender));
        Ok(())
    }

    async fn replace_video_track(
        &self,
        track: Arc<dyn MediaTrack>,
    ) -> Result<(), PeerSessionError> {
        let local = local_track_of(&track)?;
        let senders = self.senders.lock().await;
        let Some((_, sender)) = senders.iter().find(|(kind, _)| *kind == TrackKind::Video) else {
            return Err(PeerSessionError::TrackAttach(
                "no outgoing video sender to substitute".to_owned(),
            ));
        };
        sender
            .replace_track(Some(
                local.sample_track() as Arc<dyn TrackLocal + Send + Sync>
            ))
            .await
            .map_err(|e| PeerSessionError::TrackAttach(e.to_string()))
    }

    fn connectivity(&self) -> ConnectivityState {
        map_state(self.pc.connection_state())
    }

    async fn close(&self) {
        if let Err(e) = self.pc.close().await {
            warn!(participant_id = %self.participant_id, "Error closing peer connection: {:?}", e);
        }
    }
}

/// Builds `webrtc`-backed peer sessions wired to push their callback
/// activity into the controller's event queue.
pub struct WebRtcSessionFactory {
    ice_servers: Vec<IceServerConfig>,
}

impl WebRtcSessionFactory {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: self
                .ice_servers
                .iter()
                .map(|s| RTCIceServer {
                    urls: s.urls.clone(),
                    username: s.username.clone().unwrap_or_default(),
                    credential: s.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PeerSessionFactory for WebRtcSessionFactory {
    async fn create(
        &self,
        participant_id: ParticipantId,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerSession>, PeerSessionError> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| PeerSessionError::Create(e.to_string()))?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(|e| PeerSessionError::Create(e.to_string()))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let pc = Arc::new(
            api.new_peer_connection(self.rtc_configuration())
                .await
                .map_err(|e| PeerSessionError::Create(e.to_string()))?,
        );

        let state_tx = events.clone();
        let state_id = participant_id.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            let participant_id = state_id.clone();

            Box::pin(async move {
                info!(%participant_id, state = ?s, "Peer connection state changed");
                let _ = tx
                    .send(PeerEvent::ConnectivityChanged {
                        participant_id,
                        state: map_state(s),
                    })
                    .await;
            })
        }));

        let ice_tx = events.clone();
        let ice_id = participant_id.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let participant_id = ice_id.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(json) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(PeerEvent::CandidateGenerated {
                        participant_id,
                        candidate: IceCandidateInit {
                            candidate: json.candidate,
                            sdp_mid: json.sdp_mid,
                            sdp_m_line_index: json.sdp_mline_index,
                        },
                    })
                    .await;
            })
        }));

        let track_tx = events.clone();
        let track_id = participant_id.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            let participant_id = track_id.clone();

            Box::pin(async move {
                let stream_id = track.stream_id();
                debug!(%participant_id, stream_id, "Remote track received");
                let wrapped: Arc<dyn MediaTrack> = Arc::new(RemoteRtcTrack::new(track));
                let _ = tx
                    .send(PeerEvent::RemoteStream {
                        participant_id,
                        stream: MediaStream::new(stream_id, vec![wrapped]),
                    })
                    .await;
            })
        }));

        Ok(Arc::new(WebRtcPeerSession {
            participant_id,
            pc,
            senders: Mutex::new(Vec::new()),
        }))
    }
}
