use crate::error::{CaptureError, PeerSessionError};
use crate::media::capture::MediaSource;
use crate::media::track::{MediaStream, MediaTrack};
use crate::peer::PeerSession;
use dashmap::DashMap;
use huddle_core::ParticipantId;
use std::sync::Arc;
use tracing::{debug, info};

/// Remote streams keyed by participant, shared with the UI layer as
/// read-only video binding points.
pub type RemoteStreamMap = Arc<DashMap<ParticipantId, RemoteStream>>;

#[derive(Debug, Clone)]
pub struct RemoteStream {
    pub stream: MediaStream,
    pub display_name: String,
}

/// Owns the local capture state and the per-participant remote
/// streams. Session negotiators borrow track references to attach
/// them; they never own media.
pub struct MediaStreamRegistry {
    source: Arc<dyn MediaSource>,
    local: Option<MediaStream>,
    is_muted: bool,
    is_video_off: bool,
    /// Camera track parked while a screen capture replaces it.
    saved_camera: Option<Arc<dyn MediaTrack>>,
    screen_track: Option<Arc<dyn MediaTrack>>,
    remote: RemoteStreamMap,
}

impl MediaStreamRegistry {
    pub fn new(source: Arc<dyn MediaSource>, remote: RemoteStreamMap) -> Self {
        Self {
            source,
            local: None,
            is_muted: false,
            is_video_off: false,
            saved_camera: None,
            screen_track: None,
            remote,
        }
    }

    /// Capture the local camera/microphone stream. Failure here is
    /// fatal for room entry and is the only capture fault surfaced to
    /// the caller.
    pub async fn initialize_local(&mut self) -> Result<MediaStream, CaptureError> {
        if let Some(existing) = &self.local {
            return Ok(existing.clone());
        }

        let stream = self.source.capture_user_media().await?;
        info!(
            stream_id = stream.id(),
            tracks = stream.tracks().len(),
            "Local media stream initialized"
        );
        self.local = Some(stream.clone());
        Ok(stream)
    }

    pub fn local_stream(&self) -> Option<&MediaStream> {
        self.local.as_ref()
    }

    pub async fn attach_local_tracks_to(
        &self,
        session: &dyn PeerSession,
    ) -> Result<(), PeerSessionError> {
        let Some(local) = &self.local else {
            return Err(PeerSessionError::TrackAttach(
                "local media is not initialized".to_owned(),
            ));
        };

        for track in local.tracks() {
            session.attach_track(track.clone()).await?;
        }
        Ok(())
    }

    /// Install (or replace) the remote stream for a participant. The
    /// previous stream's tracks are stopped first so stale capture
    /// resources never leak.
    pub fn upsert_remote(
        &self,
        participant_id: ParticipantId,
        stream: MediaStream,
        display_name: String,
    ) {
        if let Some(mut previous) = self.remote.get_mut(&participant_id) {
            // Tracks of one source can arrive separately; same stream
            // id means merge, not replace.
            if previous.stream.id() == stream.id() {
                for track in stream.tracks() {
                    if !previous.stream.contains_track(track.id()) {
                        previous.stream.add_track(track.clone());
                    }
                }
                return;
            }
            previous.stream.stop_all();
        }
        debug!(%participant_id, stream_id = stream.id(), "Remote stream installed");
        self.remote.insert(
            participant_id,
            RemoteStream {
                stream,
                display_name,
            },
        );
    }

    pub fn remove_remote(&self, participant_id: &ParticipantId) {
        if let Some((_, entry)) = self.remote.remove(participant_id) {
            entry.stream.stop_all();
            debug!(%participant_id, "Remote stream removed");
        }
    }

    pub fn remote_map(&self) -> RemoteStreamMap {
        self.remote.clone()
    }

    /// Flip the enabled flag on local audio tracks. Returns the new
    /// muted state.
    pub fn toggle_mute(&mut self) -> bool {
        self.is_muted = !self.is_muted;
        if let Some(local) = &self.local {
            for track in local.audio_tracks() {
                track.set_enabled(!self.is_muted);
            }
        }
        self.is_muted
    }

    /// Flip the enabled flag on local video tracks. Returns the new
    /// video-off state.
    pub fn toggle_video(&mut self) -> bool {
        self.is_video_off = !self.is_video_off;
        if let Some(local) = &self.local {
            for track in local.video_tracks() {
                track.set_enabled(!self.is_video_off);
            }
        }
        self.is_video_off
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn is_video_off(&self) -> bool {
        self.is_video_off
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.screen_track.is_some()
    }

    /// Capture a display stream and swap its video track into the
    /// local stream, parking the camera track for later restoration.
    /// Returns the screen track so the caller can substitute it on the
    /// live peer sessions and hook its termination.
    pub async fn start_screen_share(&mut self) -> Result<Arc<dyn MediaTrack>, CaptureError> {
        let display = self.source.capture_display_media().await?;
        let Some(screen) = display.video_tracks().into_iter().next() else {
            return Err(CaptureError::Unavailable(
                "display capture produced no video track".to_owned(),
            ));
        };

        screen.set_enabled(true);
        if let Some(local) = self.local.as_mut() {
            if let Some(camera) = local.replace_video_track(screen.clone()) {
                self.saved_camera = Some(camera);
            }
        }
        self.screen_track = Some(screen.clone());
        info!(track_id = screen.id(), "Screen share started");
        Ok(screen)
    }

    /// Stop the screen capture and restore the camera track, grabbing
    /// a fresh one if the original is no longer live. Returns the
    /// restored track for substitution on the peer sessions.
    pub async fn stop_screen_share(&mut self) -> Result<Arc<dyn MediaTrack>, CaptureError> {
        if let Some(screen) = self.screen_track.take() {
            screen.stop();
        }

        let camera = match self.saved_camera.take() {
            Some(track) if track.is_live() => track,
            _ => {
                debug!("Original camera track is gone, recapturing");
                let fresh = self.source.capture_user_media().await?;
                let Some(video) = fresh.video_tracks().into_iter().next() else {
                    return Err(CaptureError::Unavailable(
                        "camera recapture produced no video track".to_owned(),
                    ));
                };
                // Only the video track is wanted here.
                for track in fresh.audio_tracks() {
                    track.stop();
                }
                video
            }
        };

        camera.set_enabled(!self.is_video_off);
        if let Some(local) = self.local.as_mut() {
            local.replace_video_track(camera.clone());
        }
        info!(track_id = camera.id(), "Screen share stopped, camera restored");
        Ok(camera)
    }

    /// Stop and drop every local capture resource. Remote entries are
    /// removed one by one as their negotiators are destroyed.
    pub fn release_local(&mut self) {
        if let Some(local) = self.local.take() {
            local.stop_all();
        }
        if let Some(screen) = self.screen_track.take() {
            screen.stop();
        }
        if let Some(camera) = self.saved_camera.take() {
            camera.stop();
        }
        self.is_muted = false;
        self.is_video_off = false;
    }
}
