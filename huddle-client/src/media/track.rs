use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Control handle over one capture track. The actual sample flow stays
/// inside the capture provider and the peer transport; this layer only
/// toggles, stops and substitutes tracks.
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    /// A disabled track keeps flowing at the transport layer but
    /// carries silence/blank frames, which preserves connection
    /// stability across mute toggles.
    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    /// False once the track was stopped or its source ended.
    fn is_live(&self) -> bool;

    fn stop(&self);

    /// Hook fired when the source terminates itself, e.g. the user
    /// ends a screen capture from the OS picker.
    fn set_on_ended(&self, callback: Box<dyn Fn() + Send + Sync>);

    fn as_any(&self) -> &dyn Any;
}

/// A bundle of tracks sharing one source, local or remote.
#[derive(Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks_of(TrackKind::Audio)
    }

    pub fn video_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks_of(TrackKind::Video)
    }

    fn tracks_of(&self, kind: TrackKind) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .filter(|t| t.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn contains_track(&self, id: &str) -> bool {
        self.tracks.iter().any(|t| t.id() == id)
    }

    pub fn add_track(&mut self, track: Arc<dyn MediaTrack>) {
        self.tracks.push(track);
    }

    /// Swap the stream's video track for another one, returning the
    /// track that was replaced. The outgoing peer sessions substitute
    /// the same track separately; this only updates local bookkeeping.
    pub fn replace_video_track(
        &mut self,
        track: Arc<dyn MediaTrack>,
    ) -> Option<Arc<dyn MediaTrack>> {
        let slot = self.tracks.iter_mut().find(|t| t.kind() == TrackKind::Video);
        match slot {
            Some(existing) => Some(std::mem::replace(existing, track)),
            None => {
                self.tracks.push(track);
                None
            }
        }
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}
