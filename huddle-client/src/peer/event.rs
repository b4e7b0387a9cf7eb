use crate::media::MediaStream;
use crate::peer::ConnectivityState;
use huddle_core::{IceCandidateInit, ParticipantId};

/// Events pushed by a peer session into the room controller's queue.
/// The controller routes them to the owning negotiator; no peer
/// callback ever mutates room state directly.
#[derive(Debug)]
pub enum PeerEvent {
    CandidateGenerated {
        participant_id: ParticipantId,
        candidate: IceCandidateInit,
    },
    RemoteStream {
        participant_id: ParticipantId,
        stream: MediaStream,
    },
    ConnectivityChanged {
        participant_id: ParticipantId,
        state: ConnectivityState,
    },
}
