use crate::peer::ConnectivityState;
use huddle_core::{ChatMessage, Participant, ParticipantId, RoomId};

/// Notifications surfaced to the embedding UI layer. Remote video
/// binding points live in the shared `RemoteStreamMap`; these events
/// tell the UI when to re-read it.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    Joined {
        room_id: RoomId,
    },
    Left,
    ParticipantsChanged {
        participants: Vec<Participant>,
    },
    RemoteStreamAdded {
        participant_id: ParticipantId,
    },
    RemoteStreamRemoved {
        participant_id: ParticipantId,
    },
    Chat {
        message: ChatMessage,
    },
    ChatHistory {
        messages: Vec<ChatMessage>,
    },
    PeerConnectivity {
        participant_id: ParticipantId,
        state: ConnectivityState,
    },
    /// The signaling channel closed abnormally; negotiations were torn
    /// down and a reconnect is pending.
    SignalingReset,
    ScreenShareChanged {
        active: bool,
    },
}
