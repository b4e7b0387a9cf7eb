mod chat;
mod participant;
mod room;
mod signaling;

pub use chat::{ChatKind, ChatMessage};
pub use participant::{Participant, ParticipantAction, ParticipantId, ParticipantUpdate};
pub use room::RoomId;
pub use signaling::{
    ChatHistoryData, IceCandidateInit, IceServerConfig, JoinData, LeaveData,
    ParticipantsSnapshotData, SdpType, SessionDescription, SignalMessage,
};
