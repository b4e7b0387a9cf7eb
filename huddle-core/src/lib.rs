pub mod model;

pub use model::{
    ChatHistoryData, ChatKind, ChatMessage, IceCandidateInit, IceServerConfig, JoinData,
    LeaveData, Participant, ParticipantAction, ParticipantId, ParticipantUpdate,
    ParticipantsSnapshotData, RoomId, SdpType, SessionDescription, SignalMessage,
};
