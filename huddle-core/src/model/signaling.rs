use crate::model::chat::ChatMessage;
use crate::model::participant::{Participant, ParticipantId, ParticipantUpdate};
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// An SDP blob as carried in `offer`/`answer` payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One network-path descriptor, as carried in `ice-candidate` payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinData {
    pub user_id: ParticipantId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveData {
    pub user_id: ParticipantId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsSnapshotData {
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryData {
    pub messages: Vec<ChatMessage>,
}

/// Everything that travels over the signaling channel, in both
/// directions. Closed set: adding a message type forces every match
/// over this enum to be revisited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    Join {
        room_id: RoomId,
        data: JoinData,
    },
    Leave {
        room_id: RoomId,
        data: LeaveData,
    },
    Offer {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_id: Option<ParticipantId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_session_id: Option<ParticipantId>,
        data: SessionDescription,
    },
    Answer {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_id: Option<ParticipantId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_session_id: Option<ParticipantId>,
        data: SessionDescription,
    },
    IceCandidate {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_id: Option<ParticipantId>,
        data: IceCandidateInit,
    },
    Chat {
        room_id: RoomId,
        data: ChatMessage,
    },
    Participant {
        data: ParticipantUpdate,
    },
    ParticipantsSnapshot {
        data: ParticipantsSnapshotData,
    },
    ChatHistory {
        data: ChatHistoryData,
    },
}

impl SignalMessage {
    /// Room the message belongs to, when the wire shape carries one.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            SignalMessage::Join { room_id, .. }
            | SignalMessage::Leave { room_id, .. }
            | SignalMessage::Offer { room_id, .. }
            | SignalMessage::Answer { room_id, .. }
            | SignalMessage::IceCandidate { room_id, .. }
            | SignalMessage::Chat { room_id, .. } => Some(room_id),
            SignalMessage::Participant { .. }
            | SignalMessage::ParticipantsSnapshot { .. }
            | SignalMessage::ChatHistory { .. } => None,
        }
    }
}
