use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Text,
    System,
}

/// Payload of a `chat` signaling message and the element type of the
/// `chat-history` replay list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub content: String,
    pub sender_id: ParticipantId,
    pub sender_name: String,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    /// Unix timestamp in milliseconds, stamped by the signaling server.
    #[serde(default)]
    pub timestamp: Option<u64>,
}
