use crate::error::RoomError;
use huddle_core::{ParticipantId, RoomId};
use tokio::sync::oneshot;

/// Everything the controller's event loop can be asked to do. Public
/// commands come from `RoomHandle`; the retry and screen-share-ended
/// variants are fed back by the controller's own timers and track
/// hooks, so that all state changes happen on the loop.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        room_id: RoomId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    ToggleMute {
        reply: oneshot::Sender<bool>,
    },
    ToggleVideo {
        reply: oneshot::Sender<bool>,
    },
    StartScreenShare {
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    StopScreenShare {
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    SendChat {
        content: String,
    },
    /// Internal: a negotiation recovery timer fired.
    RetryNegotiation {
        participant_id: ParticipantId,
        ice_restart: bool,
    },
    /// Internal: the screen capture track ended on its own.
    ScreenShareEnded,
    Shutdown,
}
