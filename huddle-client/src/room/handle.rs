use crate::error::RoomError;
use crate::media::RemoteStreamMap;
use crate::room::RoomCommand;
use huddle_core::RoomId;
use tokio::sync::{mpsc, oneshot};

/// The UI-facing handle to one room session. Cheap to clone; every
/// method is a command posted to the controller loop, answered over a
/// oneshot.
#[derive(Clone)]
pub struct RoomHandle {
    commands: mpsc::Sender<RoomCommand>,
    remote_streams: RemoteStreamMap,
}

impl RoomHandle {
    pub(crate) fn new(commands: mpsc::Sender<RoomCommand>, remote_streams: RemoteStreamMap) -> Self {
        Self {
            commands,
            remote_streams,
        }
    }

    pub async fn join(&self, room_id: RoomId) -> Result<(), RoomError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RoomCommand::Join { room_id, reply })
            .await
            .map_err(|_| RoomError::ControllerGone)?;
        response.await.map_err(|_| RoomError::ControllerGone)?
    }

    pub async fn leave(&self) -> Result<(), RoomError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RoomCommand::Leave { reply })
            .await
            .map_err(|_| RoomError::ControllerGone)?;
        response.await.map_err(|_| RoomError::ControllerGone)?
    }

    /// Returns the new muted state.
    pub async fn toggle_mute(&self) -> Result<bool, RoomError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RoomCommand::ToggleMute { reply })
            .await
            .map_err(|_| RoomError::ControllerGone)?;
        response.await.map_err(|_| RoomError::ControllerGone)
    }

    /// Returns the new video-off state.
    pub async fn toggle_video(&self) -> Result<bool, RoomError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RoomCommand::ToggleVideo { reply })
            .await
            .map_err(|_| RoomError::ControllerGone)?;
        response.await.map_err(|_| RoomError::ControllerGone)
    }

    pub async fn start_screen_share(&self) -> Result<(), RoomError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RoomCommand::StartScreenShare { reply })
            .await
            .map_err(|_| RoomError::ControllerGone)?;
        response.await.map_err(|_| RoomError::ControllerGone)?
    }

    pub async fn stop_screen_share(&self) -> Result<(), RoomError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RoomCommand::StopScreenShare { reply })
            .await
            .map_err(|_| RoomError::ControllerGone)?;
        response.await.map_err(|_| RoomError::ControllerGone)?
    }

    pub async fn send_chat(&self, content: impl Into<String>) -> Result<(), RoomError> {
        self.commands
            .send(RoomCommand::SendChat {
                content: content.into(),
            })
            .await
            .map_err(|_| RoomError::ControllerGone)
    }

    /// Stop the controller loop entirely (leaves the room first).
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.commands
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::ControllerGone)
    }

    /// Live view of the remote streams, keyed by participant. The UI
    /// binds video elements to entries of this map and re-reads it on
    /// stream added/removed events.
    pub fn remote_streams(&self) -> RemoteStreamMap {
        self.remote_streams.clone()
    }
}
