pub mod config;
pub mod error;
pub mod media;
pub mod negotiator;
pub mod peer;
pub mod room;
pub mod signaling;

pub use config::RoomConfig;
pub use error::{CaptureError, PeerSessionError, RoomError, SignalingError};
pub use room::{RoomCommand, RoomEvent, RoomHandle, RoomSessionController};
