mod command;
mod controller;
mod directory;
mod event;
mod handle;

pub use command::RoomCommand;
pub use controller::RoomSessionController;
pub use directory::ParticipantDirectory;
pub use event::RoomEvent;
pub use handle::RoomHandle;
