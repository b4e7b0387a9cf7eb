mod capture;
mod registry;
mod track;

pub use capture::MediaSource;
pub use registry::{MediaStreamRegistry, RemoteStream, RemoteStreamMap};
pub use track::{MediaStream, MediaTrack, TrackKind};
