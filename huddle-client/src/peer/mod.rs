mod event;
mod session;
mod webrtc_session;

pub use event::PeerEvent;
pub use session::{ConnectivityState, PeerSession, PeerSessionFactory};
pub use webrtc_session::{LocalRtcTrack, WebRtcSessionFactory};
