mod adapter;
mod socket;
mod ws;

pub use adapter::{ClosureKind, SignalEvent, SignalingAdapter};
pub use socket::{CLOSE_GOING_AWAY, CLOSE_NORMAL, SocketConnector, SocketFrame, SocketHandle, SocketSink};
pub use ws::WsSocketConnector;
