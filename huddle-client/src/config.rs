use huddle_core::IceServerConfig;
use std::time::Duration;

/// Tunables for a room session. Defaults match the behavior of the
/// reference deployment: 3 send attempts spaced 1s apart, a 3s
/// reconnect delay, and a 5-slot ICE candidate buffer.
#[derive(Clone)]
pub struct RoomConfig {
    /// Base URL of the signaling server, e.g. `ws://host:8080`. The
    /// adapter appends `/ws/signaling/{roomId}?userId={participantId}`.
    pub signaling_url: String,
    pub ice_servers: Vec<IceServerConfig>,
    /// Delay before reconnecting after an abnormal channel closure.
    pub reconnect_delay: Duration,
    /// Bound on delivery attempts for one signaling message.
    pub send_attempts: u32,
    /// Spacing between those attempts.
    pub send_retry_spacing: Duration,
    /// Capacity of the per-peer pending ICE candidate buffer.
    pub candidate_buffer_capacity: usize,
    /// Bound on per-peer negotiation recovery attempts before the
    /// negotiator is destroyed for good.
    pub max_recovery_attempts: u32,
    /// Base delay between negotiation recovery attempts; scales
    /// linearly with the attempt count.
    pub negotiation_retry_delay: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://localhost:8080".to_owned(),
            ice_servers: vec![IceServerConfig {
                urls: vec!["stun:stun.l.google.com:19302".to_owned()],
                username: None,
                credential: None,
            }],
            reconnect_delay: Duration::from_secs(3),
            send_attempts: 3,
            send_retry_spacing: Duration::from_secs(1),
            candidate_buffer_capacity: 5,
            max_recovery_attempts: 3,
            negotiation_retry_delay: Duration::from_secs(1),
        }
    }
}
