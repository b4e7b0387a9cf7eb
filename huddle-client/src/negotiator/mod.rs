mod candidate_buffer;
mod session_negotiator;

pub use candidate_buffer::CandidateBuffer;
pub use session_negotiator::{
    NegotiationPhase, RecoveryAction, SessionNegotiator, SignalingState,
};
