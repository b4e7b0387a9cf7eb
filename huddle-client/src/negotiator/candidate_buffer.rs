use huddle_core::IceCandidateInit;
use std::collections::VecDeque;
use tracing::warn;

/// Holds ICE candidates that arrived before the remote description was
/// applied. Bounded: when full, the oldest entries are shed so that
/// only the most recent `capacity - 1` remain including the newcomer.
/// Candidates keep arrival order and are drained exactly once.
pub struct CandidateBuffer {
    entries: VecDeque<IceCandidateInit>,
    capacity: usize,
}

impl CandidateBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, candidate: IceCandidateInit) {
        if self.entries.len() >= self.capacity {
            let mut dropped = 0usize;
            while !self.entries.is_empty() && self.entries.len() + 1 >= self.capacity {
                self.entries.pop_front();
                dropped += 1;
            }
            warn!(
                dropped,
                capacity = self.capacity,
                "ICE candidate buffer overflow, oldest entries discarded"
            );
        }
        self.entries.push_back(candidate);
    }

    pub fn drain(&mut self) -> Vec<IceCandidateInit> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
