use huddle_core::{Participant, ParticipantId};
use std::collections::HashMap;

/// Bookkeeping of who is in the room right now, keyed by participant
/// id so no two live entries can share one. Pure state; all membership
/// decisions stay in the controller.
#[derive(Debug, Default)]
pub struct ParticipantDirectory {
    entries: HashMap<ParticipantId, Participant>,
}

impl ParticipantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, participant: Participant) {
        self.entries.insert(participant.id.clone(), participant);
    }

    pub fn remove(&mut self, id: &ParticipantId) -> Option<Participant> {
        self.entries.remove(id)
    }

    /// Replace the whole roster, e.g. from a server snapshot.
    pub fn replace_all(&mut self, participants: Vec<Participant>) {
        self.entries = participants
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn name_of(&self, id: &ParticipantId) -> Option<&str> {
        self.entries.get(id).map(|p| p.name.as_str())
    }

    /// Roster in id order, so listeners see a deterministic sequence.
    pub fn list(&self) -> Vec<Participant> {
        let mut participants: Vec<Participant> = self.entries.values().cloned().collect();
        participants.sort_by(|a, b| a.id.cmp(&b.id));
        participants
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
