use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::NoteId;

/// Which connections are currently in which note's room.
///
/// Plain data: no I/O and no permission checks. The broker owns the only
/// instance and mutates it under its lock. A room entry exists only while it
/// has at least one occupant.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    rooms: HashMap<NoteId, HashSet<Uuid>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the connection was not already in the room.
    pub fn join(&mut self, note_id: NoteId, conn_id: Uuid) -> bool {
        self.rooms.entry(note_id).or_default().insert(conn_id)
    }

    /// Returns `true` if the connection was in the room.
    pub fn leave(&mut self, note_id: NoteId, conn_id: Uuid) -> bool {
        let Some(occupants) = self.rooms.get_mut(&note_id) else {
            return false;
        };
        let removed = occupants.remove(&conn_id);
        if occupants.is_empty() {
            self.rooms.remove(&note_id);
        }
        removed
    }

    pub fn list_occupants(&self, note_id: NoteId) -> HashSet<Uuid> {
        self.rooms.get(&note_id).cloned().unwrap_or_default()
    }

    pub fn is_occupant(&self, note_id: NoteId, conn_id: Uuid) -> bool {
        self.rooms
            .get(&note_id)
            .is_some_and(|occupants| occupants.contains(&conn_id))
    }

    /// Drop the connection from every room it is in. Returns the affected rooms.
    pub fn remove_session_everywhere(&mut self, conn_id: Uuid) -> Vec<NoteId> {
        let mut affected = Vec::new();
        self.rooms.retain(|note_id, occupants| {
            if occupants.remove(&conn_id) {
                affected.push(*note_id);
            }
            !occupants.is_empty()
        });
        affected
    }

    /// Empty a room entirely. Returns whoever was in it.
    pub fn close_room(&mut self, note_id: NoteId) -> HashSet<Uuid> {
        self.rooms.remove(&note_id).unwrap_or_default()
    }

    pub fn contains_room(&self, note_id: NoteId) -> bool {
        self.rooms.contains_key(&note_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn membership_count(&self) -> usize {
        self.rooms.values().map(HashSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_is_idempotent() {
        let mut registry = PresenceRegistry::new();
        let note = Uuid::new_v4();
        let conn = Uuid::new_v4();
        assert!(registry.join(note, conn));
        assert!(!registry.join(note, conn));
        assert_eq!(registry.list_occupants(note).len(), 1);
        assert_eq!(registry.membership_count(), 1);
    }

    #[test]
    fn empty_rooms_are_pruned() {
        let mut registry = PresenceRegistry::new();
        let note = Uuid::new_v4();
        let conn = Uuid::new_v4();
        registry.join(note, conn);
        assert!(registry.leave(note, conn));
        assert!(!registry.contains_room(note));
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn leave_unknown_is_a_no_op() {
        let mut registry = PresenceRegistry::new();
        let note = Uuid::new_v4();
        let present = Uuid::new_v4();
        registry.join(note, present);
        assert!(!registry.leave(note, Uuid::new_v4()));
        assert!(!registry.leave(Uuid::new_v4(), present));
        assert_eq!(registry.list_occupants(note), HashSet::from([present]));
    }

    #[test]
    fn unknown_room_has_no_occupants() {
        let registry = PresenceRegistry::new();
        assert!(registry.list_occupants(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn remove_everywhere_reports_and_prunes() {
        let mut registry = PresenceRegistry::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let gone = Uuid::new_v4();
        let stays = Uuid::new_v4();
        registry.join(a, gone);
        registry.join(b, gone);
        registry.join(b, stays);
        registry.join(c, stays);

        let mut affected = registry.remove_session_everywhere(gone);
        affected.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(affected, expected);

        assert!(!registry.contains_room(a));
        assert_eq!(registry.list_occupants(b), HashSet::from([stays]));
        assert!(registry.remove_session_everywhere(gone).is_empty());
    }

    #[test]
    fn close_room_returns_everyone() {
        let mut registry = PresenceRegistry::new();
        let note = Uuid::new_v4();
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        registry.join(note, x);
        registry.join(note, y);
        assert_eq!(registry.close_room(note), HashSet::from([x, y]));
        assert!(!registry.contains_room(note));
    }

    // Replays a long scripted join/leave/disconnect sequence and checks the
    // registry against a naive model after every step.
    #[test]
    fn matches_model_over_mixed_sequence() {
        let notes: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let conns: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut registry = PresenceRegistry::new();
        let mut model: HashSet<(Uuid, Uuid)> = HashSet::new();

        // Linear congruential step keeps the sequence deterministic
        let mut seed: u64 = 0x2545_f491;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let note = notes[(seed >> 33) as usize % notes.len()];
            let conn = conns[(seed >> 40) as usize % conns.len()];
            match (seed >> 50) % 5 {
                0 | 1 => {
                    registry.join(note, conn);
                    model.insert((note, conn));
                }
                2 | 3 => {
                    registry.leave(note, conn);
                    model.remove(&(note, conn));
                }
                _ => {
                    registry.remove_session_everywhere(conn);
                    model.retain(|(_, c)| *c != conn);
                }
            }

            for n in &notes {
                let expected: HashSet<Uuid> = model.iter().filter(|(mn, _)| mn == n).map(|(_, c)| *c).collect();
                assert_eq!(registry.list_occupants(*n), expected);
                assert_eq!(registry.contains_room(*n), !expected.is_empty());
            }
        }
    }
}
