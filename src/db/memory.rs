use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{DocumentStore, PermissionOracle};
use crate::models::{AccessLevel, CollabError, NoteId, NotePatch, NoteRecord, UserId};

#[derive(Default)]
struct MemoryState {
    notes: HashMap<NoteId, NoteRecord>,
    collaborators: HashMap<(NoteId, UserId), AccessLevel>,
}

/// Process-local notes and collaborators.
///
/// Serves as both document store and permission oracle when no database is
/// configured, and backs the test suites.
#[derive(Default)]
pub struct MemoryNotes {
    state: RwLock<MemoryState>,
}

impl MemoryNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a note. The owner is registered as its first collaborator.
    pub async fn create_note(&self, owner_id: UserId, title: &str, content: &str) -> NoteRecord {
        let note = NoteRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            owner_id,
            last_edited_by: Some(owner_id),
            updated_at: Utc::now(),
        };
        let mut state = self.state.write().await;
        state.notes.insert(note.id, note.clone());
        state.collaborators.insert((note.id, owner_id), AccessLevel::Owner);
        note
    }

    pub async fn grant(&self, note_id: NoteId, user_id: UserId, level: AccessLevel) {
        let mut state = self.state.write().await;
        if level == AccessLevel::None {
            state.collaborators.remove(&(note_id, user_id));
        } else {
            state.collaborators.insert((note_id, user_id), level);
        }
    }

    pub async fn revoke(&self, note_id: NoteId, user_id: UserId) {
        self.grant(note_id, user_id, AccessLevel::None).await;
    }

    pub async fn delete_note(&self, note_id: NoteId) -> bool {
        let mut state = self.state.write().await;
        state.collaborators.retain(|(n, _), _| *n != note_id);
        state.notes.remove(&note_id).is_some()
    }
}

#[async_trait]
impl DocumentStore for MemoryNotes {
    async fn read_note(&self, note_id: NoteId) -> Result<NoteRecord, CollabError> {
        self.state
            .read()
            .await
            .notes
            .get(&note_id)
            .cloned()
            .ok_or_else(|| CollabError::NotFound(note_id.to_string()))
    }

    async fn write_note(&self, note_id: NoteId, author: UserId, patch: &NotePatch) -> Result<NoteRecord, CollabError> {
        let mut state = self.state.write().await;
        let note = state
            .notes
            .get_mut(&note_id)
            .ok_or_else(|| CollabError::NotFound(note_id.to_string()))?;
        note.apply(author, patch);
        Ok(note.clone())
    }
}

#[async_trait]
impl PermissionOracle for MemoryNotes {
    async fn check_access(&self, note_id: NoteId, user_id: UserId) -> Result<AccessLevel, CollabError> {
        let state = self.state.read().await;
        if !state.notes.contains_key(&note_id) {
            return Err(CollabError::NotFound(note_id.to_string()));
        }
        Ok(state
            .collaborators
            .get(&(note_id, user_id))
            .copied()
            .unwrap_or(AccessLevel::None))
    }
}
