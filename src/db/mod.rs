pub mod dbnotes;
pub mod memory;
pub mod util;

use async_trait::async_trait;

use crate::models::{AccessLevel, CollabError, NoteId, NotePatch, NoteRecord, UserId};

/// Durable note storage the collaboration layer writes through to.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fails with `NotFound` for unknown notes.
    async fn read_note(&self, note_id: NoteId) -> Result<NoteRecord, CollabError>;

    /// Applies `patch` and returns the record as stored.
    async fn write_note(&self, note_id: NoteId, author: UserId, patch: &NotePatch) -> Result<NoteRecord, CollabError>;
}

/// Answers "what may this user do with this note".
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    async fn check_access(&self, note_id: NoteId, user_id: UserId) -> Result<AccessLevel, CollabError>;
}
