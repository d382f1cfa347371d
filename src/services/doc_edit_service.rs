use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info};

use crate::db::DocumentStore;
use crate::models::{CollabError, NoteId, NotePatch, NoteRecord, UserId};

/// Orders the writes to one note and the broadcasts that follow them.
#[derive(Default)]
struct WriteLine {
    gate: Arc<Mutex<()>>,
    landed: AtomicU64,
}

/// Taken when an edit is accepted, before any I/O.
pub struct EditTicket {
    line: Arc<WriteLine>,
    base: u64,
}

/// A write the store accepted. Holding it keeps other writes to the same
/// note waiting, so broadcast it before dropping.
pub struct LandedWrite {
    pub note: NoteRecord,
    /// Another write to the note landed between acceptance and this one.
    pub raced: bool,
    _line: OwnedMutexGuard<()>,
}

/// Write-through of edits to the document store.
pub struct DocEditService {
    store: Arc<dyn DocumentStore>,
    lines: Cache<NoteId, Arc<WriteLine>>,
    timeout: Duration,
}

impl DocEditService {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        // Idle expiry only; a line must not be evicted while a write still holds it
        let lines = Cache::builder()
            .time_to_idle(Duration::from_secs(5 * 60))
            .build();
        Self { store, lines, timeout }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn ticket(&self, note_id: NoteId) -> EditTicket {
        let line = self.lines.get_with(note_id, || Arc::new(WriteLine::default()));
        let base = line.landed.load(Ordering::SeqCst);
        EditTicket { line, base }
    }

    /// Exactly one store write. Never retried.
    pub async fn write_through(
        &self,
        ticket: EditTicket,
        note_id: NoteId,
        author: UserId,
        patch: &NotePatch,
    ) -> Result<LandedWrite, CollabError> {
        let attempt = async {
            let guard = ticket.line.gate.clone().lock_owned().await;
            let note = self.store.write_note(note_id, author, patch).await?;
            Ok::<_, CollabError>((guard, note))
        };

        let (guard, note) = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(landed)) => landed,
            Ok(Err(e)) => {
                error!("Failed to write note {} for user {}: {}", note_id, author, e);
                return Err(e);
            }
            Err(_) => {
                error!("Write of note {} for user {} timed out after {:?}", note_id, author, self.timeout);
                return Err(CollabError::UpstreamFailure(format!("note write timed out after {}ms", self.timeout.as_millis())));
            }
        };

        let seq = ticket.line.landed.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Note {} written by {} (write #{})", note_id, author, seq);
        Ok(LandedWrite {
            note,
            raced: seq != ticket.base + 1,
            _line: guard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryNotes;
    use uuid::Uuid;

    #[tokio::test]
    async fn sequential_writes_do_not_race() {
        let notes = Arc::new(MemoryNotes::new());
        let owner = Uuid::new_v4();
        let note = notes.create_note(owner, "t", "").await;
        let service = DocEditService::new(notes.clone(), Duration::from_secs(1));

        for content in ["a", "b"] {
            let ticket = service.ticket(note.id);
            let patch = NotePatch { title: None, content: Some(content.into()) };
            let landed = service.write_through(ticket, note.id, owner, &patch).await.unwrap();
            assert!(!landed.raced);
            assert_eq!(landed.note.content, content);
        }
    }

    #[tokio::test]
    async fn interleaved_acceptance_is_flagged() {
        let notes = Arc::new(MemoryNotes::new());
        let owner = Uuid::new_v4();
        let note = notes.create_note(owner, "t", "").await;
        let service = DocEditService::new(notes.clone(), Duration::from_secs(1));

        let first = service.ticket(note.id);
        let second = service.ticket(note.id);
        let foo = NotePatch { title: None, content: Some("foo".into()) };
        let bar = NotePatch { title: None, content: Some("bar".into()) };

        let landed = service.write_through(first, note.id, owner, &foo).await.unwrap();
        assert!(!landed.raced);
        drop(landed);
        let landed = service.write_through(second, note.id, owner, &bar).await.unwrap();
        assert!(landed.raced);
        assert_eq!(notes.read_note(note.id).await.unwrap().content, "bar");
    }

    #[tokio::test]
    async fn busy_note_keeps_its_line_while_others_come_and_go() {
        let notes = Arc::new(MemoryNotes::new());
        let owner = Uuid::new_v4();
        let note = notes.create_note(owner, "t", "").await;
        let service = DocEditService::new(notes.clone(), Duration::from_secs(1));

        let held = service.ticket(note.id);
        for _ in 0..150_000 {
            service.ticket(Uuid::new_v4());
        }
        service.lines.run_pending_tasks();

        let later = service.ticket(note.id);
        assert!(Arc::ptr_eq(&held.line, &later.line));
    }
}
