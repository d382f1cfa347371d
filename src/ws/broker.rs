use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{DocumentStore, PermissionOracle};
use crate::models::{
    ActiveUsersMessage, CollabError, CollaboratorAddedMessage, CollaboratorInfo, CollaboratorRemovedMessage,
    CursorUpdateMessage, EditMessage, ErrorMessage, NoteDeletedMessage, NoteId, NotePatch, NoteUpdatedMessage,
    PongMessage, ReceivedMessage, SendMessage, UserId, UserPresenceMessage, UserStoppedTypingMessage,
    UserTypingMessage,
};
use crate::services::access_service::AccessService;
use crate::services::doc_edit_service::DocEditService;
use crate::ws::connctx::ConnCtx;
use crate::ws::presence::PresenceRegistry;

/// Outbound queue of one session. Drained by its websocket writer.
pub type Outbox = mpsc::UnboundedReceiver<SendMessage>;

struct SessionEntry {
    ctx: ConnCtx,
    joined: HashSet<NoteId>,
    tx: mpsc::UnboundedSender<SendMessage>,
}

#[derive(Default)]
struct BrokerState {
    registry: PresenceRegistry,
    sessions: HashMap<Uuid, SessionEntry>,
}

impl BrokerState {
    fn send_to(&self, conn_id: Uuid, msg: SendMessage) -> bool {
        let Some(entry) = self.sessions.get(&conn_id) else {
            return false;
        };
        let ephemeral = msg.is_ephemeral();
        match entry.tx.send(msg) {
            Ok(()) => true,
            Err(_) if ephemeral => {
                debug!("Dropped ephemeral signal for closing connection {}", conn_id);
                false
            }
            Err(_) => {
                warn!("Connection {} is closing, event not delivered", conn_id);
                false
            }
        }
    }

    /// Queue `msg` for every occupant of the room except `except`.
    fn publish(&self, note_id: NoteId, except: Option<Uuid>, msg: &SendMessage) -> usize {
        self.registry
            .list_occupants(note_id)
            .into_iter()
            .filter(|conn_id| Some(*conn_id) != except)
            .filter(|conn_id| self.send_to(*conn_id, msg.clone()))
            .count()
    }

    fn presence_message(ctx: &ConnCtx, note_id: NoteId) -> UserPresenceMessage {
        UserPresenceMessage {
            note_id,
            user_id: ctx.user_id,
            email: ctx.email.clone(),
            session_id: ctx.conn_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerStats {
    pub sessions: usize,
    pub rooms: usize,
    pub memberships: usize,
}

/// Owns presence and fans events out between the sessions of a note.
///
/// Registry and session table sit behind one lock and every fan-out is queued
/// while holding it, so each room sees events in the order they were
/// accepted. Permission checks and store writes run outside the lock.
pub struct Broker {
    state: Mutex<BrokerState>,
    access: AccessService,
    edits: DocEditService,
}

impl Broker {
    pub fn new(oracle: Arc<dyn PermissionOracle>, store: Arc<dyn DocumentStore>, upstream_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(BrokerState::default()),
            access: AccessService::new(oracle, upstream_timeout),
            edits: DocEditService::new(store, upstream_timeout),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        self.edits.store()
    }

    /// Register an authenticated connection.
    pub async fn connect(&self, ctx: ConnCtx) -> Outbox {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;
        info!("Session {} connected for user {}", ctx.conn_id, ctx.user_id);
        state.sessions.insert(ctx.conn_id, SessionEntry { ctx, joined: HashSet::new(), tx });
        rx
    }

    /// Remove the session from every room and tell the rooms. Safe to call
    /// more than once.
    pub async fn disconnect(&self, conn_id: Uuid) -> Vec<NoteId> {
        let mut state = self.state.lock().await;
        let Some(entry) = state.sessions.remove(&conn_id) else {
            return Vec::new();
        };

        let affected = state.registry.remove_session_everywhere(conn_id);
        for note_id in &affected {
            let left = SendMessage::UserLeft(BrokerState::presence_message(&entry.ctx, *note_id));
            state.publish(*note_id, None, &left);
        }

        info!(
            "Session {} for user {} disconnected, left {} room(s)",
            conn_id,
            entry.ctx.user_id,
            affected.len()
        );
        affected
    }

    pub async fn handle(&self, conn_id: Uuid, msg: ReceivedMessage) {
        match msg {
            ReceivedMessage::JoinRoom(m) => self.join_room(conn_id, m.note_id).await,
            ReceivedMessage::LeaveRoom(m) => self.leave_room(conn_id, m.note_id).await,
            ReceivedMessage::Edit(m) => self.edit(conn_id, m).await,
            ReceivedMessage::CursorMove(m) => {
                let position = m.position;
                self.signal(conn_id, m.note_id, move |ctx| {
                    SendMessage::CursorUpdate(CursorUpdateMessage {
                        note_id: m.note_id,
                        user_id: ctx.user_id,
                        email: ctx.email.clone(),
                        position,
                    })
                })
                .await
            }
            ReceivedMessage::TypingStart(m) => {
                self.signal(conn_id, m.note_id, |ctx| {
                    SendMessage::UserTyping(UserTypingMessage {
                        note_id: m.note_id,
                        user_id: ctx.user_id,
                        email: ctx.email.clone(),
                    })
                })
                .await
            }
            ReceivedMessage::TypingStop(m) => {
                self.signal(conn_id, m.note_id, |ctx| {
                    SendMessage::UserStoppedTyping(UserStoppedTypingMessage {
                        note_id: m.note_id,
                        user_id: ctx.user_id,
                    })
                })
                .await
            }
            ReceivedMessage::Ping(_) => {
                let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
                self.state.lock().await.send_to(conn_id, pong);
            }
        }
    }

    /// Report a failure to the originating session only.
    pub async fn reject(&self, conn_id: Uuid, err: &CollabError, note_id: Option<NoteId>) {
        let msg = SendMessage::Error(ErrorMessage::from_error(err, note_id));
        self.state.lock().await.send_to(conn_id, msg);
    }

    async fn identity(&self, conn_id: Uuid) -> Option<ConnCtx> {
        self.state.lock().await.sessions.get(&conn_id).map(|e| e.ctx.clone())
    }

    pub async fn join_room(&self, conn_id: Uuid, note_id: NoteId) {
        let Some(ctx) = self.identity(conn_id).await else {
            debug!("Join from unknown session {}", conn_id);
            return;
        };

        if let Err(e) = self.access.authorize_join(note_id, ctx.user_id).await {
            self.reject(conn_id, &e, Some(note_id)).await;
            return;
        }

        let mut state = self.state.lock().await;
        // Disconnected while the permission check was out
        let Some(entry) = state.sessions.get_mut(&conn_id) else {
            return;
        };
        entry.joined.insert(note_id);

        if state.registry.join(note_id, conn_id) {
            let joined = SendMessage::UserJoined(BrokerState::presence_message(&ctx, note_id));
            state.publish(note_id, Some(conn_id), &joined);
            info!("User {} joined note {} on session {}", ctx.user_id, note_id, conn_id);
        } else {
            debug!("Session {} already in note {}", conn_id, note_id);
        }

        let users = state
            .registry
            .list_occupants(note_id)
            .into_iter()
            .filter(|other| *other != conn_id)
            .filter_map(|other| state.sessions.get(&other).map(|e| e.ctx.as_active_user()))
            .collect();
        state.send_to(conn_id, SendMessage::ActiveUsers(ActiveUsersMessage { note_id, users }));
    }

    pub async fn leave_room(&self, conn_id: Uuid, note_id: NoteId) {
        let mut state = self.state.lock().await;
        if !state.registry.leave(note_id, conn_id) {
            debug!("Session {} left note {} it was not in", conn_id, note_id);
            return;
        }

        let Some(entry) = state.sessions.get_mut(&conn_id) else {
            return;
        };
        entry.joined.remove(&note_id);
        let left = SendMessage::UserLeft(BrokerState::presence_message(&entry.ctx, note_id));
        let user_id = entry.ctx.user_id;
        state.publish(note_id, None, &left);
        info!("User {} left note {} on session {}", user_id, note_id, conn_id);
    }

    pub async fn edit(&self, conn_id: Uuid, edit: EditMessage) {
        let note_id = edit.note_id;
        let ctx = {
            let state = self.state.lock().await;
            let Some(entry) = state.sessions.get(&conn_id) else {
                return;
            };
            if !entry.joined.contains(&note_id) {
                let err = CollabError::NotJoined(note_id.to_string());
                state.send_to(conn_id, SendMessage::Error(ErrorMessage::from_error(&err, Some(note_id))));
                return;
            }
            entry.ctx.clone()
        };

        let ticket = self.edits.ticket(note_id);

        // Rechecked on every edit, access may have been revoked since joining
        if let Err(e) = self.access.authorize_edit(note_id, ctx.user_id).await {
            self.reject(conn_id, &e, Some(note_id)).await;
            return;
        }

        let patch = NotePatch { title: edit.title, content: edit.content };
        let landed = match self.edits.write_through(ticket, note_id, ctx.user_id, &patch).await {
            Ok(landed) => landed,
            Err(e) => {
                self.reject(conn_id, &e, Some(note_id)).await;
                return;
            }
        };

        let updated = SendMessage::NoteUpdated(NoteUpdatedMessage {
            note_id,
            title: landed.note.title.clone(),
            content: landed.note.content.clone(),
            updated_by: ctx.user_id,
            updated_by_email: ctx.email.clone(),
            timestamp: landed.note.updated_at,
        });

        let state = self.state.lock().await;
        let delivered = state.publish(note_id, Some(conn_id), &updated);
        if landed.raced {
            // Another write landed after this edit was accepted; resync the author
            state.send_to(conn_id, updated);
        }
        debug!("Note {} update by {} sent to {} session(s)", note_id, ctx.user_id, delivered);
        drop(state);
        drop(landed);
    }

    async fn signal(&self, conn_id: Uuid, note_id: NoteId, build: impl FnOnce(&ConnCtx) -> SendMessage) {
        let state = self.state.lock().await;
        if !state.registry.is_occupant(note_id, conn_id) {
            debug!("Ignoring signal from session {} outside note {}", conn_id, note_id);
            return;
        }
        let Some(entry) = state.sessions.get(&conn_id) else {
            return;
        };
        let msg = build(&entry.ctx);
        state.publish(note_id, Some(conn_id), &msg);
    }

    /// Tell the room its note is gone and empty it. Returns how many sessions were told.
    pub async fn note_deleted(&self, note_id: NoteId) -> usize {
        let mut state = self.state.lock().await;
        let deleted = SendMessage::NoteDeleted(NoteDeletedMessage { note_id });
        let notified = state.publish(note_id, None, &deleted);

        let evicted = state.registry.close_room(note_id);
        for conn_id in &evicted {
            if let Some(entry) = state.sessions.get_mut(conn_id) {
                entry.joined.remove(&note_id);
            }
        }
        info!("Note {} deleted, evicted {} session(s)", note_id, evicted.len());
        notified
    }

    pub async fn collaborator_added(&self, note_id: NoteId, collaborator: CollaboratorInfo) -> usize {
        let msg = SendMessage::CollaboratorAdded(CollaboratorAddedMessage { note_id, collaborator });
        self.state.lock().await.publish(note_id, None, &msg)
    }

    pub async fn collaborator_removed(&self, note_id: NoteId, collaborator_id: UserId) -> usize {
        let msg = SendMessage::CollaboratorRemoved(CollaboratorRemovedMessage { note_id, collaborator_id });
        self.state.lock().await.publish(note_id, None, &msg)
    }

    pub async fn occupants(&self, note_id: NoteId) -> Vec<ConnCtx> {
        let state = self.state.lock().await;
        state
            .registry
            .list_occupants(note_id)
            .into_iter()
            .filter_map(|conn_id| state.sessions.get(&conn_id).map(|e| e.ctx.clone()))
            .collect()
    }

    /// Rooms the session currently occupies; empty for unknown sessions.
    pub async fn joined_rooms(&self, conn_id: Uuid) -> HashSet<NoteId> {
        self.state
            .lock()
            .await
            .sessions
            .get(&conn_id)
            .map(|e| e.joined.clone())
            .unwrap_or_default()
    }

    pub async fn has_room(&self, note_id: NoteId) -> bool {
        self.state.lock().await.registry.contains_room(note_id)
    }

    pub async fn stats(&self) -> BrokerStats {
        let state = self.state.lock().await;
        BrokerStats {
            sessions: state.sessions.len(),
            rooms: state.registry.room_count(),
            memberships: state.registry.membership_count(),
        }
    }
}
