use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{AccessLevel, CollabError, NoteId, UserId};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    pub note_id: NoteId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditMessage {
    pub note_id: NoteId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorMoveMessage {
    pub note_id: NoteId,
    #[serde(default)]
    pub position: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PingMessage {}

/// Frames a client may send. The names used by the first web client
/// (`join-note`, `leave-note`, `note-update`) are still accepted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join-room", alias = "join-note")]
    JoinRoom(RoomMessage),
    #[serde(rename = "leave-room", alias = "leave-note")]
    LeaveRoom(RoomMessage),
    #[serde(rename = "edit", alias = "note-update")]
    Edit(EditMessage),
    #[serde(rename = "cursor-move")]
    CursorMove(CursorMoveMessage),
    #[serde(rename = "typing-start")]
    TypingStart(RoomMessage),
    #[serde(rename = "typing-stop")]
    TypingStop(RoomMessage),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

impl ReceivedMessage {
    pub fn parse(text: &str) -> Result<Self, CollabError> {
        serde_json::from_str(text).map_err(|e| CollabError::InvalidEvent(e.to_string()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserPresenceMessage {
    pub note_id: NoteId,
    pub user_id: UserId,
    pub email: String,
    pub session_id: uuid::Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    pub id: UserId,
    pub email: String,
    pub role: String,
    pub session_id: uuid::Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUsersMessage {
    pub note_id: NoteId,
    pub users: Vec<ActiveUser>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdatedMessage {
    pub note_id: NoteId,
    pub title: String,
    pub content: String,
    pub updated_by: UserId,
    pub updated_by_email: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorUpdateMessage {
    pub note_id: NoteId,
    pub user_id: UserId,
    pub email: String,
    pub position: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserTypingMessage {
    pub note_id: NoteId,
    pub user_id: UserId,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStoppedTypingMessage {
    pub note_id: NoteId,
    pub user_id: UserId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_id: Option<NoteId>,
}

impl ErrorMessage {
    pub fn from_error(err: &CollabError, note_id: Option<NoteId>) -> Self {
        Self {
            message: err.to_string(),
            code: err.code().to_string(),
            note_id,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteDeletedMessage {
    pub note_id: NoteId,
}

/// A collaborator as announced by the notes application.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorInfo {
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub permission: AccessLevel,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorAddedMessage {
    pub note_id: NoteId,
    pub collaborator: CollaboratorInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorRemovedMessage {
    pub note_id: NoteId,
    pub collaborator_id: UserId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

/// Frames the server pushes to a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "user-joined")]
    UserJoined(UserPresenceMessage),
    #[serde(rename = "user-left")]
    UserLeft(UserPresenceMessage),
    #[serde(rename = "active-users")]
    ActiveUsers(ActiveUsersMessage),
    #[serde(rename = "note-updated")]
    NoteUpdated(NoteUpdatedMessage),
    #[serde(rename = "cursor-update")]
    CursorUpdate(CursorUpdateMessage),
    #[serde(rename = "user-typing")]
    UserTyping(UserTypingMessage),
    #[serde(rename = "user-stopped-typing")]
    UserStoppedTyping(UserStoppedTypingMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
    #[serde(rename = "note-deleted")]
    NoteDeleted(NoteDeletedMessage),
    #[serde(rename = "collaborator-added")]
    CollaboratorAdded(CollaboratorAddedMessage),
    #[serde(rename = "collaborator-removed")]
    CollaboratorRemoved(CollaboratorRemovedMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

impl SendMessage {
    /// Cursor and typing signals. Never persisted, dropped on delivery failure.
    pub fn is_ephemeral(&self) -> bool {
        matches!(
            self,
            SendMessage::CursorUpdate(_) | SendMessage::UserTyping(_) | SendMessage::UserStoppedTyping(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn accepts_legacy_event_names() {
        let note_id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"join-note","noteId":"{}"}}"#, note_id);
        assert_eq!(
            ReceivedMessage::parse(&raw).unwrap(),
            ReceivedMessage::JoinRoom(RoomMessage { note_id })
        );

        let raw = format!(r#"{{"type":"note-update","noteId":"{}","content":"hi","cursorPosition":3}}"#, note_id);
        match ReceivedMessage::parse(&raw).unwrap() {
            ReceivedMessage::Edit(edit) => {
                assert_eq!(edit.content.as_deref(), Some("hi"));
                assert_eq!(edit.title, None);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_events() {
        let err = ReceivedMessage::parse(r#"{"type":"shout","noteId":"x"}"#).unwrap_err();
        assert_eq!(err.code(), "invalid_event");
        assert!(ReceivedMessage::parse(r#"{"type":"join-room","noteId":"not-a-uuid"}"#).is_err());
    }

    #[test]
    fn outbound_frames_are_tagged_and_camel_cased() {
        let note_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let msg = SendMessage::UserStoppedTyping(UserStoppedTypingMessage { note_id, user_id });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "user-stopped-typing");
        assert_eq!(json["userId"], user_id.to_string());
        assert_eq!(json["noteId"], note_id.to_string());
        assert!(msg.is_ephemeral());
    }

    #[test]
    fn error_frame_omits_missing_note() {
        let err = CollabError::InvalidEvent("bad".into());
        let json = serde_json::to_value(SendMessage::Error(ErrorMessage::from_error(&err, None))).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "invalid_event");
        assert!(json.get("noteId").is_none());
    }
}
