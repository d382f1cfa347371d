use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

pub type NoteId = Uuid;
pub type UserId = Uuid;

/// What a user may do with a note.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    Owner,
    Editor,
    Viewer,
    None,
}

impl AccessLevel {
    pub fn can_view(self) -> bool {
        !matches!(self, AccessLevel::None)
    }

    pub fn can_edit(self) -> bool {
        matches!(self, AccessLevel::Owner | AccessLevel::Editor)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Owner => write!(f, "owner"),
            AccessLevel::Editor => write!(f, "editor"),
            AccessLevel::Viewer => write!(f, "viewer"),
            AccessLevel::None => write!(f, "none"),
        }
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(AccessLevel::Owner),
            "editor" => Ok(AccessLevel::Editor),
            "viewer" => Ok(AccessLevel::Viewer),
            "none" | "" => Ok(AccessLevel::None),
            other => Err(format!("Unknown access level '{}'", other)),
        }
    }
}

/// A note as the document store holds it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub owner_id: UserId,
    pub last_edited_by: Option<UserId>,
    pub updated_at: DateTime<Utc>,
}

/// Fields an edit wants to change. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NoteRecord {
    pub fn apply(&mut self, author: UserId, patch: &NotePatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        self.last_edited_by = Some(author);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_owner_and_editor_can_edit() {
        assert!(AccessLevel::Owner.can_edit());
        assert!(AccessLevel::Editor.can_edit());
        assert!(!AccessLevel::Viewer.can_edit());
        assert!(!AccessLevel::None.can_edit());
        assert!(AccessLevel::Viewer.can_view());
        assert!(!AccessLevel::None.can_view());
    }

    #[test]
    fn parses_stored_permission_strings() {
        assert_eq!("editor".parse::<AccessLevel>(), Ok(AccessLevel::Editor));
        assert_eq!(" Owner ".parse::<AccessLevel>(), Ok(AccessLevel::Owner));
        assert!("admin".parse::<AccessLevel>().is_err());
    }

    #[test]
    fn patch_keeps_absent_fields() {
        let author = Uuid::new_v4();
        let mut note = NoteRecord {
            id: Uuid::new_v4(),
            title: "Groceries".into(),
            content: "eggs".into(),
            owner_id: author,
            last_edited_by: None,
            updated_at: Utc::now(),
        };
        note.apply(author, &NotePatch { title: None, content: Some("milk".into()) });
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "milk");
        assert_eq!(note.last_edited_by, Some(author));
    }
}
