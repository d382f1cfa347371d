use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OccupantResponse {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

/// Who is currently in a note's room
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotePresenceResponse {
    pub note_id: Uuid,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub occupants: Vec<OccupantResponse>,
}
