use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::CollaboratorInfo;

/// Request payload announcing a new collaborator on a note
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CollaboratorAddedRequest {
    pub collaborator: CollaboratorInfo,
}

/// Response returned after a note event was fanned out
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteEventResponse {
    pub success: bool,
    pub notified_sessions: u32,
}
