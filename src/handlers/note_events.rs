use crate::{AppState, auth::auth, models::{CollaboratorAddedRequest, ErrorResponse, NoteEventResponse, NoteId, UserId}};
use axum::{extract::{Extension, Path, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

type EventResult = Result<(StatusCode, Json<NoteEventResponse>), (StatusCode, Json<ErrorResponse>)>;

fn notified(n: usize) -> EventResult {
    Ok((
        StatusCode::OK,
        Json(NoteEventResponse {
            success: true,
            notified_sessions: n as u32,
        }),
    ))
}

/// The notes application deleted a note
pub async fn note_deleted(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<NoteId>,
    Extension(prpls): Extension<Vec<String>>,
) -> EventResult {
    let _ = auth::ensure_service(&prpls, &state.config.app_service_name)?;

    let n = state.broker.note_deleted(note_id).await;
    info!("Note {} deletion announced to {} session(s)", note_id, n);
    notified(n)
}

/// A collaborator was added to a note
pub async fn collaborator_added(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<NoteId>,
    Extension(prpls): Extension<Vec<String>>,
    Json(body): Json<CollaboratorAddedRequest>,
) -> EventResult {
    let _ = auth::ensure_service(&prpls, &state.config.app_service_name)?;

    let user_id = body.collaborator.user_id;
    let n = state.broker.collaborator_added(note_id, body.collaborator).await;
    info!("Collaborator {} added to note {}, told {} session(s)", user_id, note_id, n);
    notified(n)
}

/// A collaborator was removed from a note
pub async fn collaborator_removed(
    State(state): State<Arc<AppState>>,
    Path((note_id, user_id)): Path<(NoteId, UserId)>,
    Extension(prpls): Extension<Vec<String>>,
) -> EventResult {
    let _ = auth::ensure_service(&prpls, &state.config.app_service_name)?;

    let n = state.broker.collaborator_removed(note_id, user_id).await;
    info!("Collaborator {} removed from note {}, told {} session(s)", user_id, note_id, n);
    notified(n)
}
