use crate::{AppState, auth::auth, models::{CollabError, ErrorResponse, NoteId, NotePresenceResponse, OccupantResponse}};
use axum::{extract::{Extension, Path, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{debug, error};

/// Who is in a note's room right now
pub async fn note_presence(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<NoteId>,
    Extension(prpls): Extension<Vec<String>>,
) -> Result<(StatusCode, Json<NotePresenceResponse>), (StatusCode, Json<ErrorResponse>)> {

    // Ensure the caller is the notes application or an admin
    let _ = auth::ensure_service_or_admin(&prpls, &state.config.app_service_name)?;

    let read = state.broker.store().read_note(note_id);
    let note = match tokio::time::timeout(state.config.upstream_timeout(), read).await {
        Ok(Ok(note)) => note,
        Ok(Err(e)) => {
            debug!("Failed to read note {}: {}", note_id, e);
            return Err(e.into());
        }
        Err(_) => {
            error!("Reading note {} timed out", note_id);
            return Err(CollabError::UpstreamFailure("note store timed out".to_string()).into());
        }
    };

    let occupants = state
        .broker
        .occupants(note_id)
        .await
        .into_iter()
        .map(|ctx| OccupantResponse {
            session_id: ctx.conn_id,
            user_id: ctx.user_id,
            email: ctx.email,
            role: ctx.role,
        })
        .collect();

    Ok((
        StatusCode::OK,
        Json(NotePresenceResponse {
            note_id,
            title: note.title,
            updated_at: note.updated_at,
            occupants,
        }),
    ))
}
