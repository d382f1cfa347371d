use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Session, room and process statistics (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Current diagnostics", body = DiagnosticsResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Current occupants of a note's room
#[utoipa::path(
    get,
    path = "/api/v1/notes/{note_id}/presence",
    params(("note_id" = Uuid, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note presence", body = NotePresenceResponse),
        (status = 403, description = "Service or admin access required", body = ErrorResponse),
        (status = 404, description = "Unknown note", body = ErrorResponse),
        (status = 502, description = "Note store unavailable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn note_presence_doc() {}

/// Announce that a note was deleted and close its room
#[utoipa::path(
    post,
    path = "/api/v1/notes/{note_id}/deleted",
    params(("note_id" = Uuid, Path, description = "Note id")),
    responses(
        (status = 200, description = "Room notified and closed", body = NoteEventResponse),
        (status = 403, description = "Service access required", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn note_deleted_doc() {}

/// Announce a new collaborator to a note's room
#[utoipa::path(
    post,
    path = "/api/v1/notes/{note_id}/collaborators",
    params(("note_id" = Uuid, Path, description = "Note id")),
    request_body = CollaboratorAddedRequest,
    responses(
        (status = 200, description = "Room notified", body = NoteEventResponse),
        (status = 403, description = "Service access required", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn collaborator_added_doc() {}

/// Announce a removed collaborator to a note's room
#[utoipa::path(
    delete,
    path = "/api/v1/notes/{note_id}/collaborators/{user_id}",
    params(
        ("note_id" = Uuid, Path, description = "Note id"),
        ("user_id" = Uuid, Path, description = "Removed collaborator")
    ),
    responses(
        (status = 200, description = "Room notified", body = NoteEventResponse),
        (status = 403, description = "Service access required", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn collaborator_removed_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        note_presence_doc,
        note_deleted_doc,
        collaborator_added_doc,
        collaborator_removed_doc,
    ),
    components(
        schemas(
            HealthResponse,
            DiagnosticsResponse,
            ErrorResponse,
            NotePresenceResponse,
            OccupantResponse,
            NoteEventResponse,
            CollaboratorAddedRequest,
            CollaboratorInfo,
            AccessLevel,
        )
    ),
    tags(
        (name = "api", description = "Collaboration service endpoints")
    )
)]
pub struct ApiDoc;
