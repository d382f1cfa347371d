use axum::{http::StatusCode, Json};
use crate::models::{AccessLevel, CollabError, ErrorResponse, NoteId};

const ADMIN_PRPL: &str = "r/admin";

pub fn user_prpl(uid: &str) -> String {
    format!("u/{}", uid)
}

pub fn role_prpl(role: &str) -> String {
    format!("r/{}", role)
}

pub fn service_prpl(service_name: &str) -> String {
    format!("s/{}", service_name)
}

pub fn is_admin(prpls: &[String]) -> bool {
    prpls.iter().any(|p| p == ADMIN_PRPL)
}

pub fn is_service(prpls: &[String], service_name: &str) -> bool {
    let service_prpl = service_prpl(service_name);
    prpls.iter().any(|p| p == &service_prpl)
}

pub fn ensure_service(prpls: &[String], service_name: &str) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    if is_service(prpls, service_name) {
        return Ok(service_prpl(service_name));
    }

    Err(ErrorResponse::reply(StatusCode::FORBIDDEN, format!("Service '{}' access denied", service_name)))
}

pub fn ensure_admin(prpls: &[String]) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    if is_admin(prpls) {
        return Ok(ADMIN_PRPL.to_string());
    }

    Err(ErrorResponse::reply(StatusCode::FORBIDDEN, "Admin access required"))
}

pub fn ensure_service_or_admin(prpls: &[String], service_name: &str) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    if is_service(prpls, service_name) {
        return Ok(service_prpl(service_name));
    }

    ensure_admin(prpls)
}

/// Joining a room needs any access at all.
pub fn ensure_can_view(level: AccessLevel, note_id: NoteId) -> Result<(), CollabError> {
    if level.can_view() {
        Ok(())
    } else {
        Err(CollabError::AuthorizationDenied(format!("no access to note {}", note_id)))
    }
}

/// Editing needs owner or editor.
pub fn ensure_can_edit(level: AccessLevel, note_id: NoteId) -> Result<(), CollabError> {
    if level.can_edit() {
        Ok(())
    } else {
        Err(CollabError::AuthorizationDenied(format!("{} access cannot edit note {}", level, note_id)))
    }
}
