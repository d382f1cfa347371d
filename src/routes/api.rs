use crate::{
    AppState,
    handlers::{diagnostics, health_check, ready_check, note_presence, note_deleted, collaborator_added, collaborator_removed},
    routes::auth_middleware::auth_middleware,
};
use axum::{routing::{delete, get, post}, Router, middleware};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::<Arc<AppState>>::new()
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/notes/:note_id/presence", get(note_presence))
        .route("/v1/notes/:note_id/deleted", post(note_deleted))
        .route("/v1/notes/:note_id/collaborators", post(collaborator_added))
        .route("/v1/notes/:note_id/collaborators/:user_id", delete(collaborator_removed))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware)); // Applies to all routes added above

    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .merge(protected)
}
