use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::auth;
use crate::db::PermissionOracle;
use crate::models::{AccessLevel, CollabError, NoteId, UserId};

/// Asks the permission oracle, bounded by a timeout, failing closed.
pub struct AccessService {
    oracle: Arc<dyn PermissionOracle>,
    timeout: Duration,
}

impl AccessService {
    pub fn new(oracle: Arc<dyn PermissionOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Any error, including a timeout, denies the action.
    pub async fn access_level(&self, note_id: NoteId, user_id: UserId) -> Result<AccessLevel, CollabError> {
        match tokio::time::timeout(self.timeout, self.oracle.check_access(note_id, user_id)).await {
            Ok(Ok(level)) => Ok(level),
            Ok(Err(e)) => {
                warn!("Permission check for user {} on note {} failed: {}", user_id, note_id, e);
                Err(e)
            }
            Err(_) => {
                warn!("Permission check for user {} on note {} timed out after {:?}", user_id, note_id, self.timeout);
                Err(CollabError::UpstreamFailure(format!("permission check timed out after {}ms", self.timeout.as_millis())))
            }
        }
    }

    pub async fn authorize_join(&self, note_id: NoteId, user_id: UserId) -> Result<AccessLevel, CollabError> {
        let level = self.access_level(note_id, user_id).await?;
        auth::ensure_can_view(level, note_id)?;
        info!("User {} may join note {} as {}", user_id, note_id, level);
        Ok(level)
    }

    pub async fn authorize_edit(&self, note_id: NoteId, user_id: UserId) -> Result<AccessLevel, CollabError> {
        let level = self.access_level(note_id, user_id).await?;
        auth::ensure_can_edit(level, note_id)?;
        Ok(level)
    }
}
