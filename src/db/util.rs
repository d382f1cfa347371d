use sqlx::Error as SqlxError;
use tracing::error;

use crate::models::{CollabError, NoteId};

// Postgres SQLSTATE codes surfaced as write conflicts
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Map a database error onto the collaboration error taxonomy.
pub fn classify_db_error(e: SqlxError, note_id: NoteId) -> CollabError {
    match e {
        SqlxError::RowNotFound => CollabError::NotFound(note_id.to_string()),
        SqlxError::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            if code == UNIQUE_VIOLATION || code == FOREIGN_KEY_VIOLATION {
                CollabError::Conflict(format!("{} ({})", db_err.message(), code))
            } else {
                error!("Database error for note {}: {}", note_id, db_err);
                CollabError::UpstreamFailure(format!("database error: {}", db_err.message()))
            }
        }
        other => {
            error!("Database unavailable for note {}: {}", note_id, other);
            CollabError::UpstreamFailure(format!("database unavailable: {}", other))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn missing_row_is_not_found() {
        let note_id = Uuid::new_v4();
        assert_eq!(classify_db_error(SqlxError::RowNotFound, note_id), CollabError::NotFound(note_id.to_string()));
    }

    #[test]
    fn pool_problems_are_upstream_failures() {
        let err = classify_db_error(SqlxError::PoolTimedOut, Uuid::new_v4());
        assert_eq!(err.code(), "upstream_failure");
    }
}
