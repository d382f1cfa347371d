use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Error as SqlxError, Row};
use std::time::Duration;
use tracing::{debug, info};

use crate::db::util::classify_db_error;
use crate::db::{DocumentStore, PermissionOracle};
use crate::models::{AccessLevel, CollabError, NoteId, NotePatch, NoteRecord, UserId};

/// Note row from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NoteRow {
    pub id: uuid::Uuid,
    pub title: String,
    pub content: Option<String>,
    pub owner_id: uuid::Uuid,
    pub last_edited_by: Option<uuid::Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl From<NoteRow> for NoteRecord {
    fn from(row: NoteRow) -> Self {
        NoteRecord {
            id: row.id,
            title: row.title,
            content: row.content.unwrap_or_default(),
            owner_id: row.owner_id,
            last_edited_by: row.last_edited_by,
            updated_at: row.updated_at,
        }
    }
}

/// Notes and collaborators living in the notes application's Postgres database
pub struct DbNotes {
    pool: PgPool,
}

impl DbNotes {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    fn log_pool(&self, action: &str, note_id: NoteId) {
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        debug!(
            "{} note {}. Pool connections: {} idle, {} in use",
            action,
            note_id,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );
    }
}

#[async_trait]
impl DocumentStore for DbNotes {
    async fn read_note(&self, note_id: NoteId) -> Result<NoteRecord, CollabError> {
        self.log_pool("Reading", note_id);

        let query_sql = r#"
            SELECT id, title, content, owner_id, last_edited_by,
                   updated_at AT TIME ZONE 'UTC' AS updated_at
            FROM notes
            WHERE id = $1
        "#;

        let row = sqlx::query_as::<_, NoteRow>(query_sql)
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, note_id))?;

        row.map(NoteRecord::from)
            .ok_or_else(|| CollabError::NotFound(note_id.to_string()))
    }

    async fn write_note(&self, note_id: NoteId, author: UserId, patch: &NotePatch) -> Result<NoteRecord, CollabError> {
        self.log_pool("Writing", note_id);

        // Absent fields keep their stored value
        let query_sql = r#"
            UPDATE notes
            SET title = COALESCE($1, title),
                content = COALESCE($2, content),
                last_edited_by = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING id, title, content, owner_id, last_edited_by,
                      updated_at AT TIME ZONE 'UTC' AS updated_at
        "#;

        let row = sqlx::query_as::<_, NoteRow>(query_sql)
            .bind(patch.title.as_deref())
            .bind(patch.content.as_deref())
            .bind(author)
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, note_id))?;

        match row {
            Some(row) => {
                info!("Note {} updated by {}", note_id, author);
                Ok(row.into())
            }
            None => Err(CollabError::NotFound(note_id.to_string())),
        }
    }
}

#[async_trait]
impl PermissionOracle for DbNotes {
    async fn check_access(&self, note_id: NoteId, user_id: UserId) -> Result<AccessLevel, CollabError> {
        self.log_pool("Checking access to", note_id);

        let query_sql = r#"
            SELECT c.permission
            FROM notes n
            LEFT JOIN collaborators c ON n.id = c.note_id AND c.user_id = $2
            WHERE n.id = $1
        "#;

        let row = sqlx::query(query_sql)
            .bind(note_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, note_id))?;

        let row = row.ok_or_else(|| CollabError::NotFound(note_id.to_string()))?;
        let permission: Option<String> = row
            .try_get("permission")
            .map_err(|e| classify_db_error(e, note_id))?;

        match permission {
            Some(p) => p.parse::<AccessLevel>().map_err(CollabError::UpstreamFailure),
            None => Ok(AccessLevel::None),
        }
    }
}
