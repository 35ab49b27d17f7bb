//! Per-stage resume cursors.
//!
//! A cursor is an opaque position string: the next search offset for the
//! enumerate stage, the last completed product identifier for the image stage.

use crate::error::DatabaseError;
use crate::types::Stage;
use crate::{Error, Result};

use super::Database;

impl Database {
    /// Load the saved position of a stage
    pub async fn load_cursor(&self, stage: Stage) -> Result<Option<String>> {
        let position: Option<String> = sqlx::query_scalar(
            r#"
            SELECT position FROM sync_cursors WHERE stage = ?
            "#,
        )
        .bind(stage.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load {} cursor: {}",
                stage, e
            )))
        })?;

        Ok(position)
    }

    /// Save the position of a stage, replacing any previous one
    pub async fn save_cursor(&self, stage: Stage, position: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO sync_cursors (stage, position, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(stage) DO UPDATE SET position = excluded.position, updated_at = excluded.updated_at
            "#,
        )
        .bind(stage.as_str())
        .bind(position)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to save {} cursor: {}",
                stage, e
            )))
        })?;

        Ok(())
    }

    /// Forget the position of a stage
    pub async fn clear_cursor(&self, stage: Stage) -> Result<()> {
        sqlx::query("DELETE FROM sync_cursors WHERE stage = ?")
            .bind(stage.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to clear {} cursor: {}",
                    stage, e
                )))
            })?;

        Ok(())
    }
}
