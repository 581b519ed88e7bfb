use quiz_core::model::ExamSession;

use super::{
    SqliteRepository,
    mapping::{ids_to_json, map_exam_row},
};
use crate::repository::{ExamSessionRepository, StorageError};

impl SqliteRepository {
    /// Fetch a persisted exam session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the id is unknown, or other
    /// storage errors.
    pub async fn get_exam_session(&self, id: i64) -> Result<ExamSession, StorageError> {
        let row = sqlx::query(
            r"
                SELECT user_id, style, module, familiarity, question_ids,
                       timed, started_at, ends_at
                FROM exam_sessions
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_exam_row(&row)
    }
}

#[async_trait::async_trait]
impl ExamSessionRepository for SqliteRepository {
    async fn insert_session(&self, session: &ExamSession) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO exam_sessions (
                    user_id, style, module, familiarity, question_ids,
                    timed, started_at, ends_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(session.user_id().to_string())
        .bind(session.style().as_str())
        .bind(session.module().map(|m| m.as_str().to_string()))
        .bind(session.familiarity().map(|f| f.as_str()))
        .bind(ids_to_json(session.question_ids())?)
        .bind(i64::from(session.is_timed()))
        .bind(session.started_at())
        .bind(session.ends_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }
}
