use chrono::{DateTime, Utc};
use quiz_core::model::{ModuleName, QuestionId, UserId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{id_i64, question_id_from_i64, ser},
};
use crate::repository::{ResultHistoryRepository, StorageError};

#[async_trait::async_trait]
impl ResultHistoryRepository for SqliteRepository {
    async fn record_outcome(
        &self,
        user: UserId,
        question_id: QuestionId,
        module: &ModuleName,
        correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO question_results (
                    user_id, question_id, module, correct, answered_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(user_id, question_id) DO UPDATE SET
                    module = excluded.module,
                    correct = excluded.correct,
                    answered_at = excluded.answered_at
            ",
        )
        .bind(user.to_string())
        .bind(id_i64("question_id", question_id.value())?)
        .bind(module.as_str())
        .bind(i64::from(correct))
        .bind(answered_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn question_ids_with_outcome(
        &self,
        user: UserId,
        module: &ModuleName,
        correct: bool,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question_id
                FROM question_results
                WHERE user_id = ?1 AND module = ?2 AND correct = ?3
                ORDER BY question_id
            ",
        )
        .bind(user.to_string())
        .bind(module.as_str())
        .bind(i64::from(correct))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(question_id_from_i64(
                row.try_get::<i64, _>("question_id").map_err(ser)?,
            )?);
        }
        Ok(out)
    }
}
