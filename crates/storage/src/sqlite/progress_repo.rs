use chrono::Utc;
use quiz_core::model::{ProgressRecord, QuizType, UserId};

use super::{
    SqliteRepository,
    mapping::{ids_to_json, index_set_to_json, map_progress_row, selections_to_json},
};
use crate::repository::{ProgressRepository, StorageError};

const SELECT_COLUMNS: &str = r"
    SELECT user_id, quiz_type, cycle, question_order, current_index,
           selected_answers, correct_count, correct_questions,
           incorrect_questions, completed
    FROM quiz_progress
";

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn latest_progress(
        &self,
        user: UserId,
        quiz_type: &QuizType,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 AND quiz_type = ?2 ORDER BY cycle DESC LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(user.to_string())
            .bind(quiz_type.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_progress(
        &self,
        user: UserId,
        quiz_type: &QuizType,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 AND quiz_type = ?2 ORDER BY cycle DESC");
        let rows = sqlx::query(&sql)
            .bind(user.to_string())
            .bind(quiz_type.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progress_row(&row)?);
        }
        Ok(out)
    }

    async fn insert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_progress (
                    user_id, quiz_type, cycle, question_order, current_index,
                    selected_answers, correct_count, correct_questions,
                    incorrect_questions, completed, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(record.user_id().to_string())
        .bind(record.quiz_type().as_str())
        .bind(i64::from(record.cycle()))
        .bind(ids_to_json(record.question_order())?)
        .bind(i64::try_from(record.current_index()).unwrap_or(i64::MAX))
        .bind(selections_to_json(record.selected_answers())?)
        .bind(i64::from(record.correct_count()))
        .bind(index_set_to_json(record.correct_questions())?)
        .bind(index_set_to_json(record.incorrect_questions())?)
        .bind(i64::from(record.is_completed()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Conflict)
            }
            Err(e) => Err(conn(e)),
        }
    }

    async fn update_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE quiz_progress SET
                    question_order = ?4,
                    current_index = ?5,
                    selected_answers = ?6,
                    correct_count = ?7,
                    correct_questions = ?8,
                    incorrect_questions = ?9,
                    completed = ?10,
                    updated_at = ?11
                WHERE user_id = ?1 AND quiz_type = ?2 AND cycle = ?3
            ",
        )
        .bind(record.user_id().to_string())
        .bind(record.quiz_type().as_str())
        .bind(i64::from(record.cycle()))
        .bind(ids_to_json(record.question_order())?)
        .bind(i64::try_from(record.current_index()).unwrap_or(i64::MAX))
        .bind(selections_to_json(record.selected_answers())?)
        .bind(i64::from(record.correct_count()))
        .bind(index_set_to_json(record.correct_questions())?)
        .bind(index_set_to_json(record.incorrect_questions())?)
        .bind(i64::from(record.is_completed()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
