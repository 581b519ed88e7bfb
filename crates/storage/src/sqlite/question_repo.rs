use std::collections::HashMap;

use quiz_core::model::{ModuleName, Question, QuestionId, QuestionKind};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_question_row, options_to_json},
};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let id = id_i64("question_id", question.id().value())?;
        let options = options_to_json(question.options())?;

        sqlx::query(
            r"
                INSERT INTO questions (
                    id, kind, text, options, answer_key, explanation, module, category
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    kind = excluded.kind,
                    text = excluded.text,
                    options = excluded.options,
                    answer_key = excluded.answer_key,
                    explanation = excluded.explanation,
                    module = excluded.module,
                    category = excluded.category
            ",
        )
        .bind(id)
        .bind(question.kind().as_str())
        .bind(question.text())
        .bind(options)
        .bind(question.answer_key().to_string())
        .bind(question.explanation())
        .bind(question.module().as_str())
        .bind(question.category())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_all(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, kind, text, options, answer_key, explanation, module, category
                FROM questions
                ORDER BY id
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }

    async fn list_by_kind(
        &self,
        kind: QuestionKind,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, kind, text, options, answer_key, explanation, module, category
                FROM questions
                WHERE kind = ?1
                ORDER BY id
                LIMIT ?2
            ",
        )
        .bind(kind.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }

    async fn list_by_module(&self, module: &ModuleName) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, kind, text, options, answer_key, explanation, module, category
                FROM questions
                WHERE module = ?1
                ORDER BY id
            ",
        )
        .bind(module.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
                SELECT id, kind, text, options, answer_key, explanation, module, category
                FROM questions
                WHERE id IN (
            ",
        );
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push(')');

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id_i64("question_id", id.value())?);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut by_id: HashMap<QuestionId, Question> = HashMap::with_capacity(rows.len());
        for row in rows {
            let question = map_question_row(&row)?;
            by_id.insert(question.id(), question);
        }

        // reassemble in the caller's order; a stored order must not shrink
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.get(id) {
                Some(question) => out.push(question.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(out)
    }
}
