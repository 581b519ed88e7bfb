use std::collections::{BTreeMap, BTreeSet};

use quiz_core::model::{
    AnswerKey, ExamSession, ExamStyle, Familiarity, ModuleName, ProgressRecord, Question,
    QuestionId, QuestionKind, QuizType, Selection, UserId,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn user_id_from_str(s: &str) -> Result<UserId, StorageError> {
    s.parse::<UserId>().map_err(ser)
}

//
// ─── JSON COLUMNS ──────────────────────────────────────────────────────────────
//

pub(crate) fn ids_to_json(ids: &[QuestionId]) -> Result<String, StorageError> {
    serde_json::to_string(ids).map_err(ser)
}

pub(crate) fn ids_from_json(raw: &str) -> Result<Vec<QuestionId>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

fn options_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn selections_to_json(
    selections: &BTreeMap<usize, Selection>,
) -> Result<String, StorageError> {
    serde_json::to_string(selections).map_err(ser)
}

fn selections_from_json(raw: &str) -> Result<BTreeMap<usize, Selection>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn index_set_to_json(indices: &BTreeSet<usize>) -> Result<String, StorageError> {
    serde_json::to_string(indices).map_err(ser)
}

fn index_set_from_json(raw: &str) -> Result<BTreeSet<usize>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

//
// ─── ROW MAPPERS ───────────────────────────────────────────────────────────────
//

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let kind = QuestionKind::parse(&kind_str).map_err(ser)?;

    let module_str: String = row.try_get("module").map_err(ser)?;
    let module = ModuleName::new(module_str).map_err(ser)?;

    let options = options_from_json(&row.try_get::<String, _>("options").map_err(ser)?)?;
    let answer_key = AnswerKey::parse(&row.try_get::<String, _>("answer_key").map_err(ser)?);

    Question::from_persisted(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        kind,
        row.try_get("text").map_err(ser)?,
        options,
        answer_key,
        row.try_get("explanation").map_err(ser)?,
        module,
        row.try_get("category").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProgressRecord, StorageError> {
    let user_id = user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let quiz_type =
        QuizType::new(row.try_get::<String, _>("quiz_type").map_err(ser)?).map_err(ser)?;

    let cycle_i64: i64 = row.try_get("cycle").map_err(ser)?;
    let cycle = u32::try_from(cycle_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid cycle: {cycle_i64}")))?;

    let index_i64: i64 = row.try_get("current_index").map_err(ser)?;
    let current_index = usize::try_from(index_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid current_index: {index_i64}")))?;

    let count_i64: i64 = row.try_get("correct_count").map_err(ser)?;
    let correct_count = u32::try_from(count_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid correct_count: {count_i64}")))?;

    let question_order =
        ids_from_json(&row.try_get::<String, _>("question_order").map_err(ser)?)?;
    let selected_answers =
        selections_from_json(&row.try_get::<String, _>("selected_answers").map_err(ser)?)?;
    let correct_questions =
        index_set_from_json(&row.try_get::<String, _>("correct_questions").map_err(ser)?)?;
    let incorrect_questions =
        index_set_from_json(&row.try_get::<String, _>("incorrect_questions").map_err(ser)?)?;

    let completed: bool = row.try_get::<i64, _>("completed").map_err(ser)? != 0;

    ProgressRecord::from_persisted(
        user_id,
        quiz_type,
        cycle,
        question_order,
        current_index,
        selected_answers,
        correct_count,
        correct_questions,
        incorrect_questions,
        completed,
    )
    .map_err(ser)
}

pub(crate) fn map_exam_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExamSession, StorageError> {
    let user_id = user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?;

    let style_str: String = row.try_get("style").map_err(ser)?;
    let style = ExamStyle::parse(&style_str).map_err(ser)?;

    let module = row
        .try_get::<Option<String>, _>("module")
        .map_err(ser)?
        .map(ModuleName::new)
        .transpose()
        .map_err(ser)?;

    let familiarity = row
        .try_get::<Option<String>, _>("familiarity")
        .map_err(ser)?
        .as_deref()
        .map(Familiarity::parse)
        .transpose()
        .map_err(ser)?;

    let question_ids = ids_from_json(&row.try_get::<String, _>("question_ids").map_err(ser)?)?;
    let timed: bool = row.try_get::<i64, _>("timed").map_err(ser)? != 0;

    ExamSession::from_persisted(
        user_id,
        style,
        module,
        familiarity,
        question_ids,
        timed,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("ends_at").map_err(ser)?,
    )
    .map_err(ser)
}
