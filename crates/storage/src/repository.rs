use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    ExamSession, ModuleName, ProgressRecord, Question, QuestionId, QuestionKind, QuizType, UserId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Read/write contract over the question bank.
///
/// The engine treats questions as read-only reference data; the write side
/// exists for the admin collaborator, seeding, and tests.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Fetch up to `limit` questions of any kind, in stable id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn list_all(&self, limit: u32) -> Result<Vec<Question>, StorageError>;

    /// Fetch up to `limit` questions of one kind, in stable id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn list_by_kind(
        &self,
        kind: QuestionKind,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError>;

    /// Fetch every question tagged with a module, in stable id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn list_by_module(&self, module: &ModuleName) -> Result<Vec<Question>, StorageError>;

    /// Resolve ids to full questions, preserving the input order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any id is missing; a stored
    /// order must never silently shrink on reload.
    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError>;
}

/// Contract over durable quiz progress records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the highest-cycle record for (user, quiz type), if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn latest_progress(
        &self,
        user: UserId,
        quiz_type: &QuizType,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// Fetch every cycle for (user, quiz type), newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn list_progress(
        &self,
        user: UserId,
        quiz_type: &QuizType,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Insert a new cycle's record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the (user, quiz type, cycle) key
    /// already exists; prior cycles are history and are never overwritten.
    async fn insert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError>;

    /// Overwrite an existing cycle's record with a full snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the key does not exist.
    async fn update_progress(&self, record: &ProgressRecord) -> Result<(), StorageError>;
}

/// Contract over the learner's per-question outcome history.
///
/// Feeds the familiarity filter: one row per (user, question), holding the
/// latest outcome.
#[async_trait]
pub trait ResultHistoryRepository: Send + Sync {
    /// Record (or replace) the learner's latest outcome for a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the outcome cannot be stored.
    async fn record_outcome(
        &self,
        user: UserId,
        question_id: QuestionId,
        module: &ModuleName,
        correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Ids of the user's questions in a module with the given outcome.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn question_ids_with_outcome(
        &self,
        user: UserId,
        module: &ModuleName,
        correct: bool,
    ) -> Result<Vec<QuestionId>, StorageError>;
}

/// Contract over single-shot mock-exam session records.
#[async_trait]
pub trait ExamSessionRepository: Send + Sync {
    /// Persist an exam session, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn insert_session(&self, session: &ExamSession) -> Result<i64, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct OutcomeRow {
    module: ModuleName,
    correct: bool,
    #[allow(dead_code)]
    answered_at: DateTime<Utc>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    progress: Arc<Mutex<HashMap<(UserId, QuizType), BTreeMap<u32, ProgressRecord>>>>,
    results: Arc<Mutex<HashMap<(UserId, QuestionId), OutcomeRow>>>,
    exams: Arc<Mutex<Vec<ExamSession>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<T>(guard: &Arc<Mutex<T>>) -> Result<std::sync::MutexGuard<'_, T>, StorageError> {
        guard
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.questions)?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn list_all(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let guard = Self::lock(&self.questions)?;
        Ok(guard
            .values()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn list_by_kind(
        &self,
        kind: QuestionKind,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = Self::lock(&self.questions)?;
        Ok(guard
            .values()
            .filter(|q| q.kind() == kind)
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn list_by_module(&self, module: &ModuleName) -> Result<Vec<Question>, StorageError> {
        let guard = Self::lock(&self.questions)?;
        Ok(guard
            .values()
            .filter(|q| q.module() == module)
            .cloned()
            .collect())
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        let guard = Self::lock(&self.questions)?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match guard.get(id) {
                Some(question) => found.push(question.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn latest_progress(
        &self,
        user: UserId,
        quiz_type: &QuizType,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = Self::lock(&self.progress)?;
        Ok(guard
            .get(&(user, quiz_type.clone()))
            .and_then(|cycles| cycles.values().next_back().cloned()))
    }

    async fn list_progress(
        &self,
        user: UserId,
        quiz_type: &QuizType,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = Self::lock(&self.progress)?;
        Ok(guard
            .get(&(user, quiz_type.clone()))
            .map(|cycles| cycles.values().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.progress)?;
        let cycles = guard
            .entry((record.user_id(), record.quiz_type().clone()))
            .or_default();
        if cycles.contains_key(&record.cycle()) {
            return Err(StorageError::Conflict);
        }
        cycles.insert(record.cycle(), record.clone());
        Ok(())
    }

    async fn update_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.progress)?;
        let cycles = guard
            .get_mut(&(record.user_id(), record.quiz_type().clone()))
            .ok_or(StorageError::NotFound)?;
        match cycles.get_mut(&record.cycle()) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound),
        }
    }
}

#[async_trait]
impl ResultHistoryRepository for InMemoryRepository {
    async fn record_outcome(
        &self,
        user: UserId,
        question_id: QuestionId,
        module: &ModuleName,
        correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.results)?;
        guard.insert(
            (user, question_id),
            OutcomeRow {
                module: module.clone(),
                correct,
                answered_at,
            },
        );
        Ok(())
    }

    async fn question_ids_with_outcome(
        &self,
        user: UserId,
        module: &ModuleName,
        correct: bool,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let guard = Self::lock(&self.results)?;
        let mut ids: Vec<QuestionId> = guard
            .iter()
            .filter(|((owner, _), row)| {
                *owner == user && row.module == *module && row.correct == correct
            })
            .map(|((_, id), _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ExamSessionRepository for InMemoryRepository {
    async fn insert_session(&self, session: &ExamSession) -> Result<i64, StorageError> {
        let mut guard = Self::lock(&self.exams)?;
        guard.push(session.clone());
        i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("session id overflow".into()))
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub results: Arc<dyn ResultHistoryRepository>,
    pub exams: Arc<dyn ExamSessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            questions: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            results: Arc::new(repo.clone()),
            exams: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
