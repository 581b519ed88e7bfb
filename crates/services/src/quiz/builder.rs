use std::collections::HashSet;
use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;

use quiz_core::Clock;
use quiz_core::model::{
    ExamConfig, ExamSession, ExamStyle, Familiarity, ModuleName, Question, QuestionId,
    QuestionKind, UserId,
};
use storage::repository::{ExamSessionRepository, QuestionRepository, ResultHistoryRepository};

use crate::error::ExamBuildError;

/// Upper bound on the standard-style pull from the question bank.
pub const STANDARD_POOL_LIMIT: u32 = 200;

/// Shuffle a pool into a session order (Fisher–Yates).
///
/// Applied once per cycle or exam start; the resulting order is a property
/// of the session and is never recomputed afterwards.
#[must_use]
pub fn shuffled_order(questions: &[Question]) -> Vec<QuestionId> {
    let mut ids: Vec<QuestionId> = questions.iter().map(Question::id).collect();
    let mut rng = rng();
    ids.as_mut_slice().shuffle(&mut rng);
    ids
}

fn dedup_prefix(ids: Vec<QuestionId>, count: usize) -> Vec<QuestionId> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .take(count)
        .collect()
}

/// A persisted mock exam, ready to hand to the exam screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltExam {
    pub session_id: i64,
    pub session: ExamSession,
}

/// Resolves an exam configuration into a concrete, persisted session.
#[derive(Clone)]
pub struct ExamBuilder {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    results: Arc<dyn ResultHistoryRepository>,
    exams: Arc<dyn ExamSessionRepository>,
}

impl ExamBuilder {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        results: Arc<dyn ResultHistoryRepository>,
        exams: Arc<dyn ExamSessionRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            results,
            exams,
        }
    }

    /// Build and persist a mock-exam session for the given configuration.
    ///
    /// Standard style draws a bounded pull of single-answer questions and
    /// shuffles once; test-by-module resolves the learner's familiarity
    /// filter against their outcome history, falling back to the whole
    /// module when that history is empty. The resolved pool is truncated to
    /// the requested count by prefix, with no extra shuffle beyond the
    /// upstream selection.
    ///
    /// # Errors
    ///
    /// Returns `ExamBuildError::MissingModule`/`MissingFamiliarity` for an
    /// invalid test-by-module configuration (no state is mutated),
    /// `ExamBuildError::EmptyPool` when nothing matches, and
    /// `ExamBuildError::Storage` on fetch or persist failures.
    pub async fn build(
        &self,
        user: UserId,
        config: &ExamConfig,
    ) -> Result<BuiltExam, ExamBuildError> {
        let pool = match config.style {
            ExamStyle::Standard => {
                let questions = self
                    .questions
                    .list_by_kind(QuestionKind::Single, STANDARD_POOL_LIMIT)
                    .await?;
                shuffled_order(&questions)
            }
            ExamStyle::TestByModule => {
                let module = config.module.as_ref().ok_or(ExamBuildError::MissingModule)?;
                let familiarity = config
                    .familiarity
                    .ok_or(ExamBuildError::MissingFamiliarity)?;
                self.module_pool(user, module, familiarity).await?
            }
        };

        let count = usize::try_from(config.count_or_default()).unwrap_or(usize::MAX);
        let question_ids = dedup_prefix(pool, count);
        if question_ids.is_empty() {
            return Err(ExamBuildError::EmptyPool);
        }

        let session = ExamSession::new(user, config, question_ids, self.clock.now())?;
        let session_id = self.exams.insert_session(&session).await?;
        tracing::debug!(
            user = %user,
            style = config.style.as_str(),
            count = session.question_count(),
            session_id,
            "exam session created"
        );

        Ok(BuiltExam {
            session_id,
            session,
        })
    }

    async fn module_pool(
        &self,
        user: UserId,
        module: &ModuleName,
        familiarity: Familiarity,
    ) -> Result<Vec<QuestionId>, ExamBuildError> {
        let wanted_outcome = match familiarity {
            Familiarity::All => {
                return Ok(self.full_module_pool(module).await?);
            }
            Familiarity::Correct => true,
            Familiarity::Incorrect => false,
        };

        let ids = self
            .results
            .question_ids_with_outcome(user, module, wanted_outcome)
            .await?;
        if ids.is_empty() {
            // no usable history yet; the whole module is the pool
            return Ok(self.full_module_pool(module).await?);
        }
        Ok(ids)
    }

    async fn full_module_pool(
        &self,
        module: &ModuleName,
    ) -> Result<Vec<QuestionId>, ExamBuildError> {
        let questions = self.questions.list_by_module(module).await?;
        Ok(questions.iter().map(Question::id).collect())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
