use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{ProgressRecord, QuizType, Selection, UserId};
use storage::repository::{ProgressRepository, QuestionRepository, ResultHistoryRepository};

use super::builder::shuffled_order;
use super::grading::{Verdict, grade};
use super::tracker::QuizSession;
use crate::error::QuizSessionError;

/// Upper bound on the pull backing a resumable cycle's shuffle.
pub const CYCLE_POOL_LIMIT: u32 = 500;

/// Result of submitting an answer for the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub verdict: Verdict,
    pub at_final_question: bool,
}

/// Terminal tallies of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleResults {
    pub cycle: u32,
    pub total: usize,
    pub correct: u32,
    pub incorrect: usize,
    pub correct_questions: BTreeSet<usize>,
    pub incorrect_questions: BTreeSet<usize>,
}

/// Orchestrates resumable cycles: start/resume, persisted answering,
/// advancing, and final submission.
///
/// Every transition runs the same pipeline: apply to a candidate record,
/// persist the full snapshot, and only then commit the candidate to the
/// in-memory session. A failed write therefore leaves the session exactly
/// where it was and the call can be retried.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    progress: Arc<dyn ProgressRepository>,
    results: Arc<dyn ResultHistoryRepository>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        progress: Arc<dyn ProgressRepository>,
        results: Arc<dyn ResultHistoryRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            progress,
            results,
        }
    }

    /// Load the learner's current cycle, starting a new one when needed.
    ///
    /// - no stored record: cycle 1, fresh shuffle, inserted before use
    /// - latest record completed: next cycle, fresh shuffle, new row (the
    ///   finished cycle stays untouched as history)
    /// - latest record incomplete: stored order re-resolved against the
    ///   question bank and repositioned per the resumption rule
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::EmptyPool` when the bank has no questions
    /// for a fresh cycle, and `QuizSessionError::Storage` on fetch or
    /// persist failures.
    pub async fn resume_or_start(
        &self,
        user: UserId,
        quiz_type: &QuizType,
    ) -> Result<QuizSession, QuizSessionError> {
        match self.progress.latest_progress(user, quiz_type).await? {
            Some(record) if !record.is_completed() => {
                let questions = self.questions.get_questions(record.question_order()).await?;
                let mut record = record;
                record.resume()?;
                tracing::debug!(
                    user = %user,
                    quiz_type = %quiz_type,
                    cycle = record.cycle(),
                    index = record.current_index(),
                    "resuming incomplete cycle"
                );
                Ok(QuizSession::resume(questions, record))
            }
            latest => {
                let cycle = latest.map_or(1, |record| record.cycle() + 1);
                self.start_cycle(user, quiz_type, cycle).await
            }
        }
    }

    async fn start_cycle(
        &self,
        user: UserId,
        quiz_type: &QuizType,
        cycle: u32,
    ) -> Result<QuizSession, QuizSessionError> {
        let pool = self.questions.list_all(CYCLE_POOL_LIMIT).await?;
        if pool.is_empty() {
            return Err(QuizSessionError::EmptyPool);
        }

        let order = shuffled_order(&pool);
        let record = ProgressRecord::start(user, quiz_type.clone(), cycle, order)?;
        self.progress.insert_progress(&record).await?;
        tracing::debug!(
            user = %user,
            quiz_type = %quiz_type,
            cycle,
            total = record.len(),
            "started new cycle"
        );

        let mut by_id: HashMap<_, _> = pool.into_iter().map(|q| (q.id(), q)).collect();
        let questions = record
            .question_order()
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        Ok(QuizSession::begin(questions, record))
    }

    /// Grade and durably record the answer for the current question.
    ///
    /// Does not advance the position. The per-question outcome history
    /// (which feeds the familiarity filter) is updated best-effort: a
    /// failure there is logged but does not fail the submission.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Completed` on a finished cycle,
    /// `QuizSessionError::AlreadySubmitted` on a resubmit, and
    /// `QuizSessionError::Storage` if the snapshot write fails (the local
    /// session is left unchanged).
    pub async fn submit_answer(
        &self,
        session: &mut QuizSession,
        selection: Selection,
    ) -> Result<SubmitOutcome, QuizSessionError> {
        if session.is_complete() {
            return Err(QuizSessionError::Completed);
        }
        if session.has_submitted() {
            return Err(QuizSessionError::AlreadySubmitted);
        }

        let question = session.current_question().clone();
        let verdict = grade(&question, &selection);

        let mut candidate = session.record().clone();
        candidate.record_answer(session.current_index(), selection, verdict.is_correct)?;
        self.progress.update_progress(&candidate).await?;
        session.commit_submit(candidate);

        if let Err(e) = self
            .results
            .record_outcome(
                session.record().user_id(),
                question.id(),
                question.module(),
                verdict.is_correct,
                self.clock.now(),
            )
            .await
        {
            tracing::warn!(
                question_id = %question.id(),
                error = %e,
                "failed to record outcome history"
            );
        }

        Ok(SubmitOutcome {
            verdict,
            at_final_question: session.at_final_question(),
        })
    }

    /// Move to the next question, persisting the new position.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Completed` on a finished cycle,
    /// `QuizSessionError::NotSubmitted` before the current question was
    /// answered, `QuizSessionError::AtEnd` at the final question (which
    /// needs [`QuizLoopService::final_submit`]), and
    /// `QuizSessionError::Storage` if the write fails (local state is left
    /// unchanged).
    pub async fn advance(&self, session: &mut QuizSession) -> Result<(), QuizSessionError> {
        if session.is_complete() {
            return Err(QuizSessionError::Completed);
        }
        if !session.has_submitted() {
            return Err(QuizSessionError::NotSubmitted);
        }
        if session.at_final_question() {
            return Err(QuizSessionError::AtEnd);
        }

        let mut candidate = session.record().clone();
        candidate.advance()?;
        self.progress.update_progress(&candidate).await?;
        session.commit_advance(candidate);
        Ok(())
    }

    /// Mark the cycle completed and return the terminal tallies.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Completed` if already finished,
    /// `QuizSessionError::NotSubmitted` before the final question was
    /// answered, `QuizSessionError::Progress` when not at the final
    /// question, and `QuizSessionError::Storage` if the write fails (local
    /// state is left unchanged).
    pub async fn final_submit(
        &self,
        session: &mut QuizSession,
    ) -> Result<CycleResults, QuizSessionError> {
        if session.is_complete() {
            return Err(QuizSessionError::Completed);
        }
        if !session.has_submitted() {
            return Err(QuizSessionError::NotSubmitted);
        }

        let mut candidate = session.record().clone();
        candidate.complete()?;
        self.progress.update_progress(&candidate).await?;
        session.commit_complete(candidate);

        let record = session.record();
        tracing::debug!(
            user = %record.user_id(),
            quiz_type = %record.quiz_type(),
            cycle = record.cycle(),
            correct = record.correct_count(),
            "cycle completed"
        );
        Ok(CycleResults {
            cycle: record.cycle(),
            total: record.len(),
            correct: record.correct_count(),
            incorrect: record.incorrect_questions().len(),
            correct_questions: record.correct_questions().clone(),
            incorrect_questions: record.incorrect_questions().clone(),
        })
    }
}
