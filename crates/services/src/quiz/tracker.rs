use std::fmt;

use quiz_core::model::{ProgressRecord, Question};

//
// ─── PROGRESS SNAPSHOT ─────────────────────────────────────────────────────────
//

/// Aggregated view of a live attempt, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizProgress {
    pub total: usize,
    pub answered: usize,
    pub correct: u32,
    pub incorrect: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

//
// ─── QUIZ SESSION ──────────────────────────────────────────────────────────────
//

/// In-memory state of one cycle's live attempt.
///
/// Binds the resolved questions (in `question_order` order) to the durable
/// progress record. The session itself never applies a transition: the loop
/// service grades and persists on a candidate record first and only then
/// commits it here, so the local view can never run ahead of the store.
pub struct QuizSession {
    questions: Vec<Question>,
    record: ProgressRecord,
    submitted: bool,
}

impl QuizSession {
    /// Wrap a freshly started cycle positioned at the first question.
    pub(crate) fn begin(questions: Vec<Question>, record: ProgressRecord) -> Self {
        let submitted = record.is_answered(record.current_index());
        Self {
            questions,
            record,
            submitted,
        }
    }

    /// Wrap a reloaded incomplete cycle.
    ///
    /// The record is expected to already be repositioned via
    /// `ProgressRecord::resume`; the submitted flag derives from whether the
    /// resumption index holds a stored answer.
    pub(crate) fn resume(questions: Vec<Question>, record: ProgressRecord) -> Self {
        Self::begin(questions, record)
    }

    #[must_use]
    pub fn cycle(&self) -> u32 {
        self.record.cycle()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.record.current_index()
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.record.current_index()]
    }

    /// All questions of the cycle, in `question_order` order.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    /// Total number of questions in this cycle.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// True while the current question's answer is graded but not advanced.
    #[must_use]
    pub fn has_submitted(&self) -> bool {
        self.submitted
    }

    #[must_use]
    pub fn at_final_question(&self) -> bool {
        self.record.current_index() + 1 == self.questions.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.record.is_completed()
    }

    /// Returns a summary of the current attempt.
    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let total = self.questions.len();
        let answered = self.record.answered_count();
        QuizProgress {
            total,
            answered,
            correct: self.record.correct_count(),
            incorrect: self.record.incorrect_questions().len(),
            remaining: total.saturating_sub(answered),
            is_complete: self.record.is_completed(),
        }
    }

    // ─── Commit points (post-persistence only) ─────────────────────────────────

    pub(crate) fn commit_submit(&mut self, record: ProgressRecord) {
        self.record = record;
        self.submitted = true;
    }

    pub(crate) fn commit_advance(&mut self, record: ProgressRecord) {
        self.record = record;
        self.submitted = self.record.is_answered(self.record.current_index());
    }

    pub(crate) fn commit_complete(&mut self, record: ProgressRecord) {
        self.record = record;
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("cycle", &self.record.cycle())
            .field("questions_len", &self.questions.len())
            .field("current_index", &self.record.current_index())
            .field("submitted", &self.submitted)
            .field("completed", &self.record.is_completed())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
