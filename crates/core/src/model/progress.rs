use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::answer::Selection;
use crate::model::ids::{QuestionId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizTypeError {
    #[error("quiz type cannot be empty")]
    Empty,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("question order cannot be empty")]
    EmptyOrder,

    #[error("cycle numbers start at 1")]
    CycleZero,

    #[error("index {index} is out of range for {len} questions")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("answer can only be recorded for the current question")]
    NotCurrent,

    #[error("index {0} was already answered")]
    AlreadyAnswered(usize),

    #[error("current question has not been answered")]
    NotAnswered,

    #[error("cannot advance past the final question")]
    AtEnd,

    #[error("cannot complete before the final question")]
    NotAtEnd,

    #[error("cycle is already completed")]
    Completed,

    #[error("correct count ({count}) does not match correct indices ({indices})")]
    CountMismatch { count: u32, indices: usize },

    #[error("index {0} is tallied both correct and incorrect")]
    OverlappingTallies(usize),
}

//
// ─── QUIZ TYPE ─────────────────────────────────────────────────────────────────
//

/// Validated name of a resumable quiz flavour (e.g. `"practice"`).
///
/// Together with the user id and cycle number it keys a progress record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuizType(String);

impl QuizType {
    /// Create a validated quiz type.
    ///
    /// # Errors
    ///
    /// Returns `QuizTypeError::Empty` if the value is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, QuizTypeError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QuizTypeError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QuizType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Durable state of one cycle's attempt, keyed by (user, quiz type, cycle).
///
/// The question order is fixed when the cycle starts and only ever consumed
/// by index. Tallies are updated exactly once per index, and a completed
/// record never mutates again. Every transition validates its precondition
/// so a caller cannot drive the record into a state the store should never
/// see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    user_id: UserId,
    quiz_type: QuizType,
    cycle: u32,
    question_order: Vec<QuestionId>,
    current_index: usize,
    selected_answers: BTreeMap<usize, Selection>,
    correct_count: u32,
    correct_questions: BTreeSet<usize>,
    incorrect_questions: BTreeSet<usize>,
    completed: bool,
}

impl ProgressRecord {
    /// Start a fresh cycle over an already-shuffled question order.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::EmptyOrder` for an empty order and
    /// `ProgressError::CycleZero` for cycle 0.
    pub fn start(
        user_id: UserId,
        quiz_type: QuizType,
        cycle: u32,
        question_order: Vec<QuestionId>,
    ) -> Result<Self, ProgressError> {
        if question_order.is_empty() {
            return Err(ProgressError::EmptyOrder);
        }
        if cycle == 0 {
            return Err(ProgressError::CycleZero);
        }
        Ok(Self {
            user_id,
            quiz_type,
            cycle,
            question_order,
            current_index: 0,
            selected_answers: BTreeMap::new(),
            correct_count: 0,
            correct_questions: BTreeSet::new(),
            incorrect_questions: BTreeSet::new(),
            completed: false,
        })
    }

    /// Rehydrate a record from persisted storage, revalidating invariants.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the stored shape violates any invariant:
    /// empty order, cycle 0, position or tally index out of range, a tally
    /// counted on both sides, or a correct count that disagrees with the
    /// correct index set.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        quiz_type: QuizType,
        cycle: u32,
        question_order: Vec<QuestionId>,
        current_index: usize,
        selected_answers: BTreeMap<usize, Selection>,
        correct_count: u32,
        correct_questions: BTreeSet<usize>,
        incorrect_questions: BTreeSet<usize>,
        completed: bool,
    ) -> Result<Self, ProgressError> {
        if question_order.is_empty() {
            return Err(ProgressError::EmptyOrder);
        }
        if cycle == 0 {
            return Err(ProgressError::CycleZero);
        }
        let len = question_order.len();
        if current_index >= len {
            return Err(ProgressError::IndexOutOfRange {
                index: current_index,
                len,
            });
        }
        for &index in selected_answers
            .keys()
            .chain(&correct_questions)
            .chain(&incorrect_questions)
        {
            if index >= len {
                return Err(ProgressError::IndexOutOfRange { index, len });
            }
        }
        if let Some(&index) = correct_questions.intersection(&incorrect_questions).next() {
            return Err(ProgressError::OverlappingTallies(index));
        }
        if correct_count as usize != correct_questions.len() {
            return Err(ProgressError::CountMismatch {
                count: correct_count,
                indices: correct_questions.len(),
            });
        }
        Ok(Self {
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
        })
    }

    // ─── Transitions ───────────────────────────────────────────────────────────

    /// Record the graded answer for the current question.
    ///
    /// Does not advance the position; advancing is a separate transition so
    /// the stored snapshot between the two matches what the learner saw.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Completed` on a finished cycle,
    /// `ProgressError::NotCurrent` for any index other than the current
    /// one, and `ProgressError::AlreadyAnswered` on a resubmit.
    pub fn record_answer(
        &mut self,
        index: usize,
        selection: Selection,
        is_correct: bool,
    ) -> Result<(), ProgressError> {
        if self.completed {
            return Err(ProgressError::Completed);
        }
        if index != self.current_index {
            return Err(ProgressError::NotCurrent);
        }
        if self.selected_answers.contains_key(&index) {
            return Err(ProgressError::AlreadyAnswered(index));
        }
        self.selected_answers.insert(index, selection);
        if is_correct {
            self.correct_questions.insert(index);
            self.correct_count += 1;
        } else {
            self.incorrect_questions.insert(index);
        }
        Ok(())
    }

    /// Move to the next question.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Completed` on a finished cycle,
    /// `ProgressError::NotAnswered` if the current question has no recorded
    /// answer, and `ProgressError::AtEnd` at the final index (which needs
    /// [`ProgressRecord::complete`] instead).
    pub fn advance(&mut self) -> Result<(), ProgressError> {
        if self.completed {
            return Err(ProgressError::Completed);
        }
        if !self.selected_answers.contains_key(&self.current_index) {
            return Err(ProgressError::NotAnswered);
        }
        if self.current_index + 1 >= self.question_order.len() {
            return Err(ProgressError::AtEnd);
        }
        self.current_index += 1;
        Ok(())
    }

    /// Mark the cycle completed. Terminal: no transition is valid after.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Completed` if already completed,
    /// `ProgressError::NotAtEnd` before the final index, and
    /// `ProgressError::NotAnswered` if the final question has no recorded
    /// answer.
    pub fn complete(&mut self) -> Result<(), ProgressError> {
        if self.completed {
            return Err(ProgressError::Completed);
        }
        if self.current_index + 1 != self.question_order.len() {
            return Err(ProgressError::NotAtEnd);
        }
        if !self.selected_answers.contains_key(&self.current_index) {
            return Err(ProgressError::NotAnswered);
        }
        self.completed = true;
        Ok(())
    }

    /// Reposition at [`ProgressRecord::resume_index`] after a reload.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Completed` on a finished cycle, which has
    /// nothing to resume.
    pub fn resume(&mut self) -> Result<(), ProgressError> {
        if self.completed {
            return Err(ProgressError::Completed);
        }
        self.current_index = self.resume_index();
        Ok(())
    }

    // ─── Queries ───────────────────────────────────────────────────────────────

    /// Index to resume at after a reload.
    ///
    /// The stored index `k` was written right after scoring question `k`,
    /// before advancing, so resumption lands on `k` when `k == 0` and on
    /// `k + 1` otherwise. This mirrors the shipped behavior exactly rather
    /// than "fixing" it; the final index is the ceiling so the position
    /// invariant holds.
    #[must_use]
    pub fn resume_index(&self) -> usize {
        if self.current_index == 0 {
            0
        } else {
            (self.current_index + 1).min(self.question_order.len() - 1)
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn quiz_type(&self) -> &QuizType {
        &self.quiz_type
    }

    #[must_use]
    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    #[must_use]
    pub fn question_order(&self) -> &[QuestionId] {
        &self.question_order
    }

    /// Number of questions in the cycle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.question_order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.question_order.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn is_answered(&self, index: usize) -> bool {
        self.selected_answers.contains_key(&index)
    }

    #[must_use]
    pub fn selection(&self, index: usize) -> Option<&Selection> {
        self.selected_answers.get(&index)
    }

    #[must_use]
    pub fn selected_answers(&self) -> &BTreeMap<usize, Selection> {
        &self.selected_answers
    }

    /// Stored correctness for an index: `Some(true)` if tallied correct,
    /// `Some(false)` if tallied incorrect, `None` if never graded.
    #[must_use]
    pub fn status(&self, index: usize) -> Option<bool> {
        if self.correct_questions.contains(&index) {
            Some(true)
        } else if self.incorrect_questions.contains(&index) {
            Some(false)
        } else {
            None
        }
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn correct_questions(&self) -> &BTreeSet<usize> {
        &self.correct_questions
    }

    #[must_use]
    pub fn incorrect_questions(&self) -> &BTreeSet<usize> {
        &self.incorrect_questions
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.selected_answers.len()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn order(n: u64) -> Vec<QuestionId> {
        (1..=n).map(QuestionId::new).collect()
    }

    fn fresh(n: u64) -> ProgressRecord {
        ProgressRecord::start(
            UserId::random(),
            QuizType::new("practice").unwrap(),
            1,
            order(n),
        )
        .unwrap()
    }

    #[test]
    fn start_rejects_empty_order_and_cycle_zero() {
        let user = UserId::random();
        let quiz = QuizType::new("practice").unwrap();
        assert!(matches!(
            ProgressRecord::start(user, quiz.clone(), 1, Vec::new()),
            Err(ProgressError::EmptyOrder)
        ));
        assert!(matches!(
            ProgressRecord::start(user, quiz, 0, order(3)),
            Err(ProgressError::CycleZero)
        ));
    }

    #[test]
    fn answers_are_recorded_exactly_once_per_index() {
        let mut record = fresh(3);
        record
            .record_answer(0, Selection::single("A"), true)
            .unwrap();

        let err = record
            .record_answer(0, Selection::single("B"), false)
            .unwrap_err();
        assert!(matches!(err, ProgressError::AlreadyAnswered(0)));

        assert_eq!(record.correct_count(), 1);
        assert!(record.correct_questions().contains(&0));
        assert!(record.incorrect_questions().is_empty());
    }

    #[test]
    fn answer_for_a_non_current_index_is_rejected() {
        let mut record = fresh(3);
        let err = record
            .record_answer(2, Selection::single("A"), true)
            .unwrap_err();
        assert!(matches!(err, ProgressError::NotCurrent));
    }

    #[test]
    fn advance_requires_an_answer_first() {
        let mut record = fresh(2);
        assert!(matches!(record.advance(), Err(ProgressError::NotAnswered)));

        record
            .record_answer(0, Selection::single("A"), false)
            .unwrap();
        record.advance().unwrap();
        assert_eq!(record.current_index(), 1);
    }

    #[test]
    fn final_index_needs_complete_not_advance() {
        let mut record = fresh(1);
        record
            .record_answer(0, Selection::single("A"), true)
            .unwrap();
        assert!(matches!(record.advance(), Err(ProgressError::AtEnd)));
        record.complete().unwrap();
        assert!(record.is_completed());
    }

    #[test]
    fn completed_cycle_is_terminal() {
        let mut record = fresh(1);
        record
            .record_answer(0, Selection::single("A"), true)
            .unwrap();
        record.complete().unwrap();

        assert!(matches!(
            record.record_answer(0, Selection::single("A"), true),
            Err(ProgressError::Completed)
        ));
        assert!(matches!(record.advance(), Err(ProgressError::Completed)));
        assert!(matches!(record.complete(), Err(ProgressError::Completed)));
    }

    #[test]
    fn complete_rejected_before_final_index() {
        let mut record = fresh(3);
        record
            .record_answer(0, Selection::single("A"), true)
            .unwrap();
        assert!(matches!(record.complete(), Err(ProgressError::NotAtEnd)));
    }

    #[test]
    fn resume_index_keeps_position_zero() {
        let mut record = fresh(5);
        record
            .record_answer(0, Selection::single("A"), true)
            .unwrap();
        // saved right after scoring index 0, before advancing
        assert_eq!(record.resume_index(), 0);
    }

    #[test]
    fn resume_index_skips_past_nonzero_saved_position() {
        let mut record = fresh(5);
        record
            .record_answer(0, Selection::single("A"), true)
            .unwrap();
        record.advance().unwrap();
        record
            .record_answer(1, Selection::single("B"), false)
            .unwrap();
        assert_eq!(record.current_index(), 1);
        assert_eq!(record.resume_index(), 2);
    }

    #[test]
    fn resume_index_is_clamped_to_final_question() {
        let mut record = fresh(3);
        for i in 0..2 {
            record
                .record_answer(i, Selection::single("A"), true)
                .unwrap();
            record.advance().unwrap();
        }
        record
            .record_answer(2, Selection::single("A"), true)
            .unwrap();
        // saved at the final index without completing
        assert_eq!(record.resume_index(), 2);
    }

    #[test]
    fn from_persisted_validates_tallies() {
        let user = UserId::random();
        let quiz = QuizType::new("practice").unwrap();

        let err = ProgressRecord::from_persisted(
            user,
            quiz.clone(),
            1,
            order(3),
            0,
            BTreeMap::new(),
            2,
            BTreeSet::from([0]),
            BTreeSet::new(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ProgressError::CountMismatch { .. }));

        let err = ProgressRecord::from_persisted(
            user,
            quiz.clone(),
            1,
            order(3),
            0,
            BTreeMap::new(),
            1,
            BTreeSet::from([0]),
            BTreeSet::from([0]),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ProgressError::OverlappingTallies(0)));

        let err = ProgressRecord::from_persisted(
            user,
            quiz,
            1,
            order(3),
            7,
            BTreeMap::new(),
            0,
            BTreeSet::new(),
            BTreeSet::new(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ProgressError::IndexOutOfRange { .. }));
    }

    #[test]
    fn from_persisted_accepts_a_valid_snapshot() {
        let user = UserId::random();
        let quiz = QuizType::new("practice").unwrap();
        let record = ProgressRecord::from_persisted(
            user,
            quiz,
            2,
            order(3),
            1,
            BTreeMap::from([(0, Selection::single("A")), (1, Selection::single("C"))]),
            1,
            BTreeSet::from([0]),
            BTreeSet::from([1]),
            false,
        )
        .unwrap();
        assert_eq!(record.cycle(), 2);
        assert_eq!(record.status(0), Some(true));
        assert_eq!(record.status(1), Some(false));
        assert_eq!(record.status(2), None);
    }
}
