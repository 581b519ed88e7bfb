use std::sync::Arc;

use quiz_core::model::{ProgressRecord, Question, QuizType, Selection, UserId};
use storage::repository::{ProgressRepository, QuestionRepository};

use super::grading::grade;
use crate::error::ReviewError;

/// One scored line of a reconstructed attempt.
///
/// `stored_status` is what the live session tallied at submit time and is
/// what the records screen reports; `regraded` re-runs the current grading
/// rule over the stored selection as a consistency cross-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub question: Question,
    pub selection: Option<Selection>,
    pub stored_status: Option<bool>,
    pub regraded: Option<bool>,
}

/// Read-only scored view of one past cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReview {
    pub cycle: u32,
    pub completed: bool,
    pub total: usize,
    pub correct: u32,
    pub items: Vec<ReviewItem>,
}

/// Reconstructs historical attempts for the records screen.
#[derive(Clone)]
pub struct ReviewService {
    questions: Arc<dyn QuestionRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ReviewService {
    #[must_use]
    pub fn new(
        questions: Arc<dyn QuestionRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            questions,
            progress,
        }
    }

    /// Every past cycle for (user, quiz type), newest first.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Storage` on repository failures.
    pub async fn list_attempts(
        &self,
        user: UserId,
        quiz_type: &QuizType,
    ) -> Result<Vec<ProgressRecord>, ReviewError> {
        let records = self.progress.list_progress(user, quiz_type).await?;
        Ok(records)
    }

    /// Rebuild the scored view of one attempt.
    ///
    /// Re-fetches the full question objects for the stored order and pairs
    /// each index with its stored selection and status. Stored/regraded
    /// disagreements are logged for content triage; the stored status stays
    /// authoritative.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Storage` if any question of the stored order
    /// can no longer be fetched.
    pub async fn reconstruct(
        &self,
        record: &ProgressRecord,
    ) -> Result<AttemptReview, ReviewError> {
        let questions = self.questions.get_questions(record.question_order()).await?;

        let items = questions
            .into_iter()
            .enumerate()
            .map(|(index, question)| {
                let selection = record.selection(index).cloned();
                let stored_status = record.status(index);
                let regraded = selection
                    .as_ref()
                    .map(|selection| grade(&question, selection).is_correct);
                if let (Some(stored), Some(fresh)) = (stored_status, regraded) {
                    if stored != fresh {
                        tracing::warn!(
                            question_id = %question.id(),
                            cycle = record.cycle(),
                            stored,
                            regraded = fresh,
                            "stored status disagrees with regrade"
                        );
                    }
                }
                ReviewItem {
                    question,
                    selection,
                    stored_status,
                    regraded,
                }
            })
            .collect();

        Ok(AttemptReview {
            cycle: record.cycle(),
            completed: record.is_completed(),
            total: record.len(),
            correct: record.correct_count(),
            items,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerKey, ModuleName, QuestionId, QuestionKind};
    use storage::repository::{InMemoryRepository, QuestionRepository};

    fn build_question(id: u64, key: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            QuestionKind::Single,
            format!("Question {id}"),
            vec!["A".into(), "B".into(), "C".into()],
            AnswerKey::parse(key),
            ModuleName::new("anatomy").unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn reconstruct_pairs_selections_with_stored_status() {
        let repo = InMemoryRepository::new();
        for id in 1..=3 {
            repo.upsert_question(&build_question(id, "A")).await.unwrap();
        }

        let mut record = ProgressRecord::start(
            UserId::random(),
            QuizType::new("practice").unwrap(),
            1,
            vec![QuestionId::new(2), QuestionId::new(1), QuestionId::new(3)],
        )
        .unwrap();
        record
            .record_answer(0, Selection::single("A"), true)
            .unwrap();
        record.advance().unwrap();
        record
            .record_answer(1, Selection::single("B"), false)
            .unwrap();

        let service = ReviewService::new(Arc::new(repo.clone()), Arc::new(repo));
        let review = service.reconstruct(&record).await.unwrap();

        assert_eq!(review.total, 3);
        assert_eq!(review.correct, 1);
        assert!(!review.completed);

        // items come back in question_order order
        assert_eq!(review.items[0].question.id(), QuestionId::new(2));
        assert_eq!(review.items[0].stored_status, Some(true));
        assert_eq!(review.items[0].regraded, Some(true));

        assert_eq!(review.items[1].stored_status, Some(false));
        assert_eq!(review.items[1].regraded, Some(false));

        // never answered
        assert_eq!(review.items[2].selection, None);
        assert_eq!(review.items[2].stored_status, None);
        assert_eq!(review.items[2].regraded, None);
    }
}
