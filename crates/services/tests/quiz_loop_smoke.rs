use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use quiz_core::model::{
    AnswerKey, ModuleName, ProgressRecord, Question, QuestionId, QuestionKind, QuizType,
    Selection, UserId,
};
use quiz_core::time::fixed_clock;
use services::{QuizLoopService, QuizSessionError};
use storage::repository::{
    InMemoryRepository, ProgressRepository, QuestionRepository, ResultHistoryRepository, Storage,
    StorageError,
};

fn build_question(id: u64) -> Question {
    Question::new(
        QuestionId::new(id),
        QuestionKind::Single,
        format!("Q{id}"),
        vec!["A".into(), "B".into(), "C".into()],
        AnswerKey::parse("A"),
        ModuleName::new("anatomy").unwrap(),
    )
    .unwrap()
}

async fn seed(repo: &InMemoryRepository, n: u64) {
    for id in 1..=n {
        repo.upsert_question(&build_question(id)).await.unwrap();
    }
}

fn loop_service(repo: &InMemoryRepository) -> QuizLoopService {
    QuizLoopService::new(
        fixed_clock(),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
}

fn quiz() -> QuizType {
    QuizType::new("practice").unwrap()
}

#[tokio::test]
async fn full_cycle_persists_tallies_and_outcome_history() {
    let storage = Storage::in_memory();
    for id in 1..=3 {
        storage
            .questions
            .upsert_question(&build_question(id))
            .await
            .unwrap();
    }
    let svc = QuizLoopService::new(
        fixed_clock(),
        storage.questions.clone(),
        storage.progress.clone(),
        storage.results.clone(),
    );
    let user = UserId::random();

    let mut session = svc.resume_or_start(user, &quiz()).await.unwrap();
    assert_eq!(session.cycle(), 1);
    assert_eq!(session.total_questions(), 3);

    let results = loop {
        let outcome = svc
            .submit_answer(&mut session, Selection::single("A"))
            .await
            .unwrap();
        assert!(outcome.verdict.is_correct);
        if outcome.at_final_question {
            break svc.final_submit(&mut session).await.unwrap();
        }
        svc.advance(&mut session).await.unwrap();
    };

    assert_eq!(results.total, 3);
    assert_eq!(results.correct, 3);
    assert_eq!(results.incorrect, 0);
    assert!(session.is_complete());

    let stored = storage
        .progress
        .latest_progress(user, &quiz())
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_completed());
    assert_eq!(stored.correct_count(), 3);

    let correct_history = storage
        .results
        .question_ids_with_outcome(user, &ModuleName::new("anatomy").unwrap(), true)
        .await
        .unwrap();
    assert_eq!(correct_history.len(), 3);
}

#[tokio::test]
async fn completed_cycle_starts_the_next_one_and_keeps_history() {
    let repo = InMemoryRepository::new();
    seed(&repo, 2).await;
    let svc = loop_service(&repo);
    let user = UserId::random();

    let mut session = svc.resume_or_start(user, &quiz()).await.unwrap();
    svc.submit_answer(&mut session, Selection::single("B"))
        .await
        .unwrap();
    svc.advance(&mut session).await.unwrap();
    svc.submit_answer(&mut session, Selection::single("A"))
        .await
        .unwrap();
    let first_results = svc.final_submit(&mut session).await.unwrap();
    assert_eq!(first_results.cycle, 1);
    assert_eq!(first_results.correct, 1);

    let finished_first = repo.latest_progress(user, &quiz()).await.unwrap().unwrap();

    let next = svc.resume_or_start(user, &quiz()).await.unwrap();
    assert_eq!(next.cycle(), 2);
    assert!(!next.is_complete());
    assert_eq!(next.record().answered_count(), 0);

    let all = repo.list_progress(user, &quiz()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].cycle(), 2);
    // the finished cycle's row is untouched by the new cycle
    assert_eq!(all[1], finished_first);
}

#[tokio::test]
async fn reload_before_advancing_resumes_at_index_zero() {
    let repo = InMemoryRepository::new();
    seed(&repo, 5).await;
    let svc = loop_service(&repo);
    let user = UserId::random();

    let mut session = svc.resume_or_start(user, &quiz()).await.unwrap();
    let outcome = svc
        .submit_answer(&mut session, Selection::single("A"))
        .await
        .unwrap();
    assert!(outcome.verdict.is_correct);
    drop(session);

    // persisted snapshot holds current_index == 0; resumption stays there
    let resumed = svc.resume_or_start(user, &quiz()).await.unwrap();
    assert_eq!(resumed.cycle(), 1);
    assert_eq!(resumed.current_index(), 0);
    assert!(resumed.has_submitted());
    assert_eq!(resumed.record().correct_count(), 1);
}

#[tokio::test]
async fn reload_after_nonzero_save_skips_one_position() {
    let repo = InMemoryRepository::new();
    seed(&repo, 5).await;
    let svc = loop_service(&repo);
    let user = UserId::random();

    let mut session = svc.resume_or_start(user, &quiz()).await.unwrap();
    svc.submit_answer(&mut session, Selection::single("A"))
        .await
        .unwrap();
    svc.advance(&mut session).await.unwrap();
    svc.submit_answer(&mut session, Selection::single("A"))
        .await
        .unwrap();
    assert_eq!(session.current_index(), 1);
    drop(session);

    // saved index 1 resumes one past it
    let resumed = svc.resume_or_start(user, &quiz()).await.unwrap();
    assert_eq!(resumed.current_index(), 2);
    assert!(!resumed.has_submitted());
}

#[tokio::test]
async fn resumed_order_matches_the_stored_shuffle() {
    let repo = InMemoryRepository::new();
    seed(&repo, 10).await;
    let svc = loop_service(&repo);
    let user = UserId::random();

    let session = svc.resume_or_start(user, &quiz()).await.unwrap();
    let original_order: Vec<QuestionId> = session.record().question_order().to_vec();
    drop(session);

    let resumed = svc.resume_or_start(user, &quiz()).await.unwrap();
    assert_eq!(resumed.record().question_order(), original_order);
    let resolved: Vec<QuestionId> = resumed.questions().iter().map(Question::id).collect();
    assert_eq!(resolved, original_order);
}

#[tokio::test]
async fn double_submit_is_rejected() {
    let repo = InMemoryRepository::new();
    seed(&repo, 3).await;
    let svc = loop_service(&repo);

    let mut session = svc
        .resume_or_start(UserId::random(), &quiz())
        .await
        .unwrap();
    svc.submit_answer(&mut session, Selection::single("A"))
        .await
        .unwrap();
    let err = svc
        .submit_answer(&mut session, Selection::single("B"))
        .await
        .unwrap_err();
    assert!(matches!(err, QuizSessionError::AlreadySubmitted));
}

#[tokio::test]
async fn advance_requires_a_submitted_answer() {
    let repo = InMemoryRepository::new();
    seed(&repo, 3).await;
    let svc = loop_service(&repo);

    let mut session = svc
        .resume_or_start(UserId::random(), &quiz())
        .await
        .unwrap();
    let err = svc.advance(&mut session).await.unwrap_err();
    assert!(matches!(err, QuizSessionError::NotSubmitted));
}

#[tokio::test]
async fn final_submit_is_only_valid_at_the_last_question() {
    let repo = InMemoryRepository::new();
    seed(&repo, 3).await;
    let svc = loop_service(&repo);

    let mut session = svc
        .resume_or_start(UserId::random(), &quiz())
        .await
        .unwrap();
    svc.submit_answer(&mut session, Selection::single("A"))
        .await
        .unwrap();
    let err = svc.final_submit(&mut session).await.unwrap_err();
    assert!(matches!(err, QuizSessionError::Progress(_)));

    // the live session is untouched by the rejected transition
    assert!(!session.is_complete());
    assert_eq!(session.current_index(), 0);
}

#[tokio::test]
async fn empty_question_bank_cannot_start_a_cycle() {
    let repo = InMemoryRepository::new();
    let svc = loop_service(&repo);
    let err = svc
        .resume_or_start(UserId::random(), &quiz())
        .await
        .unwrap_err();
    assert!(matches!(err, QuizSessionError::EmptyPool));
}

//
// ─── PERSISTENCE FAILURE ───────────────────────────────────────────────────────
//

/// Progress store that can be switched to fail writes, for exercising the
/// persist-before-commit rule.
#[derive(Clone)]
struct FlakyProgressStore {
    inner: InMemoryRepository,
    failing: Arc<AtomicBool>,
}

#[async_trait]
impl ProgressRepository for FlakyProgressStore {
    async fn latest_progress(
        &self,
        user: UserId,
        quiz_type: &QuizType,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        self.inner.latest_progress(user, quiz_type).await
    }

    async fn list_progress(
        &self,
        user: UserId,
        quiz_type: &QuizType,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        self.inner.list_progress(user, quiz_type).await
    }

    async fn insert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        self.inner.insert_progress(record).await
    }

    async fn update_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("write refused".into()));
        }
        self.inner.update_progress(record).await
    }
}

#[tokio::test]
async fn failed_persist_does_not_move_local_state() {
    let repo = InMemoryRepository::new();
    seed(&repo, 3).await;
    let failing = Arc::new(AtomicBool::new(false));
    let flaky = FlakyProgressStore {
        inner: repo.clone(),
        failing: failing.clone(),
    };
    let svc = QuizLoopService::new(
        fixed_clock(),
        Arc::new(repo.clone()),
        Arc::new(flaky),
        Arc::new(repo.clone()),
    );
    let user = UserId::random();

    let mut session = svc.resume_or_start(user, &quiz()).await.unwrap();

    failing.store(true, Ordering::SeqCst);
    let err = svc
        .submit_answer(&mut session, Selection::single("A"))
        .await
        .unwrap_err();
    assert!(matches!(err, QuizSessionError::Storage(_)));
    assert!(!session.has_submitted());
    assert_eq!(session.record().answered_count(), 0);

    // the store holds the untouched snapshot, so the retry succeeds cleanly
    failing.store(false, Ordering::SeqCst);
    let outcome = svc
        .submit_answer(&mut session, Selection::single("A"))
        .await
        .unwrap();
    assert!(outcome.verdict.is_correct);
    assert!(session.has_submitted());

    let stored = repo.latest_progress(user, &quiz()).await.unwrap().unwrap();
    assert_eq!(stored.answered_count(), 1);
}
