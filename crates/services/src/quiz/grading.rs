use quiz_core::model::{Question, QuestionKind, Selection};

/// Outcome of grading one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub is_correct: bool,
}

/// Grade a selection against a question's canonical answer.
///
/// Pure and idempotent: the same (question, selection) pair always yields
/// the same verdict. Comparison is order-independent set equality over the
/// normalized token sets; `true/false` questions match their single literal
/// token ignoring ASCII case.
///
/// Malformed content (an empty canonical answer) always grades incorrect
/// rather than erroring, so the learner is never blocked; it is logged for
/// content triage.
#[must_use]
pub fn grade(question: &Question, selection: &Selection) -> Verdict {
    let key = question.answer_key();
    if key.is_empty() {
        tracing::warn!(
            question_id = %question.id(),
            "question has no canonical answer; grading as incorrect"
        );
        return Verdict { is_correct: false };
    }
    if selection.is_empty() {
        return Verdict { is_correct: false };
    }

    let is_correct = match question.kind() {
        QuestionKind::TrueFalse => match (key.tokens(), selection.tokens()) {
            ([expected], [given]) => expected.eq_ignore_ascii_case(given),
            _ => false,
        },
        _ => selection.tokens() == key.tokens(),
    };
    Verdict { is_correct }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerKey, ModuleName, QuestionId};

    fn build_question(kind: QuestionKind, key: &str) -> Question {
        Question::new(
            QuestionId::new(1),
            kind,
            "What is it?",
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            AnswerKey::parse(key),
            ModuleName::new("anatomy").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn multi_select_matches_regardless_of_order() {
        let question = build_question(QuestionKind::Multiple, "A,C");
        assert!(grade(&question, &Selection::many(["C", "A"])).is_correct);
        assert!(!grade(&question, &Selection::many(["A", "B"])).is_correct);
        assert!(!grade(&question, &Selection::single("A")).is_correct);
    }

    #[test]
    fn empty_selection_is_incorrect() {
        let question = build_question(QuestionKind::Single, "A");
        assert!(!grade(&question, &Selection::none()).is_correct);
    }

    #[test]
    fn empty_canonical_answer_is_never_correct() {
        let question = build_question(QuestionKind::Single, "");
        assert!(!grade(&question, &Selection::single("A")).is_correct);
        assert!(!grade(&question, &Selection::none()).is_correct);
    }

    #[test]
    fn true_false_matches_literal_ignoring_case() {
        let question = build_question(QuestionKind::TrueFalse, "true");
        assert!(grade(&question, &Selection::single("true")).is_correct);
        assert!(grade(&question, &Selection::single("True")).is_correct);
        assert!(!grade(&question, &Selection::single("false")).is_correct);
    }

    #[test]
    fn single_select_requires_exact_token() {
        let question = build_question(QuestionKind::Single, "B");
        assert!(grade(&question, &Selection::single(" B ")).is_correct);
        assert!(!grade(&question, &Selection::single("b")).is_correct);
    }

    #[test]
    fn grading_is_idempotent() {
        let question = build_question(QuestionKind::Multiple, "A,C");
        let selection = Selection::many(["C", "A"]);
        let first = grade(&question, &selection);
        let second = grade(&question, &selection);
        assert_eq!(first, second);
    }
}
