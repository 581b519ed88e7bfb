use thiserror::Error;

use crate::model::answer::AnswerKey;
use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("unknown question kind: {0}")]
    UnknownKind(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleNameError {
    #[error("module name cannot be empty")]
    Empty,
}

//
// ─── MODULE NAME ───────────────────────────────────────────────────────────────
//

/// Validated module (subcategory) name a question is tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a validated module name.
    ///
    /// # Errors
    ///
    /// Returns `ModuleNameError::Empty` if the name is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, ModuleNameError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModuleNameError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── QUESTION KIND ─────────────────────────────────────────────────────────────
//

/// Answer format of a question.
///
/// - `Single`: one correct option letter/value
/// - `Multiple`: a set of correct option values
/// - `TrueFalse`: the literal `"true"` or `"false"`
/// - `SubquestionGroup`: a parent holding true/false subquestions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Single,
    Multiple,
    TrueFalse,
    SubquestionGroup,
}

impl QuestionKind {
    /// Storage representation of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Single => "single",
            QuestionKind::Multiple => "multiple",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::SubquestionGroup => "subquestion_group",
        }
    }

    /// Parses the storage representation back into a kind.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownKind` for unrecognized values.
    pub fn parse(value: &str) -> Result<Self, QuestionError> {
        match value {
            "single" => Ok(Self::Single),
            "multiple" => Ok(Self::Multiple),
            "true_false" => Ok(Self::TrueFalse),
            "subquestion_group" => Ok(Self::SubquestionGroup),
            other => Err(QuestionError::UnknownKind(other.to_string())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One exam question.
///
/// Read-only reference data from the engine's perspective; authored and
/// edited by the admin collaborator. The canonical answer is already
/// normalized into an [`AnswerKey`] when a question is constructed, so the
/// rest of the engine never sees the raw stored shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    kind: QuestionKind,
    text: String,
    options: Vec<String>,
    answer_key: AnswerKey,
    explanation: Option<String>,
    module: ModuleName,
    category: Option<String>,
}

impl Question {
    /// Create a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if the text is empty after
    /// trimming.
    pub fn new(
        id: QuestionId,
        kind: QuestionKind,
        text: impl Into<String>,
        options: Vec<String>,
        answer_key: AnswerKey,
        module: ModuleName,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        Ok(Self {
            id,
            kind,
            text,
            options,
            answer_key,
            explanation: None,
            module,
            category: None,
        })
    }

    /// Attach the rich-text explanation shown after grading.
    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Attach the top-level category label.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Rehydrate a question from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if the stored text is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuestionId,
        kind: QuestionKind,
        text: String,
        options: Vec<String>,
        answer_key: AnswerKey,
        explanation: Option<String>,
        module: ModuleName,
        category: Option<String>,
    ) -> Result<Self, QuestionError> {
        let mut question = Self::new(id, kind, text, options, answer_key, module)?;
        question.explanation = explanation;
        question.category = category;
        Ok(question)
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Ordered option strings, as authored.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn answer_key(&self) -> &AnswerKey {
        &self.answer_key
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn module(&self) -> &ModuleName {
        &self.module
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> ModuleName {
        ModuleName::new("anatomy").unwrap()
    }

    #[test]
    fn question_rejects_empty_text() {
        let err = Question::new(
            QuestionId::new(1),
            QuestionKind::Single,
            "   ",
            vec!["A".into(), "B".into()],
            AnswerKey::parse("A"),
            module(),
        )
        .unwrap_err();
        assert!(matches!(err, QuestionError::EmptyText));
    }

    #[test]
    fn question_kind_roundtrips_through_storage_repr() {
        for kind in [
            QuestionKind::Single,
            QuestionKind::Multiple,
            QuestionKind::TrueFalse,
            QuestionKind::SubquestionGroup,
        ] {
            assert_eq!(QuestionKind::parse(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn question_kind_rejects_unknown_repr() {
        let err = QuestionKind::parse("essay").unwrap_err();
        assert!(matches!(err, QuestionError::UnknownKind(_)));
    }

    #[test]
    fn module_name_is_trimmed_and_non_empty() {
        assert_eq!(ModuleName::new(" anatomy ").unwrap().as_str(), "anatomy");
        assert!(matches!(ModuleName::new("  "), Err(ModuleNameError::Empty)));
    }

    #[test]
    fn builder_style_setters_attach_optional_fields() {
        let q = Question::new(
            QuestionId::new(7),
            QuestionKind::Multiple,
            "Pick two",
            vec!["A".into(), "B".into(), "C".into()],
            AnswerKey::parse("A,C"),
            module(),
        )
        .unwrap()
        .with_explanation("<p>Because.</p>")
        .with_category("Basics");

        assert_eq!(q.explanation(), Some("<p>Because.</p>"));
        assert_eq!(q.category(), Some("Basics"));
    }
}
