use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::ids::{QuestionId, UserId};
use crate::model::question::ModuleName;

/// Question count used when a configuration leaves it unset.
pub const DEFAULT_QUESTION_COUNT: u32 = 30;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamSessionError {
    #[error("exam session needs at least one question")]
    EmptyQuestions,

    #[error("ends_at is before started_at")]
    InvalidTimeRange,

    #[error("unknown exam style: {0}")]
    UnknownStyle(String),

    #[error("unknown familiarity filter: {0}")]
    UnknownFamiliarity(String),
}

//
// ─── STYLE & FAMILIARITY ───────────────────────────────────────────────────────
//

/// How a mock exam's question pool is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamStyle {
    /// Draw from the full single-answer pool, ignoring history.
    Standard,
    /// Draw from one module, filtered by the learner's past results.
    TestByModule,
}

impl ExamStyle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExamStyle::Standard => "standard",
            ExamStyle::TestByModule => "test_by_module",
        }
    }

    /// Parses the storage representation back into a style.
    ///
    /// # Errors
    ///
    /// Returns `ExamSessionError::UnknownStyle` for unrecognized values.
    pub fn parse(value: &str) -> Result<Self, ExamSessionError> {
        match value {
            "standard" => Ok(Self::Standard),
            "test_by_module" => Ok(Self::TestByModule),
            other => Err(ExamSessionError::UnknownStyle(other.to_string())),
        }
    }
}

/// History-based filter over a module's questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Familiarity {
    All,
    Correct,
    Incorrect,
}

impl Familiarity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Familiarity::All => "all",
            Familiarity::Correct => "correct",
            Familiarity::Incorrect => "incorrect",
        }
    }

    /// Parses the storage representation back into a filter.
    ///
    /// # Errors
    ///
    /// Returns `ExamSessionError::UnknownFamiliarity` for unrecognized
    /// values.
    pub fn parse(value: &str) -> Result<Self, ExamSessionError> {
        match value {
            "all" => Ok(Self::All),
            "correct" => Ok(Self::Correct),
            "incorrect" => Ok(Self::Incorrect),
            other => Err(ExamSessionError::UnknownFamiliarity(other.to_string())),
        }
    }
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Transient input to the question-set builder.
///
/// Lives only for the duration of building one session; never persisted on
/// its own. Validation of the style/module/familiarity combination happens
/// in the builder so a rejected configuration causes no state mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamConfig {
    pub style: ExamStyle,
    pub module: Option<ModuleName>,
    pub familiarity: Option<Familiarity>,
    pub count: Option<u32>,
    pub timed: bool,
}

impl ExamConfig {
    /// A standard-style configuration with defaults.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            style: ExamStyle::Standard,
            module: None,
            familiarity: None,
            count: None,
            timed: false,
        }
    }

    /// A test-by-module configuration.
    #[must_use]
    pub fn by_module(module: ModuleName, familiarity: Familiarity) -> Self {
        Self {
            style: ExamStyle::TestByModule,
            module: Some(module),
            familiarity: Some(familiarity),
            count: None,
            timed: false,
        }
    }

    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_timer(mut self, timed: bool) -> Self {
        self.timed = timed;
        self
    }

    /// Requested count, falling back to [`DEFAULT_QUESTION_COUNT`].
    #[must_use]
    pub fn count_or_default(&self) -> u32 {
        self.count.unwrap_or(DEFAULT_QUESTION_COUNT)
    }
}

//
// ─── EXAM SESSION ──────────────────────────────────────────────────────────────
//

/// Single-shot record of one mock-exam start.
///
/// Unlike a progress record this is never resumed or cycled: it captures
/// the resolved configuration, the fixed question list, and the timer
/// window, and is written once when the exam begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSession {
    user_id: UserId,
    style: ExamStyle,
    module: Option<ModuleName>,
    familiarity: Option<Familiarity>,
    question_ids: Vec<QuestionId>,
    timed: bool,
    started_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    /// Create a session over a resolved question list.
    ///
    /// When `timed` is set the end time is one minute per question from
    /// `started_at`.
    ///
    /// # Errors
    ///
    /// Returns `ExamSessionError::EmptyQuestions` for an empty list.
    pub fn new(
        user_id: UserId,
        config: &ExamConfig,
        question_ids: Vec<QuestionId>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, ExamSessionError> {
        if question_ids.is_empty() {
            return Err(ExamSessionError::EmptyQuestions);
        }
        let minutes = i64::try_from(question_ids.len()).unwrap_or(i64::MAX);
        let ends_at = config
            .timed
            .then(|| started_at + Duration::minutes(minutes));
        Ok(Self {
            user_id,
            style: config.style,
            module: config.module.clone(),
            familiarity: config.familiarity,
            question_ids,
            timed: config.timed,
            started_at,
            ends_at,
        })
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ExamSessionError::EmptyQuestions` for an empty list and
    /// `ExamSessionError::InvalidTimeRange` if `ends_at` precedes
    /// `started_at`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        style: ExamStyle,
        module: Option<ModuleName>,
        familiarity: Option<Familiarity>,
        question_ids: Vec<QuestionId>,
        timed: bool,
        started_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ExamSessionError> {
        if question_ids.is_empty() {
            return Err(ExamSessionError::EmptyQuestions);
        }
        if let Some(end) = ends_at {
            if end < started_at {
                return Err(ExamSessionError::InvalidTimeRange);
            }
        }
        Ok(Self {
            user_id,
            style,
            module,
            familiarity,
            question_ids,
            timed,
            started_at,
            ends_at,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn style(&self) -> ExamStyle {
        self.style
    }

    #[must_use]
    pub fn module(&self) -> Option<&ModuleName> {
        self.module.as_ref()
    }

    #[must_use]
    pub fn familiarity(&self) -> Option<Familiarity> {
        self.familiarity
    }

    #[must_use]
    pub fn question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    /// Resolved question count actually used for the session.
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.question_ids.len()
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.timed
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.ends_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
