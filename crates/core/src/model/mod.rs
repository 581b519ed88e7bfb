mod answer;
mod exam;
mod ids;
mod progress;
mod question;

pub use answer::{AnswerKey, Selection};
pub use exam::{
    ExamConfig, ExamSession, ExamSessionError, ExamStyle, Familiarity, DEFAULT_QUESTION_COUNT,
};
pub use ids::{ParseIdError, QuestionId, UserId};
pub use progress::{ProgressError, ProgressRecord, QuizType, QuizTypeError};
pub use question::{ModuleName, ModuleNameError, Question, QuestionError, QuestionKind};
