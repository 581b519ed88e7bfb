#![forbid(unsafe_code)]

pub mod error;
pub mod quiz;

pub use quiz_core::Clock;

pub use error::{ExamBuildError, QuizSessionError, ReviewError};
pub use quiz::{
    AttemptReview, BuiltExam, CycleResults, ExamBuilder, QuizLoopService, QuizProgress,
    QuizSession, ReviewItem, ReviewService, SubmitOutcome, Verdict, grade, shuffled_order,
};
