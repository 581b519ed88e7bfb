mod builder;
mod grading;
mod review;
mod tracker;
mod workflow;

// Public API of the quiz subsystem.
pub use crate::error::{ExamBuildError, QuizSessionError, ReviewError};
pub use builder::{BuiltExam, ExamBuilder, STANDARD_POOL_LIMIT, shuffled_order};
pub use grading::{Verdict, grade};
pub use review::{AttemptReview, ReviewItem, ReviewService};
pub use tracker::{QuizProgress, QuizSession};
pub use workflow::{CYCLE_POOL_LIMIT, CycleResults, QuizLoopService, SubmitOutcome};
