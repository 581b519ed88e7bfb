//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{ExamSessionError, ProgressError};
use storage::repository::StorageError;

/// Errors emitted by `ExamBuilder`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamBuildError {
    #[error("test-by-module sessions require a module")]
    MissingModule,
    #[error("test-by-module sessions require a familiarity filter")]
    MissingFamiliarity,
    #[error("no questions matched the requested configuration")]
    EmptyPool,
    #[error(transparent)]
    Session(#[from] ExamSessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the live quiz session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("answer already submitted for the current question")]
    AlreadySubmitted,
    #[error("current question has not been answered")]
    NotSubmitted,
    #[error("cycle already completed")]
    Completed,
    #[error("final question reached; submit the cycle instead of advancing")]
    AtEnd,
    #[error("no questions available for a new cycle")]
    EmptyPool,
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the attempt review service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
