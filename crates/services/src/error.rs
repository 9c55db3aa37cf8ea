//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::import::ImportError;
use study_core::model::{ExamConfigError, QuestionSetError, SetId};

/// Errors emitted by `QuestionSetService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionSetServiceError {
    #[error("question set not found: {0}")]
    NotFound(SetId),
    #[error(transparent)]
    Domain(#[from] study_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<QuestionSetError> for QuestionSetServiceError {
    fn from(err: QuestionSetError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<ImportError> for QuestionSetServiceError {
    fn from(err: ImportError) -> Self {
        Self::Domain(err.into())
    }
}

/// Errors emitted by study/review session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions match the current filters")]
    Empty,
    #[error("no question is currently shown")]
    NoCurrentQuestion,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by exam sessions.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("the set has no questions to draw from")]
    NoQuestions,
    #[error("exam has not started")]
    NotStarted,
    #[error("exam already started")]
    AlreadyStarted,
    #[error("exam is paused")]
    Paused,
    #[error("exam is not paused")]
    NotPaused,
    #[error("exam already finished")]
    Finished,
    #[error(transparent)]
    Config(#[from] ExamConfigError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    QuestionSet(#[from] QuestionSetServiceError),
}
