use thiserror::Error;

use crate::import::ImportError;
use crate::model::{ExamConfigError, ProgressError, QuestionSetError};

/// Any domain validation failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    QuestionSet(#[from] QuestionSetError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    ExamConfig(#[from] ExamConfigError),
}
