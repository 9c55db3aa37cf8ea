mod exam;
mod ids;
mod progress;
mod question;
mod question_set;

pub use ids::{ParseIdError, QuestionId, SetId};

pub use exam::{ExamConfig, ExamConfigError, ExamSummary};
pub use progress::{Confidence, ProgressError, ProgressMap, ProgressRecord, ProgressUpdate, round2};
pub use question::{AnswerLevel, Question};
pub use question_set::{QuestionSet, QuestionSetError, QuestionSetSummary, SetOrigin};
