#![forbid(unsafe_code)]

pub mod app_services;
pub mod app_state;
pub mod error;
pub mod exam;
pub mod export;
pub mod progress_store;
pub mod question_sets;
pub mod sessions;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use app_state::{AppState, AppStore};
pub use error::{AppServicesError, ExamError, QuestionSetServiceError, SessionError};
pub use exam::{ExamLoopService, ExamRun, ExamSession, ExamState, Urgency};
pub use export::ProgressExport;
pub use progress_store::ProgressStore;
pub use question_sets::QuestionSetService;
pub use sessions::{SequenceOrder, SessionPhase, StudyLoopService, StudyMode, StudySession};
