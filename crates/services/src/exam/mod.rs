mod session;
mod timer;
mod workflow;

pub use crate::error::ExamError;
pub use session::{ExamSession, ExamState, Urgency};
pub use timer::ExamTimer;
pub use workflow::{ExamLoopService, ExamRun};
