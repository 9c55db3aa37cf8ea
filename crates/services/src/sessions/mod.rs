pub mod input;
mod plan;
mod progress;
mod study;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{SequenceOrder, build_sequence, draw_exam};
pub use progress::SessionPosition;
pub use study::{SessionPhase, StudyMode, StudySession, StudySessionBuilder};
pub use workflow::StudyLoopService;
