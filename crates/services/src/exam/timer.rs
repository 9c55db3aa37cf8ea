use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::info;

use super::session::{ExamSession, ExamState};

const TICK: Duration = Duration::from_secs(1);

/// One-second countdown driving an exam.
///
/// The interval lives in a spawned task that is aborted when the timer is
/// dropped, so pausing or leaving the exam just drops the timer. The task
/// stops by itself once the exam is finished.
pub struct ExamTimer {
    handle: JoinHandle<()>,
}

impl ExamTimer {
    /// Start ticking `exam` every second, publishing its state on `state_tx`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(exam: Arc<Mutex<ExamSession>>, state_tx: watch::Sender<ExamState>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + TICK, TICK);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let (state, left) = {
                    let mut exam = exam.lock().await;
                    (exam.tick(), exam.seconds_left())
                };
                state_tx.send_replace(state);
                if state == ExamState::Finished {
                    if left == 0 {
                        info!("exam time is up");
                    }
                    break;
                }
            }
        });
        Self { handle }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ExamTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
