use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

use study_core::model::{Confidence, ExamConfig, ExamSummary, ProgressRecord, ProgressUpdate};

use super::session::{ExamSession, ExamState};
use super::timer::ExamTimer;
use crate::app_state::AppStore;
use crate::error::ExamError;
use crate::sessions::input::ExamCommand;

/// Starts exams over the open set.
#[derive(Clone)]
pub struct ExamLoopService {
    app: Arc<AppStore>,
    seed: Option<u64>,
}

impl ExamLoopService {
    #[must_use]
    pub fn new(app: Arc<AppStore>) -> Self {
        Self { app, seed: None }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Draw questions and start the exam, with its countdown if enabled.
    ///
    /// Must be called from within a tokio runtime when the timer is on.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Config` for an invalid config and
    /// `ExamError::NoQuestions` if the open set is empty.
    pub async fn start(&self, config: ExamConfig) -> Result<ExamRun, ExamError> {
        let state = self.app.snapshot().await;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut exam = ExamSession::new(config)?;
        exam.start(state.questions(), &mut rng, self.app.clock().now())?;
        info!(
            set = %state.set_id(),
            questions = exam.questions().len(),
            timed = config.use_timer(),
            "exam started"
        );

        let (state_tx, state_rx) = watch::channel(exam.state());
        let exam = Arc::new(Mutex::new(exam));
        let mut run = ExamRun {
            app: Arc::clone(&self.app),
            exam,
            timed: config.use_timer(),
            timer: None,
            state_tx,
            state_rx,
        };
        run.start_timer();
        Ok(run)
    }
}

/// A running exam: local answers, countdown, and progress persistence.
///
/// Dropping the run stops its timer.
pub struct ExamRun {
    app: Arc<AppStore>,
    exam: Arc<Mutex<ExamSession>>,
    timed: bool,
    timer: Option<ExamTimer>,
    state_tx: watch::Sender<ExamState>,
    state_rx: watch::Receiver<ExamState>,
}

impl ExamRun {
    fn start_timer(&mut self) {
        if self.timed {
            self.timer = Some(ExamTimer::start(
                Arc::clone(&self.exam),
                self.state_tx.clone(),
            ));
        }
    }

    fn publish(&mut self, state: ExamState) {
        self.state_tx.send_replace(state);
        if state != ExamState::InProgress {
            self.timer = None;
        }
    }

    /// State changes, including the timer running out.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ExamState> {
        self.state_rx.clone()
    }

    pub async fn state(&self) -> ExamState {
        self.exam.lock().await.state()
    }

    /// Copy of the exam for rendering.
    pub async fn snapshot(&self) -> ExamSession {
        self.exam.lock().await.clone()
    }

    /// # Errors
    ///
    /// Returns `ExamError` unless the exam is in progress.
    pub async fn reveal(&self) -> Result<(), ExamError> {
        self.exam.lock().await.reveal()
    }

    /// Answer the current question and save the rating as progress.
    ///
    /// The answer counts for the exam even if saving fails; the returned
    /// record is `None` in that case.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` unless the exam is in progress.
    pub async fn answer(&mut self, level: Confidence) -> Result<Option<ProgressRecord>, ExamError> {
        let (question_id, state) = {
            let mut exam = self.exam.lock().await;
            let id = exam.answer(level)?;
            (id, exam.state())
        };
        self.publish(state);
        debug!(question = %question_id, level = level.value(), "exam answer");
        Ok(self
            .app
            .apply(question_id, ProgressUpdate::confidence(level))
            .await)
    }

    /// # Errors
    ///
    /// Returns `ExamError` unless the exam is in progress.
    pub async fn skip(&mut self) -> Result<(), ExamError> {
        let state = {
            let mut exam = self.exam.lock().await;
            exam.skip()?;
            exam.state()
        };
        self.publish(state);
        Ok(())
    }

    /// Pause or resume. Pausing stops the timer; resuming starts a fresh one.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` before start or after finish.
    pub async fn toggle_pause(&mut self) -> Result<ExamState, ExamError> {
        let state = self.exam.lock().await.toggle_pause()?;
        self.publish(state);
        if state == ExamState::InProgress {
            self.start_timer();
        }
        debug!(?state, "exam pause toggled");
        Ok(state)
    }

    /// Finish now and return the scores.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::NotStarted` if the exam never started.
    pub async fn finish(&mut self) -> Result<ExamSummary, ExamError> {
        let summary = self.exam.lock().await.finish()?;
        self.publish(ExamState::Finished);
        info!(
            answered = summary.answered(),
            skipped = summary.skipped(),
            score = summary.score(),
            "exam finished"
        );
        Ok(summary)
    }

    pub async fn summary(&self) -> Option<ExamSummary> {
        self.exam.lock().await.summary()
    }

    /// Execute a keyboard command.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` when the command does not apply in the current state.
    pub async fn dispatch(&mut self, command: ExamCommand) -> Result<(), ExamError> {
        match command {
            ExamCommand::Reveal => self.reveal().await,
            ExamCommand::Answer(level) => self.answer(level).await.map(|_| ()),
            ExamCommand::Skip => self.skip().await,
            ExamCommand::TogglePause => self.toggle_pause().await.map(|_| ()),
        }
    }
}
