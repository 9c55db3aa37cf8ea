use chrono::{DateTime, Utc};
use rand::Rng;

use study_core::model::{Confidence, ExamConfig, ExamSummary, Question, QuestionId};

use crate::error::ExamError;
use crate::sessions::{SessionPosition, draw_exam};

/// Lifecycle of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExamState {
    #[default]
    Configuring,
    InProgress,
    Paused,
    Finished,
}

/// How close the countdown is to running out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    /// Under a quarter of the time left.
    Warning,
    /// Under a tenth of the time left.
    Danger,
}

/// A bounded, optionally timed run over questions drawn from a set.
///
/// Local answers live here; persisting them as progress is the caller's job.
#[derive(Debug, Clone)]
pub struct ExamSession {
    config: ExamConfig,
    state: ExamState,
    questions: Vec<Question>,
    index: usize,
    answer_shown: bool,
    answers: Vec<(QuestionId, Confidence)>,
    seconds_left: u32,
    started_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    /// # Errors
    ///
    /// Returns `ExamError::Config` if `config` does not validate.
    pub fn new(config: ExamConfig) -> Result<Self, ExamError> {
        config.validate()?;
        Ok(Self {
            config,
            state: ExamState::Configuring,
            questions: Vec::new(),
            index: 0,
            answer_shown: false,
            answers: Vec::new(),
            seconds_left: 0,
            started_at: None,
        })
    }

    /// Draw the questions and start the countdown.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::AlreadyStarted` unless configuring, and
    /// `ExamError::NoQuestions` for an empty pool.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        pool: &[Question],
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<(), ExamError> {
        if self.state != ExamState::Configuring {
            return Err(ExamError::AlreadyStarted);
        }
        if pool.is_empty() {
            return Err(ExamError::NoQuestions);
        }
        self.questions = draw_exam(
            pool,
            self.config.effective_count(pool.len()),
            self.config.random_order(),
            rng,
        );
        self.index = 0;
        self.answer_shown = false;
        self.answers.clear();
        self.seconds_left = if self.config.use_timer() {
            self.config.total_seconds()
        } else {
            0
        };
        self.started_at = Some(now);
        self.state = ExamState::InProgress;
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> ExamState {
        self.state
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == ExamState::Finished
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[(QuestionId, Confidence)] {
        &self.answers
    }

    #[must_use]
    pub fn is_answer_shown(&self) -> bool {
        self.answer_shown
    }

    #[must_use]
    pub fn position(&self) -> SessionPosition {
        SessionPosition {
            index: self.index,
            total: self.questions.len(),
        }
    }

    /// The question being asked, `None` unless running or paused.
    #[must_use]
    pub fn current(&self) -> Option<&Question> {
        match self.state {
            ExamState::InProgress | ExamState::Paused => self.questions.get(self.index),
            ExamState::Configuring | ExamState::Finished => None,
        }
    }

    fn ensure_running(&self) -> Result<(), ExamError> {
        match self.state {
            ExamState::InProgress => Ok(()),
            ExamState::Configuring => Err(ExamError::NotStarted),
            ExamState::Paused => Err(ExamError::Paused),
            ExamState::Finished => Err(ExamError::Finished),
        }
    }

    /// Show the answer. Does not count as answering.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` unless the exam is in progress.
    pub fn reveal(&mut self) -> Result<(), ExamError> {
        self.ensure_running()?;
        self.answer_shown = true;
        Ok(())
    }

    /// Record `level` for the current question and move on.
    ///
    /// Returns the answered question's id.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` unless the exam is in progress.
    pub fn answer(&mut self, level: Confidence) -> Result<QuestionId, ExamError> {
        self.ensure_running()?;
        let id = self
            .questions
            .get(self.index)
            .map(Question::id)
            .ok_or(ExamError::Finished)?;
        self.answers.push((id, level));
        self.advance();
        Ok(id)
    }

    /// Move on without answering.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` unless the exam is in progress.
    pub fn skip(&mut self) -> Result<(), ExamError> {
        self.ensure_running()?;
        self.advance();
        Ok(())
    }

    fn advance(&mut self) {
        if self.index + 1 >= self.questions.len() {
            self.state = ExamState::Finished;
        } else {
            self.index += 1;
            self.answer_shown = false;
        }
    }

    /// # Errors
    ///
    /// Returns `ExamError` unless the exam is in progress.
    pub fn pause(&mut self) -> Result<(), ExamError> {
        self.ensure_running()?;
        self.state = ExamState::Paused;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ExamError::NotPaused` unless paused.
    pub fn resume(&mut self) -> Result<(), ExamError> {
        if self.state != ExamState::Paused {
            return Err(ExamError::NotPaused);
        }
        self.state = ExamState::InProgress;
        Ok(())
    }

    /// Pause if running, resume if paused. Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` before start or after finish.
    pub fn toggle_pause(&mut self) -> Result<ExamState, ExamError> {
        match self.state {
            ExamState::Paused => self.resume()?,
            _ => self.pause()?,
        }
        Ok(self.state)
    }

    /// End the exam now and score it. Finishing twice returns the same summary.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::NotStarted` while configuring.
    pub fn finish(&mut self) -> Result<ExamSummary, ExamError> {
        if self.state == ExamState::Configuring {
            return Err(ExamError::NotStarted);
        }
        self.state = ExamState::Finished;
        Ok(self.score())
    }

    fn score(&self) -> ExamSummary {
        let levels: Vec<Confidence> = self.answers.iter().map(|(_, c)| *c).collect();
        ExamSummary::from_answers(self.questions.len(), &levels)
    }

    /// Final scores, once finished.
    #[must_use]
    pub fn summary(&self) -> Option<ExamSummary> {
        self.is_finished().then(|| self.score())
    }

    /// One second of countdown. Only counts while running with the timer on;
    /// reaching zero finishes the exam.
    pub fn tick(&mut self) -> ExamState {
        if self.state == ExamState::InProgress && self.config.use_timer() {
            self.seconds_left = self.seconds_left.saturating_sub(1);
            if self.seconds_left == 0 {
                self.state = ExamState::Finished;
            }
        }
        self.state
    }

    #[must_use]
    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    /// Remaining time as `mm:ss`.
    #[must_use]
    pub fn time_left_label(&self) -> String {
        format!("{:02}:{:02}", self.seconds_left / 60, self.seconds_left % 60)
    }

    #[must_use]
    pub fn urgency(&self) -> Urgency {
        let total = u64::from(self.config.total_seconds());
        let left = u64::from(self.seconds_left);
        if !self.config.use_timer() || total == 0 {
            return Urgency::Normal;
        }
        if left * 10 < total {
            Urgency::Danger
        } else if left * 4 < total {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }
}
