use std::sync::Arc;

use study_core::filter::FilterCriteria;
use study_core::model::{Confidence, ProgressRecord};
use tracing::debug;

use super::input::StudyCommand;
use super::plan::SequenceOrder;
use super::study::{StudyMode, StudySession};
use crate::app_state::AppStore;
use crate::error::SessionError;

/// Runs study and review sessions against the shared `AppStore`.
///
/// Each rating is persisted before the session advances; a failed write
/// leaves both the progress map and the session position unchanged.
#[derive(Clone)]
pub struct StudyLoopService {
    app: Arc<AppStore>,
    seed: Option<u64>,
}

impl StudyLoopService {
    #[must_use]
    pub fn new(app: Arc<AppStore>) -> Self {
        Self { app, seed: None }
    }

    /// Seed shuffles of every session started from here.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Start a session over the open set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no question passes `criteria`.
    pub async fn start(
        &self,
        mode: StudyMode,
        criteria: FilterCriteria,
        order: SequenceOrder,
    ) -> Result<StudySession, SessionError> {
        let state = self.app.snapshot().await;
        let mut builder = StudySession::builder(mode, state.questions().to_vec())
            .with_criteria(criteria)
            .with_order(order);
        if let Some(seed) = self.seed {
            builder = builder.with_seed(seed);
        }
        let session = builder.build(&state.progress);
        if session.is_empty() {
            return Err(SessionError::Empty);
        }
        debug!(
            set = %state.set_id(),
            ?mode,
            visible = session.visible_questions().len(),
            "study session started"
        );
        Ok(session)
    }

    /// Record `level` for the current question, then advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCurrentQuestion` for an empty session and
    /// `SessionError::Storage` if the rating could not be saved.
    pub async fn submit_confidence(
        &self,
        session: &mut StudySession,
        level: Confidence,
    ) -> Result<ProgressRecord, SessionError> {
        let question_id = session
            .current()
            .map(|q| q.id())
            .ok_or(SessionError::NoCurrentQuestion)?;
        let record = self.app.try_record_confidence(question_id, level).await?;
        session.after_confidence();
        Ok(record)
    }

    /// Flip the bookmark of the current question. Position and phase are kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCurrentQuestion` for an empty session and
    /// `SessionError::Storage` if the write failed.
    pub async fn toggle_bookmark(
        &self,
        session: &StudySession,
    ) -> Result<ProgressRecord, SessionError> {
        let question_id = session
            .current()
            .map(|q| q.id())
            .ok_or(SessionError::NoCurrentQuestion)?;
        Ok(self.app.try_toggle_marked(question_id).await?)
    }

    /// Replace the filters, evaluated against the latest progress.
    pub async fn apply_criteria(&self, session: &mut StudySession, criteria: FilterCriteria) {
        let progress = self.app.progress().await;
        session.set_criteria(criteria, &progress);
    }

    pub async fn apply_order(&self, session: &mut StudySession, order: SequenceOrder) {
        let progress = self.app.progress().await;
        session.set_order(order, &progress);
    }

    /// Execute a keyboard command. Returns the stored record when a rating or
    /// bookmark was saved.
    ///
    /// # Errors
    ///
    /// Propagates errors from `submit_confidence`.
    pub async fn dispatch(
        &self,
        session: &mut StudySession,
        command: StudyCommand,
    ) -> Result<Option<ProgressRecord>, SessionError> {
        match command {
            StudyCommand::RevealOrNext => session.reveal_or_next(),
            StudyCommand::Reveal => session.show_answer(),
            StudyCommand::Prev => {
                session.prev();
            }
            StudyCommand::ToggleBookmark => {
                return self.toggle_bookmark(session).await.map(Some);
            }
            StudyCommand::Confidence(level) => {
                return self.submit_confidence(session, level).await.map(Some);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress_store::ProgressStore;
    use storage::repository::InMemoryRepository;
    use study_core::filter::Selection;
    use study_core::model::{Question, QuestionId, QuestionSet, SetId};
    use study_core::time::fixed_clock;

    async fn service() -> StudyLoopService {
        let store = ProgressStore::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        let set = QuestionSet::built_in(
            SetId::new("s"),
            "S",
            vec![
                Question::new(QuestionId::new(1), "A", "", "uno"),
                Question::new(QuestionId::new(2), "A", "", "dos"),
                Question::new(QuestionId::new(3), "B", "", "tres"),
            ],
        )
        .unwrap();
        StudyLoopService::new(Arc::new(AppStore::open(store, set).await))
    }

    fn c(v: u8) -> Confidence {
        Confidence::new(v).unwrap()
    }

    #[tokio::test]
    async fn rating_persists_then_advances() {
        let svc = service().await;
        let mut session = svc
            .start(StudyMode::Study, FilterCriteria::default(), SequenceOrder::Sequential)
            .await
            .unwrap();

        let record = svc.submit_confidence(&mut session, c(4)).await.unwrap();
        assert_eq!(record.times_shown(), 1);
        assert_eq!(session.current().unwrap().id(), QuestionId::new(2));
        assert_eq!(
            svc.app.record(QuestionId::new(1)).await.unwrap().last_confidence(),
            Some(c(4))
        );
    }

    #[tokio::test]
    async fn bookmark_keeps_position_and_phase() {
        let svc = service().await;
        let mut session = svc
            .start(StudyMode::Study, FilterCriteria::default(), SequenceOrder::Sequential)
            .await
            .unwrap();
        session.next();
        session.show_answer();

        let record = svc.toggle_bookmark(&session).await.unwrap();
        assert!(record.is_marked());
        assert_eq!(session.current().unwrap().id(), QuestionId::new(2));
        assert!(session.is_answer_shown());
    }

    #[tokio::test]
    async fn dispatch_drives_the_session() {
        let svc = service().await;
        let mut session = svc
            .start(StudyMode::Study, FilterCriteria::default(), SequenceOrder::Sequential)
            .await
            .unwrap();

        assert_eq!(svc.dispatch(&mut session, StudyCommand::RevealOrNext).await.unwrap(), None);
        assert!(session.is_answer_shown());
        let saved = svc
            .dispatch(&mut session, StudyCommand::Confidence(c(2)))
            .await
            .unwrap();
        assert!(saved.is_some());
        assert_eq!(session.position().index, 1);
        svc.dispatch(&mut session, StudyCommand::Prev).await.unwrap();
        assert_eq!(session.position().index, 0);

        let marked = svc
            .dispatch(&mut session, StudyCommand::ToggleBookmark)
            .await
            .unwrap()
            .unwrap();
        assert!(marked.is_marked());
        assert_eq!(marked.times_shown(), 1);
        assert_eq!(session.position().index, 0);
        let unmarked = svc
            .dispatch(&mut session, StudyCommand::ToggleBookmark)
            .await
            .unwrap()
            .unwrap();
        assert!(!unmarked.is_marked());
    }

    #[tokio::test]
    async fn empty_filters_refuse_to_start() {
        let svc = service().await;
        let result = svc
            .start(
                StudyMode::Review,
                FilterCriteria::default().with_only_marked(true),
                SequenceOrder::Sequential,
            )
            .await;
        assert!(matches!(result, Err(SessionError::Empty)));
    }

    #[tokio::test]
    async fn criteria_see_fresh_progress() {
        let svc = service().await;
        let mut session = svc
            .start(StudyMode::Review, FilterCriteria::default(), SequenceOrder::Sequential)
            .await
            .unwrap();
        svc.submit_confidence(&mut session, c(5)).await.unwrap();

        svc.apply_criteria(
            &mut session,
            FilterCriteria::default()
                .with_sections(Selection::only(["A"]))
                .with_max_views(Some(0)),
        )
        .await;
        let ids: Vec<u64> = session
            .visible_questions()
            .iter()
            .map(|q| q.id().value())
            .collect();
        assert_eq!(ids, vec![2]);
    }
}
