use std::sync::Arc;

use storage::repository::Storage;
use study_core::model::{QuestionSet, SetId};

use crate::Clock;
use crate::app_state::AppStore;
use crate::error::AppServicesError;
use crate::exam::ExamLoopService;
use crate::export::ProgressExport;
use crate::progress_store::ProgressStore;
use crate::question_sets::QuestionSetService;
use crate::sessions::StudyLoopService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    progress: ProgressStore,
    question_sets: Arc<QuestionSetService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        built_ins: Vec<QuestionSet>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, built_ins))
    }

    #[must_use]
    pub fn in_memory(clock: Clock, built_ins: Vec<QuestionSet>) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, built_ins)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, built_ins: Vec<QuestionSet>) -> Self {
        let progress = ProgressStore::new(clock, Arc::clone(&storage.progress));
        let question_sets = built_ins.into_iter().fold(
            QuestionSetService::new(clock, Arc::clone(&storage.question_sets), progress.clone()),
            QuestionSetService::with_built_in,
        );
        Self {
            clock,
            progress,
            question_sets: Arc::new(question_sets),
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    #[must_use]
    pub fn question_sets(&self) -> Arc<QuestionSetService> {
        Arc::clone(&self.question_sets)
    }

    /// Load a set and its progress into a shared `AppStore`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::QuestionSet` if the set cannot be loaded.
    pub async fn open_set(&self, id: &SetId) -> Result<Arc<AppStore>, AppServicesError> {
        let set = self.question_sets.get_set(id).await?;
        Ok(Arc::new(AppStore::open(self.progress.clone(), set).await))
    }

    #[must_use]
    pub fn study_loop(&self, app: &Arc<AppStore>) -> StudyLoopService {
        StudyLoopService::new(Arc::clone(app))
    }

    #[must_use]
    pub fn exam_loop(&self, app: &Arc<AppStore>) -> ExamLoopService {
        ExamLoopService::new(Arc::clone(app))
    }

    /// Progress of a set, ready to be written out.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if progress cannot be read.
    pub async fn export_progress(&self, id: &SetId) -> Result<ProgressExport, AppServicesError> {
        let progress = self.progress.try_load(id).await?;
        Ok(ProgressExport::new(id.clone(), &progress, self.clock.now()))
    }
}
