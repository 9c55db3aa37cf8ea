//! Shared state of the open question set.
//!
//! One `AppStore` is created per opened set and handed to study and exam loops
//! behind an `Arc`. All progress mutations go through it so the in-memory map
//! only ever reflects writes the backend accepted.

use tokio::sync::RwLock;

use storage::repository::StorageError;
use study_core::model::{
    Confidence, ProgressMap, ProgressRecord, ProgressUpdate, Question, QuestionId, QuestionSet,
    SetId,
};
use study_core::stats::{ProgressStats, SectionStats};
use tracing::debug;

use crate::progress_store::ProgressStore;

/// Snapshot of the open set and its progress.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub set: QuestionSet,
    pub progress: ProgressMap,
}

impl AppState {
    #[must_use]
    pub fn set_id(&self) -> &SetId {
        self.set.id()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        self.set.questions()
    }

    #[must_use]
    pub fn record(&self, question_id: QuestionId) -> Option<&ProgressRecord> {
        self.progress.get(&question_id)
    }

    #[must_use]
    pub fn stats(&self) -> ProgressStats {
        ProgressStats::compute(self.questions(), &self.progress)
    }

    #[must_use]
    pub fn section_stats(&self) -> Vec<SectionStats> {
        SectionStats::compute(self.questions(), &self.progress)
    }
}

pub struct AppStore {
    store: ProgressStore,
    state: RwLock<AppState>,
}

impl AppStore {
    /// Open `set`, loading its progress. A failed load starts from empty progress.
    pub async fn open(store: ProgressStore, set: QuestionSet) -> Self {
        let progress = store.load(set.id()).await;
        Self {
            store,
            state: RwLock::new(AppState { set, progress }),
        }
    }

    #[must_use]
    pub fn clock(&self) -> crate::Clock {
        self.store.clock()
    }

    /// Replace the open set and reload progress for it.
    pub async fn switch_set(&self, set: QuestionSet) {
        let progress = self.store.load(set.id()).await;
        debug!(set = %set.id(), records = progress.len(), "switched question set");
        *self.state.write().await = AppState { set, progress };
    }

    /// Reload progress of the open set from the backend.
    pub async fn refresh(&self) {
        let set_id = self.set_id().await;
        let progress = self.store.load(&set_id).await;
        self.state.write().await.progress = progress;
    }

    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }

    pub async fn set_id(&self) -> SetId {
        self.state.read().await.set.id().clone()
    }

    pub async fn progress(&self) -> ProgressMap {
        self.state.read().await.progress.clone()
    }

    pub async fn record(&self, question_id: QuestionId) -> Option<ProgressRecord> {
        self.state.read().await.record(question_id).cloned()
    }

    /// Persist `update` and mirror the stored record in memory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails; the in-memory map is left untouched.
    pub async fn try_apply(
        &self,
        question_id: QuestionId,
        update: ProgressUpdate,
    ) -> Result<ProgressRecord, StorageError> {
        let set_id = self.set_id().await;
        let record = self.store.try_update(&set_id, question_id, update).await?;
        let mut state = self.state.write().await;
        // The set may have been switched while the write was in flight.
        if state.set.id() == &set_id {
            state.progress.insert(question_id, record.clone());
        }
        Ok(record)
    }

    /// Like `try_apply`, but logs failures and returns `None`.
    pub async fn apply(
        &self,
        question_id: QuestionId,
        update: ProgressUpdate,
    ) -> Option<ProgressRecord> {
        let set_id = self.set_id().await;
        let record = self.store.update(&set_id, question_id, update).await?;
        let mut state = self.state.write().await;
        if state.set.id() == &set_id {
            state.progress.insert(question_id, record.clone());
        }
        Some(record)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    pub async fn try_record_confidence(
        &self,
        question_id: QuestionId,
        level: Confidence,
    ) -> Result<ProgressRecord, StorageError> {
        self.try_apply(question_id, ProgressUpdate::confidence(level))
            .await
    }

    /// Flip the bookmark of a question based on its current in-memory state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    pub async fn try_toggle_marked(
        &self,
        question_id: QuestionId,
    ) -> Result<ProgressRecord, StorageError> {
        let marked = self
            .record(question_id)
            .await
            .is_some_and(|r| r.is_marked());
        self.try_apply(question_id, ProgressUpdate::marked(!marked))
            .await
    }

    /// Clear all progress of the open set. Returns `false` if the backend refused.
    pub async fn reset_progress(&self) -> bool {
        let set_id = self.set_id().await;
        if !self.store.reset(&set_id).await {
            return false;
        }
        let mut state = self.state.write().await;
        if state.set.id() == &set_id {
            state.progress.clear();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use storage::repository::{InMemoryRepository, ProgressRepository};
    use study_core::time::fixed_clock;

    struct FailingWrites(InMemoryRepository);

    #[async_trait]
    impl ProgressRepository for FailingWrites {
        async fn load_progress(&self, set_id: &SetId) -> Result<ProgressMap, StorageError> {
            self.0.load_progress(set_id).await
        }

        async fn get_progress(
            &self,
            set_id: &SetId,
            question_id: QuestionId,
        ) -> Result<Option<ProgressRecord>, StorageError> {
            self.0.get_progress(set_id, question_id).await
        }

        async fn upsert_progress(
            &self,
            _set_id: &SetId,
            _question_id: QuestionId,
            _record: &ProgressRecord,
        ) -> Result<(), StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn delete_progress(&self, _set_id: &SetId) -> Result<u64, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    fn set(id: &str) -> QuestionSet {
        QuestionSet::built_in(
            SetId::new(id),
            id,
            vec![
                Question::new(QuestionId::new(1), "A", "", "uno"),
                Question::new(QuestionId::new(2), "B", "", "dos"),
            ],
        )
        .unwrap()
    }

    fn c(v: u8) -> Confidence {
        Confidence::new(v).unwrap()
    }

    #[tokio::test]
    async fn successful_writes_update_memory() {
        let store = ProgressStore::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        let app = AppStore::open(store, set("s")).await;

        app.try_record_confidence(QuestionId::new(1), c(4))
            .await
            .unwrap();
        let toggled = app.try_toggle_marked(QuestionId::new(1)).await.unwrap();
        assert!(toggled.is_marked());
        let untoggled = app.try_toggle_marked(QuestionId::new(1)).await.unwrap();
        assert!(!untoggled.is_marked());

        let snapshot = app.snapshot().await;
        assert_eq!(snapshot.stats().answered, 1);
        assert_eq!(snapshot.record(QuestionId::new(1)), Some(&untoggled));

        assert!(app.reset_progress().await);
        assert!(app.progress().await.is_empty());
    }

    #[tokio::test]
    async fn failed_writes_leave_memory_untouched() {
        let repo = InMemoryRepository::new();
        let seeded = ProgressRecord::default()
            .apply_update(ProgressUpdate::confidence(c(2)), fixed_clock().now());
        repo.upsert_progress(&SetId::new("s"), QuestionId::new(2), &seeded)
            .await
            .unwrap();

        let store = ProgressStore::new(fixed_clock(), Arc::new(FailingWrites(repo)));
        let app = AppStore::open(store, set("s")).await;
        let before = app.progress().await;
        assert_eq!(before.len(), 1);

        assert!(app.try_record_confidence(QuestionId::new(1), c(5)).await.is_err());
        assert!(app.apply(QuestionId::new(2), ProgressUpdate::marked(true)).await.is_none());
        assert!(!app.reset_progress().await);
        assert_eq!(app.progress().await, before);
    }

    #[tokio::test]
    async fn switching_sets_reloads_progress() {
        let repo = InMemoryRepository::new();
        let store = ProgressStore::new(fixed_clock(), Arc::new(repo.clone()));
        let app = AppStore::open(store, set("a")).await;
        app.try_record_confidence(QuestionId::new(1), c(3))
            .await
            .unwrap();

        app.switch_set(set("b")).await;
        assert_eq!(app.set_id().await, SetId::new("b"));
        assert!(app.progress().await.is_empty());

        app.switch_set(set("a")).await;
        assert_eq!(app.progress().await.len(), 1);
    }
}
