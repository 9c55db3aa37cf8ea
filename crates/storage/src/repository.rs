use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use study_core::model::{
    ProgressMap, ProgressRecord, QuestionId, QuestionSet, QuestionSetSummary, SetId,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Per-question progress, keyed by `(set, question)`.
///
/// Writes are whole-record upserts: the last writer wins.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// All records for a set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load_progress(&self, set_id: &SetId) -> Result<ProgressMap, StorageError>;

    /// A single record, `None` if the question was never touched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_progress(
        &self,
        set_id: &SetId,
        question_id: QuestionId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// Insert or replace a record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(
        &self,
        set_id: &SetId,
        question_id: QuestionId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError>;

    /// Delete every record of a set, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn delete_progress(&self, set_id: &SetId) -> Result<u64, StorageError>;
}

/// Uploaded question sets.
#[async_trait]
pub trait QuestionSetRepository: Send + Sync {
    /// Stored sets, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_sets(&self) -> Result<Vec<QuestionSetSummary>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read or the stored set is corrupt.
    async fn get_set(&self, id: &SetId) -> Result<Option<QuestionSet>, StorageError>;

    /// Insert or replace a set by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the set cannot be stored.
    async fn upsert_set(&self, set: &QuestionSet) -> Result<(), StorageError>;

    /// Returns `true` if a set was deleted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn delete_set(&self, id: &SetId) -> Result<bool, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<(SetId, QuestionId), ProgressRecord>>>,
    sets: Arc<Mutex<HashMap<SetId, QuestionSet>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: ToString>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self, set_id: &SetId) -> Result<ProgressMap, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|((set, _), _)| set == set_id)
            .map(|((_, qid), record)| (*qid, record.clone()))
            .collect())
    }

    async fn get_progress(
        &self,
        set_id: &SetId,
        question_id: QuestionId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&(set_id.clone(), question_id)).cloned())
    }

    async fn upsert_progress(
        &self,
        set_id: &SetId,
        question_id: QuestionId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert((set_id.clone(), question_id), record.clone());
        Ok(())
    }

    async fn delete_progress(&self, set_id: &SetId) -> Result<u64, StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|(set, _), _| set != set_id);
        Ok(u64::try_from(before - guard.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl QuestionSetRepository for InMemoryRepository {
    async fn list_sets(&self) -> Result<Vec<QuestionSetSummary>, StorageError> {
        let guard = self.sets.lock().map_err(poisoned)?;
        let mut out: Vec<QuestionSetSummary> = guard.values().map(QuestionSet::summary).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn get_set(&self, id: &SetId) -> Result<Option<QuestionSet>, StorageError> {
        let guard = self.sets.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    async fn upsert_set(&self, set: &QuestionSet) -> Result<(), StorageError> {
        let mut guard = self.sets.lock().map_err(poisoned)?;
        guard.insert(set.id().clone(), set.clone());
        Ok(())
    }

    async fn delete_set(&self, id: &SetId) -> Result<bool, StorageError> {
        let mut guard = self.sets.lock().map_err(poisoned)?;
        Ok(guard.remove(id).is_some())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub question_sets: Arc<dyn QuestionSetRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let question_sets: Arc<dyn QuestionSetRepository> = Arc::new(repo);
        Self {
            progress,
            question_sets,
        }
    }
}
