use std::sync::Arc;

use storage::repository::{ProgressRepository, StorageError};
use study_core::model::{ProgressMap, ProgressRecord, ProgressUpdate, QuestionId, SetId};
use tracing::{debug, warn};

use crate::Clock;

/// Progress records of every set, backed by a repository.
///
/// The plain methods degrade instead of failing: reads fall back to empty
/// state and writes report failure through `None`/`false`, logging the cause.
/// The `try_*` methods return the storage error instead.
#[derive(Clone)]
pub struct ProgressStore {
    clock: Clock,
    repo: Arc<dyn ProgressRepository>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, repo }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the repository cannot be read.
    pub async fn try_load(&self, set_id: &SetId) -> Result<ProgressMap, StorageError> {
        let map = self.repo.load_progress(set_id).await?;
        debug!(set = %set_id, records = map.len(), "progress loaded");
        Ok(map)
    }

    /// All records of a set; empty when none exist or the backend fails.
    pub async fn load(&self, set_id: &SetId) -> ProgressMap {
        match self.try_load(set_id).await {
            Ok(map) => map,
            Err(err) => {
                warn!(set = %set_id, error = %err, "loading progress failed; starting empty");
                ProgressMap::new()
            }
        }
    }

    /// The stored record, or the zero record if the question was never touched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the repository cannot be read.
    pub async fn try_get_or_create(
        &self,
        set_id: &SetId,
        question_id: QuestionId,
    ) -> Result<ProgressRecord, StorageError> {
        Ok(self
            .repo
            .get_progress(set_id, question_id)
            .await?
            .unwrap_or_default())
    }

    pub async fn get_or_create(&self, set_id: &SetId, question_id: QuestionId) -> ProgressRecord {
        match self.try_get_or_create(set_id, question_id).await {
            Ok(record) => record,
            Err(err) => {
                warn!(set = %set_id, question = %question_id, error = %err, "reading progress failed");
                ProgressRecord::default()
            }
        }
    }

    /// Read, apply `update` at the clock's current time, and write back.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read or the write fails; nothing is
    /// written in that case.
    pub async fn try_update(
        &self,
        set_id: &SetId,
        question_id: QuestionId,
        update: ProgressUpdate,
    ) -> Result<ProgressRecord, StorageError> {
        let current = self.try_get_or_create(set_id, question_id).await?;
        let next = current.apply_update(update, self.clock.now());
        self.repo.upsert_progress(set_id, question_id, &next).await?;
        debug!(
            set = %set_id,
            question = %question_id,
            shown = next.times_shown(),
            marked = next.is_marked(),
            "progress updated"
        );
        Ok(next)
    }

    /// Returns the stored record, or `None` if the update could not be persisted.
    pub async fn update(
        &self,
        set_id: &SetId,
        question_id: QuestionId,
        update: ProgressUpdate,
    ) -> Option<ProgressRecord> {
        match self.try_update(set_id, question_id, update).await {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(set = %set_id, question = %question_id, error = %err, "progress update failed");
                None
            }
        }
    }

    /// Delete every record of a set, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    pub async fn try_reset(&self, set_id: &SetId) -> Result<u64, StorageError> {
        let removed = self.repo.delete_progress(set_id).await?;
        debug!(set = %set_id, removed, "progress reset");
        Ok(removed)
    }

    pub async fn reset(&self, set_id: &SetId) -> bool {
        match self.try_reset(set_id).await {
            Ok(_) => true,
            Err(err) => {
                warn!(set = %set_id, error = %err, "progress reset failed");
                false
            }
        }
    }
}
