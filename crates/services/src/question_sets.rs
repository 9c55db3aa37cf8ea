use std::sync::Arc;

use storage::repository::QuestionSetRepository;
use study_core::import::{RawRow, import_rows};
use study_core::model::{
    Question, QuestionId, QuestionSet, QuestionSetError, QuestionSetSummary, SetId, SetOrigin,
};
use tracing::{info, warn};

use crate::Clock;
use crate::error::QuestionSetServiceError;
use crate::progress_store::ProgressStore;

/// Catalog of built-in and uploaded question sets.
#[derive(Clone)]
pub struct QuestionSetService {
    clock: Clock,
    repo: Arc<dyn QuestionSetRepository>,
    progress: ProgressStore,
    built_ins: Vec<QuestionSet>,
}

impl QuestionSetService {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn QuestionSetRepository>, progress: ProgressStore) -> Self {
        Self {
            clock,
            repo,
            progress,
            built_ins: Vec::new(),
        }
    }

    /// Register a bundled set. A later registration with the same id replaces it.
    #[must_use]
    pub fn with_built_in(mut self, set: QuestionSet) -> Self {
        self.built_ins.retain(|s| s.id() != set.id());
        self.built_ins.push(set);
        self
    }

    fn built_in(&self, id: &SetId) -> Option<&QuestionSet> {
        self.built_ins.iter().find(|s| s.id() == id)
    }

    /// Built-in sets in registration order, then uploaded sets newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::Storage` if uploaded sets cannot be listed.
    pub async fn list_sets(&self) -> Result<Vec<QuestionSetSummary>, QuestionSetServiceError> {
        let mut out: Vec<QuestionSetSummary> =
            self.built_ins.iter().map(QuestionSet::summary).collect();
        out.extend(
            self.repo
                .list_sets()
                .await?
                .into_iter()
                .filter(|s| self.built_in(&s.id).is_none()),
        );
        Ok(out)
    }

    /// Like `list_sets`, but falls back to the built-in sets when storage fails.
    pub async fn load_sets(&self) -> Vec<QuestionSetSummary> {
        match self.list_sets().await {
            Ok(sets) => sets,
            Err(err) => {
                warn!(error = %err, "listing question sets failed; showing built-ins only");
                self.built_ins.iter().map(QuestionSet::summary).collect()
            }
        }
    }

    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::NotFound` for unknown ids, or
    /// `QuestionSetServiceError::Storage` if the repository fails.
    pub async fn get_set(&self, id: &SetId) -> Result<QuestionSet, QuestionSetServiceError> {
        if let Some(set) = self.built_in(id) {
            return Ok(set.clone());
        }
        self.repo
            .get_set(id)
            .await?
            .ok_or_else(|| QuestionSetServiceError::NotFound(id.clone()))
    }

    pub async fn load_set(&self, id: &SetId) -> Option<QuestionSet> {
        match self.get_set(id).await {
            Ok(set) => Some(set),
            Err(err) => {
                warn!(set = %id, error = %err, "loading question set failed");
                None
            }
        }
    }

    /// Store an uploaded set, replacing any previous set with the same id.
    ///
    /// The creation time of an existing set is kept.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::Domain` if the id belongs to a built-in
    /// set or the questions fail validation, and `Storage` on write failure.
    pub async fn save_set(
        &self,
        id: SetId,
        name: &str,
        questions: Vec<Question>,
    ) -> Result<QuestionSet, QuestionSetServiceError> {
        if self.built_in(&id).is_some() {
            return Err(QuestionSetError::ReadOnly.into());
        }
        let created_at = match self.repo.get_set(&id).await? {
            Some(existing) => existing.created_at().unwrap_or_else(|| self.clock.now()),
            None => self.clock.now(),
        };
        let set = QuestionSet::uploaded(id, name, questions, created_at)?;
        self.repo.upsert_set(&set).await?;
        Ok(set)
    }

    /// Normalize spreadsheet rows and store them as an uploaded set.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetServiceError::Domain` for unusable rows or invalid
    /// questions, and `Storage` on write failure.
    pub async fn import_set(
        &self,
        id: SetId,
        name: &str,
        rows: &[RawRow],
    ) -> Result<QuestionSet, QuestionSetServiceError> {
        let questions = import_rows(rows)?;
        let set = self.save_set(id, name, questions).await?;
        info!(set = %set.id(), questions = set.len(), "question set imported");
        Ok(set)
    }

    async fn uploaded(&self, id: &SetId) -> Result<QuestionSet, QuestionSetServiceError> {
        let set = self.get_set(id).await?;
        if set.origin() == SetOrigin::BuiltIn {
            return Err(QuestionSetError::ReadOnly.into());
        }
        Ok(set)
    }

    /// Append a question to an uploaded set. A question numbered 0 gets the next free number.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetServiceError` for unknown or built-in sets, taken
    /// numbers, or storage failures.
    pub async fn add_question(
        &self,
        set_id: &SetId,
        question: Question,
    ) -> Result<QuestionId, QuestionSetServiceError> {
        let mut set = self.uploaded(set_id).await?;
        let id = set.add_question(question)?;
        self.repo.upsert_set(&set).await?;
        Ok(id)
    }

    /// Remove a question from an uploaded set. Its progress record is left in place.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetServiceError` for unknown or built-in sets, unknown
    /// questions, or storage failures.
    pub async fn delete_question(
        &self,
        set_id: &SetId,
        question_id: QuestionId,
    ) -> Result<Question, QuestionSetServiceError> {
        let mut set = self.uploaded(set_id).await?;
        let removed = set.remove_question(question_id)?;
        self.repo.upsert_set(&set).await?;
        Ok(removed)
    }

    /// Delete an uploaded set and all of its progress.
    ///
    /// Progress is cleared first, so a failed reset leaves the set in place.
    /// Returns `false` if no such set was stored.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetServiceError` for built-in sets or storage failures.
    pub async fn delete_set(&self, id: &SetId) -> Result<bool, QuestionSetServiceError> {
        if self.built_in(id).is_some() {
            return Err(QuestionSetError::ReadOnly.into());
        }
        let removed_progress = self.progress.try_reset(id).await?;
        let deleted = self.repo.delete_set(id).await?;
        info!(set = %id, deleted, removed_progress, "question set deleted");
        Ok(deleted)
    }
}
