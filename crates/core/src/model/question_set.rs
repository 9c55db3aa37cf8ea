use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, SetId};
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionSetError {
    #[error("question set id cannot be empty")]
    EmptyId,

    #[error("question set name cannot be empty")]
    EmptyName,

    #[error("question number must be positive")]
    ZeroNumber,

    #[error("duplicate question number {0}")]
    DuplicateNumber(QuestionId),

    #[error("built-in question sets are read-only")]
    ReadOnly,

    #[error("question {0} not found")]
    UnknownQuestion(QuestionId),
}

//
// ─── ORIGIN ────────────────────────────────────────────────────────────────────
//

/// Where a set came from. Built-in sets ship with the app and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOrigin {
    BuiltIn,
    Uploaded,
}

impl SetOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SetOrigin::BuiltIn => "built_in",
            SetOrigin::Uploaded => "uploaded",
        }
    }
}

//
// ─── SET ───────────────────────────────────────────────────────────────────────
//

/// Listing entry for the set picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSetSummary {
    pub id: SetId,
    pub name: String,
    pub origin: SetOrigin,
    pub created_at: Option<DateTime<Utc>>,
    pub question_count: usize,
}

/// A named, ordered collection of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    id: SetId,
    name: String,
    origin: SetOrigin,
    created_at: Option<DateTime<Utc>>,
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Build a bundled, read-only set.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError` if the id or name is blank, or numbers are zero or repeated.
    pub fn built_in(
        id: SetId,
        name: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, QuestionSetError> {
        Self::build(id, name.into(), SetOrigin::BuiltIn, None, questions)
    }

    /// Build a user-uploaded set.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError` if the id or name is blank, or numbers are zero or repeated.
    pub fn uploaded(
        id: SetId,
        name: impl Into<String>,
        questions: Vec<Question>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionSetError> {
        Self::build(id, name.into(), SetOrigin::Uploaded, Some(created_at), questions)
    }

    /// Rehydrate a set from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError` when the stored data fails validation.
    pub fn from_persisted(
        id: SetId,
        name: String,
        origin: SetOrigin,
        created_at: Option<DateTime<Utc>>,
        questions: Vec<Question>,
    ) -> Result<Self, QuestionSetError> {
        Self::build(id, name, origin, created_at, questions)
    }

    fn build(
        id: SetId,
        name: String,
        origin: SetOrigin,
        created_at: Option<DateTime<Utc>>,
        questions: Vec<Question>,
    ) -> Result<Self, QuestionSetError> {
        if id.is_blank() {
            return Err(QuestionSetError::EmptyId);
        }
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(QuestionSetError::EmptyName);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if q.id().value() == 0 {
                return Err(QuestionSetError::ZeroNumber);
            }
            if !seen.insert(q.id()) {
                return Err(QuestionSetError::DuplicateNumber(q.id()));
            }
        }

        Ok(Self {
            id,
            name,
            origin,
            created_at,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> &SetId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn origin(&self) -> SetOrigin {
        self.origin
    }

    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn summary(&self) -> QuestionSetSummary {
        QuestionSetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            origin: self.origin,
            created_at: self.created_at,
            question_count: self.questions.len(),
        }
    }

    /// Distinct non-empty sections, sorted.
    #[must_use]
    pub fn sections(&self) -> Vec<String> {
        distinct_sorted(self.questions.iter().map(Question::section))
    }

    /// Distinct non-empty topics, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        distinct_sorted(self.questions.iter().map(Question::topic))
    }

    /// Next free question number (max + 1).
    #[must_use]
    pub fn next_question_id(&self) -> QuestionId {
        let max = self.questions.iter().map(|q| q.id().value()).max().unwrap_or(0);
        QuestionId::new(max + 1)
    }

    /// Append a question to an uploaded set.
    ///
    /// A question numbered 0 receives the next free number.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError::ReadOnly` for built-in sets and
    /// `QuestionSetError::DuplicateNumber` if the number is taken.
    pub fn add_question(&mut self, question: Question) -> Result<QuestionId, QuestionSetError> {
        if self.origin == SetOrigin::BuiltIn {
            return Err(QuestionSetError::ReadOnly);
        }
        let question = if question.id().value() == 0 {
            let id = self.next_question_id();
            question.renumbered(id)
        } else {
            question
        };
        if self.question(question.id()).is_some() {
            return Err(QuestionSetError::DuplicateNumber(question.id()));
        }
        let id = question.id();
        self.questions.push(question);
        Ok(id)
    }

    /// Remove a question from an uploaded set.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError::ReadOnly` for built-in sets and
    /// `QuestionSetError::UnknownQuestion` if no such question exists.
    pub fn remove_question(&mut self, id: QuestionId) -> Result<Question, QuestionSetError> {
        if self.origin == SetOrigin::BuiltIn {
            return Err(QuestionSetError::ReadOnly);
        }
        let pos = self
            .questions
            .iter()
            .position(|q| q.id() == id)
            .ok_or(QuestionSetError::UnknownQuestion(id))?;
        Ok(self.questions.remove(pos))
    }
}

fn distinct_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
