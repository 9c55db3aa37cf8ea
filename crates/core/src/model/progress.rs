use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("confidence must be between 1 and 5, got {0}")]
    InvalidConfidence(u8),

    #[error("confidence count ({count}) does not match times shown ({shown})")]
    CountMismatch { count: u32, shown: u32 },

    #[error("confidence sum {sum} is impossible for {count} submissions")]
    SumOutOfRange { sum: u32, count: u32 },
}

//
// ─── CONFIDENCE ────────────────────────────────────────────────────────────────
//

/// Self-assessed confidence, 1 (no idea) to 5 (knew it cold).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    pub const MIN: Confidence = Confidence(1);
    pub const MAX: Confidence = Confidence(5);

    /// # Errors
    ///
    /// Returns `ProgressError::InvalidConfidence` outside `1..=5`.
    pub fn new(value: u8) -> Result<Self, ProgressError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ProgressError::InvalidConfidence(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// All levels in ascending order.
    pub fn all() -> impl Iterator<Item = Confidence> {
        (1..=5).map(Confidence)
    }

    /// 4 or 5.
    #[must_use]
    pub fn is_high(self) -> bool {
        self.0 >= 4
    }

    /// 1 or 2.
    #[must_use]
    pub fn is_low(self) -> bool {
        self.0 <= 2
    }
}

impl TryFrom<u8> for Confidence {
    type Error = ProgressError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for u8 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl fmt::Debug for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Confidence({})", self.0)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── UPDATE ────────────────────────────────────────────────────────────────────
//

/// A change requested for a single progress record.
///
/// Both fields empty is allowed and only refreshes the last-seen timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked: Option<bool>,
}

impl ProgressUpdate {
    #[must_use]
    pub fn confidence(level: Confidence) -> Self {
        Self {
            confidence: Some(level),
            marked: None,
        }
    }

    #[must_use]
    pub fn marked(marked: bool) -> Self {
        Self {
            confidence: None,
            marked: Some(marked),
        }
    }

    /// Timestamp-only update.
    #[must_use]
    pub fn touch() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.confidence.is_none() && self.marked.is_none()
    }
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Accumulated study progress for one question of one set.
///
/// `confidence_count` always equals `times_shown`, and the average is derived
/// from the running sum, so the record can never drift from its history.
/// Deserialization goes through `from_persisted`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "PersistedProgress")]
pub struct ProgressRecord {
    #[serde(rename = "veces_mostrada")]
    times_shown: u32,
    #[serde(rename = "ultima_confianza")]
    last_confidence: Option<Confidence>,
    #[serde(rename = "confianza_sum")]
    confidence_sum: u32,
    #[serde(rename = "confianza_count")]
    confidence_count: u32,
    #[serde(rename = "confianza_promedio")]
    confidence_avg: Option<f64>,
    #[serde(rename = "ultima_fecha_vista")]
    last_seen_at: Option<DateTime<Utc>>,
    #[serde(rename = "marcada_para_repaso")]
    marked_for_review: bool,
}

/// Incoming shape of a record. A stored `confianza_promedio` is ignored.
#[derive(Deserialize)]
struct PersistedProgress {
    #[serde(rename = "veces_mostrada", default)]
    times_shown: u32,
    #[serde(rename = "ultima_confianza", default)]
    last_confidence: Option<Confidence>,
    #[serde(rename = "confianza_sum", default)]
    confidence_sum: u32,
    #[serde(rename = "confianza_count", default)]
    confidence_count: u32,
    #[serde(rename = "ultima_fecha_vista", default)]
    last_seen_at: Option<DateTime<Utc>>,
    #[serde(rename = "marcada_para_repaso", default)]
    marked_for_review: bool,
}

impl TryFrom<PersistedProgress> for ProgressRecord {
    type Error = ProgressError;

    fn try_from(p: PersistedProgress) -> Result<Self, Self::Error> {
        Self::from_persisted(
            p.times_shown,
            p.last_confidence,
            p.confidence_sum,
            p.confidence_count,
            p.last_seen_at,
            p.marked_for_review,
        )
    }
}

/// Progress of a whole set, keyed by question number.
pub type ProgressMap = HashMap<QuestionId, ProgressRecord>;

impl ProgressRecord {
    /// Rehydrate a record from storage, re-deriving the average.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CountMismatch` if the count and times shown
    /// disagree, or `ProgressError::SumOutOfRange` if the sum cannot come from
    /// `count` submissions in `1..=5`.
    pub fn from_persisted(
        times_shown: u32,
        last_confidence: Option<Confidence>,
        confidence_sum: u32,
        confidence_count: u32,
        last_seen_at: Option<DateTime<Utc>>,
        marked_for_review: bool,
    ) -> Result<Self, ProgressError> {
        if confidence_count != times_shown {
            return Err(ProgressError::CountMismatch {
                count: confidence_count,
                shown: times_shown,
            });
        }
        let max_sum = confidence_count.saturating_mul(5);
        if confidence_sum < confidence_count || confidence_sum > max_sum {
            return Err(ProgressError::SumOutOfRange {
                sum: confidence_sum,
                count: confidence_count,
            });
        }

        Ok(Self {
            times_shown,
            last_confidence,
            confidence_sum,
            confidence_count,
            confidence_avg: average(confidence_sum, confidence_count),
            last_seen_at,
            marked_for_review,
        })
    }

    /// Apply an update and return the resulting record.
    ///
    /// The timestamp is refreshed even when the update carries nothing else.
    #[must_use]
    pub fn apply_update(&self, update: ProgressUpdate, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();

        if let Some(level) = update.confidence {
            next.times_shown = next.times_shown.saturating_add(1);
            next.confidence_count = next.confidence_count.saturating_add(1);
            next.confidence_sum = next.confidence_sum.saturating_add(u32::from(level.value()));
            next.last_confidence = Some(level);
            next.confidence_avg = average(next.confidence_sum, next.confidence_count);
        }

        if let Some(marked) = update.marked {
            next.marked_for_review = marked;
        }

        next.last_seen_at = Some(now);
        next
    }

    #[must_use]
    pub fn times_shown(&self) -> u32 {
        self.times_shown
    }

    #[must_use]
    pub fn last_confidence(&self) -> Option<Confidence> {
        self.last_confidence
    }

    #[must_use]
    pub fn confidence_sum(&self) -> u32 {
        self.confidence_sum
    }

    #[must_use]
    pub fn confidence_count(&self) -> u32 {
        self.confidence_count
    }

    #[must_use]
    pub fn confidence_avg(&self) -> Option<f64> {
        self.confidence_avg
    }

    #[must_use]
    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        self.last_seen_at
    }

    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.marked_for_review
    }

    /// True once at least one confidence has been submitted.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.confidence_count > 0
    }
}

/// Round to two decimals, halves away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average(sum: u32, count: u32) -> Option<f64> {
    (count > 0).then(|| round2(f64::from(sum) / f64::from(count)))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
