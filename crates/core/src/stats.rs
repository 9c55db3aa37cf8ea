//! Dashboard aggregates over a set and its progress.

use serde::Serialize;

use crate::model::{ProgressMap, Question};

/// Label used for questions without a section.
pub const UNSECTIONED: &str = "Sin sección";

/// Whole-set overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressStats {
    pub total: usize,
    pub answered: usize,
    pub pending: usize,
    pub high_confidence: usize,
    pub low_confidence: usize,
    pub marked_for_review: usize,
    /// Mean of the per-question averages of answered questions, one decimal.
    pub avg_confidence: f64,
    pub progress_percent: u32,
}

/// Per-section breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionStats {
    pub name: String,
    pub total: usize,
    pub answered: usize,
    pub avg_confidence: f64,
    pub progress_percent: u32,
}

impl ProgressStats {
    #[must_use]
    pub fn compute(questions: &[Question], progress: &ProgressMap) -> Self {
        let mut answered = 0;
        let mut high_confidence = 0;
        let mut low_confidence = 0;
        let mut marked_for_review = 0;
        let mut avg_sum = 0.0;

        for record in questions.iter().filter_map(|q| progress.get(&q.id())) {
            if record.is_answered() {
                answered += 1;
                avg_sum += record.confidence_avg().unwrap_or(0.0);
            }
            match record.last_confidence() {
                Some(level) if level.is_high() => high_confidence += 1,
                Some(level) if level.is_low() => low_confidence += 1,
                _ => {}
            }
            if record.is_marked() {
                marked_for_review += 1;
            }
        }

        Self {
            total: questions.len(),
            answered,
            pending: questions.len() - answered,
            high_confidence,
            low_confidence,
            marked_for_review,
            avg_confidence: mean_one_decimal(avg_sum, answered),
            progress_percent: percent(answered, questions.len()),
        }
    }
}

impl SectionStats {
    /// Sections in order of first appearance.
    #[must_use]
    pub fn compute(questions: &[Question], progress: &ProgressMap) -> Vec<Self> {
        // (name, total, answered, avg_sum)
        let mut rows: Vec<(String, usize, usize, f64)> = Vec::new();

        for q in questions {
            let name = if q.section().is_empty() {
                UNSECTIONED
            } else {
                q.section()
            };
            let idx = match rows.iter().position(|(n, ..)| n == name) {
                Some(idx) => idx,
                None => {
                    rows.push((name.to_string(), 0, 0, 0.0));
                    rows.len() - 1
                }
            };
            let row = &mut rows[idx];
            row.1 += 1;
            if let Some(record) = progress.get(&q.id()).filter(|r| r.is_answered()) {
                row.2 += 1;
                row.3 += record.confidence_avg().unwrap_or(0.0);
            }
        }

        rows.into_iter()
            .map(|(name, total, answered, avg_sum)| SectionStats {
                name,
                total,
                answered,
                avg_confidence: mean_one_decimal(avg_sum, answered),
                progress_percent: percent(answered, total),
            })
            .collect()
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_one_decimal(sum: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64 * 10.0).round() / 10.0
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Confidence, ProgressRecord, ProgressUpdate, QuestionId};
    use crate::time::fixed_now;

    fn q(id: u64, section: &str) -> Question {
        Question::new(QuestionId::new(id), section, "", format!("Q{id}"))
    }

    fn rated(levels: &[u8]) -> ProgressRecord {
        levels.iter().fold(ProgressRecord::default(), |r, &l| {
            r.apply_update(
                ProgressUpdate::confidence(Confidence::new(l).unwrap()),
                fixed_now(),
            )
        })
    }

    #[test]
    fn overview_counts_answered_high_low_and_marked() {
        let questions = vec![q(1, "A"), q(2, "A"), q(3, "B"), q(4, "")];
        let mut progress = ProgressMap::new();
        progress.insert(QuestionId::new(1), rated(&[5, 4]));
        progress.insert(QuestionId::new(2), rated(&[1]));
        progress.insert(
            QuestionId::new(3),
            ProgressRecord::default().apply_update(ProgressUpdate::marked(true), fixed_now()),
        );

        let stats = ProgressStats::compute(&questions, &progress);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.answered, 2);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.high_confidence, 1);
        assert_eq!(stats.low_confidence, 1);
        assert_eq!(stats.marked_for_review, 1);
        // (4.5 + 1.0) / 2
        assert_eq!(stats.avg_confidence, 2.8);
        assert_eq!(stats.progress_percent, 50);
    }

    #[test]
    fn sections_keep_first_appearance_order() {
        let questions = vec![q(1, "B"), q(2, ""), q(3, "A"), q(4, "B")];
        let mut progress = ProgressMap::new();
        progress.insert(QuestionId::new(4), rated(&[3]));

        let sections = SectionStats::compute(&questions, &progress);
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["B", UNSECTIONED, "A"]);
        assert_eq!(sections[0].total, 2);
        assert_eq!(sections[0].answered, 1);
        assert_eq!(sections[0].avg_confidence, 3.0);
        assert_eq!(sections[0].progress_percent, 50);
        assert_eq!(sections[2].progress_percent, 0);
    }

    #[test]
    fn empty_set_has_zeroed_stats() {
        let stats = ProgressStats::compute(&[], &ProgressMap::new());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.progress_percent, 0);
        assert_eq!(stats.avg_confidence, 0.0);
    }
}
