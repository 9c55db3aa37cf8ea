use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::progress::Confidence;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamConfigError {
    #[error("an exam needs at least one question")]
    ZeroQuestionCount,

    #[error("a timed exam needs a positive time limit")]
    ZeroTimeLimit,
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Exam setup chosen before starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfig {
    question_count: usize,
    time_per_question_secs: u32,
    use_timer: bool,
    total_time_minutes: u32,
    random_order: bool,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            question_count: 20,
            time_per_question_secs: 90,
            use_timer: true,
            total_time_minutes: 30,
            random_order: true,
        }
    }
}

impl ExamConfig {
    #[must_use]
    pub fn with_question_count(mut self, count: usize) -> Self {
        self.question_count = count;
        self
    }

    #[must_use]
    pub fn with_time_per_question_secs(mut self, secs: u32) -> Self {
        self.time_per_question_secs = secs;
        self
    }

    #[must_use]
    pub fn with_timer(mut self, use_timer: bool) -> Self {
        self.use_timer = use_timer;
        self
    }

    #[must_use]
    pub fn with_total_time_minutes(mut self, minutes: u32) -> Self {
        self.total_time_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_random_order(mut self, random_order: bool) -> Self {
        self.random_order = random_order;
        self
    }

    /// Replace the total limit with the one suggested by the per-question time.
    #[must_use]
    pub fn with_suggested_total(mut self) -> Self {
        self.total_time_minutes = self.suggested_total_minutes();
        self
    }

    /// # Errors
    ///
    /// Returns `ExamConfigError` for a zero question count, or a zero time
    /// limit when the timer is on.
    pub fn validate(&self) -> Result<(), ExamConfigError> {
        if self.question_count == 0 {
            return Err(ExamConfigError::ZeroQuestionCount);
        }
        if self.use_timer && self.total_time_minutes == 0 {
            return Err(ExamConfigError::ZeroTimeLimit);
        }
        Ok(())
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.question_count
    }

    #[must_use]
    pub fn time_per_question_secs(&self) -> u32 {
        self.time_per_question_secs
    }

    #[must_use]
    pub fn use_timer(&self) -> bool {
        self.use_timer
    }

    #[must_use]
    pub fn total_time_minutes(&self) -> u32 {
        self.total_time_minutes
    }

    #[must_use]
    pub fn random_order(&self) -> bool {
        self.random_order
    }

    /// Number of questions actually drawn from `available`.
    #[must_use]
    pub fn effective_count(&self, available: usize) -> usize {
        self.question_count.min(available)
    }

    /// Countdown start in seconds.
    #[must_use]
    pub fn total_seconds(&self) -> u32 {
        self.total_time_minutes.saturating_mul(60)
    }

    /// Whole minutes covering `time_per_question_secs` for every question.
    #[must_use]
    pub fn suggested_total_minutes(&self) -> u32 {
        let count = u64::try_from(self.question_count).unwrap_or(u64::MAX);
        let secs = count.saturating_mul(u64::from(self.time_per_question_secs));
        u32::try_from(secs.div_ceil(60)).unwrap_or(u32::MAX)
    }
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// Final score sheet of an exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSummary {
    total: usize,
    answered: usize,
    skipped: usize,
    score: u32,
    high_confidence: usize,
    low_confidence: usize,
    avg_confidence: f64,
}

impl ExamSummary {
    /// Score a finished exam from the confidences given to answered questions.
    ///
    /// `total` is the number of questions drawn for the exam; anything not in
    /// `answers` counts as skipped. The score is the share of the maximum
    /// possible confidence, as a whole percentage.
    #[must_use]
    pub fn from_answers(total: usize, answers: &[Confidence]) -> Self {
        let answered = answers.len();
        let sum: u32 = answers.iter().map(|c| u32::from(c.value())).sum();
        let high_confidence = answers.iter().filter(|c| c.is_high()).count();
        let low_confidence = answers.iter().filter(|c| c.is_low()).count();

        let (score, avg_confidence) = if answered == 0 {
            (0, 0.0)
        } else {
            // Exams are bounded by set size, far below f64's exact integer range.
            #[allow(clippy::cast_precision_loss)]
            let answered_f = answered as f64;
            let sum_f = f64::from(sum);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let score = (sum_f / (answered_f * 5.0) * 100.0).round() as u32;
            let avg = (sum_f / answered_f * 10.0).round() / 10.0;
            (score, avg)
        };

        Self {
            total,
            answered,
            skipped: total.saturating_sub(answered),
            score,
            high_confidence,
            low_confidence,
            avg_confidence,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.answered
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// 0..=100
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn high_confidence(&self) -> usize {
        self.high_confidence
    }

    #[must_use]
    pub fn low_confidence(&self) -> usize {
        self.low_confidence
    }

    #[must_use]
    pub fn avg_confidence(&self) -> f64 {
        self.avg_confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(values: &[u8]) -> Vec<Confidence> {
        values.iter().map(|&v| Confidence::new(v).unwrap()).collect()
    }

    #[test]
    fn descending_answers_score_sixty() {
        let summary = ExamSummary::from_answers(5, &levels(&[5, 4, 3, 2, 1]));
        assert_eq!(summary.answered(), 5);
        assert_eq!(summary.skipped(), 0);
        assert_eq!(summary.score(), 60);
        assert_eq!(summary.high_confidence(), 2);
        assert_eq!(summary.low_confidence(), 2);
        assert_eq!(summary.avg_confidence(), 3.0);
    }

    #[test]
    fn skipped_questions_do_not_lower_the_score() {
        let summary = ExamSummary::from_answers(4, &levels(&[5, 4]));
        assert_eq!(summary.skipped(), 2);
        assert_eq!(summary.score(), 90);
        assert_eq!(summary.avg_confidence(), 4.5);
    }

    #[test]
    fn nothing_answered_scores_zero() {
        let summary = ExamSummary::from_answers(3, &[]);
        assert_eq!(summary.score(), 0);
        assert_eq!(summary.skipped(), 3);
        assert_eq!(summary.avg_confidence(), 0.0);
    }

    #[test]
    fn default_config_is_valid_and_suggests_thirty_minutes() {
        let config = ExamConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.question_count(), 20);
        assert_eq!(config.total_seconds(), 1800);
        assert_eq!(config.suggested_total_minutes(), 30);
    }

    #[test]
    fn suggested_minutes_round_up() {
        let config = ExamConfig::default()
            .with_question_count(3)
            .with_time_per_question_secs(50)
            .with_suggested_total();
        assert_eq!(config.total_time_minutes(), 3);
        assert_eq!(config.effective_count(2), 2);
        assert_eq!(config.effective_count(10), 3);
    }

    #[test]
    fn config_validation() {
        assert_eq!(
            ExamConfig::default().with_question_count(0).validate(),
            Err(ExamConfigError::ZeroQuestionCount)
        );
        assert_eq!(
            ExamConfig::default().with_total_time_minutes(0).validate(),
            Err(ExamConfigError::ZeroTimeLimit)
        );
        assert_eq!(
            ExamConfig::default()
                .with_total_time_minutes(0)
                .with_timer(false)
                .validate(),
            Ok(())
        );
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        // 11 / 3 = 3.666..
        let summary = ExamSummary::from_answers(3, &levels(&[4, 4, 3]));
        assert_eq!(summary.avg_confidence(), 3.7);
        assert_eq!(summary.score(), 73);
    }
}
