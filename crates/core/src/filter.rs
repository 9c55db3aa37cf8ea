//! Question selection for review sessions.
//!
//! A question passes when every active criterion accepts it. Criteria never
//! look at each other, so the result does not depend on evaluation order and
//! applying the same criteria twice changes nothing.

use std::collections::BTreeSet;

use crate::model::{Confidence, ProgressMap, ProgressRecord, Question};

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// A set of selected section or topic names.
///
/// An empty selection does not restrict anything; callers that want "nothing
/// selected" to mean "no questions" must guard before filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection(BTreeSet<String>);

impl Selection {
    /// Unrestricted selection.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `value` passes this selection.
    #[must_use]
    pub fn admits(&self, value: &str) -> bool {
        self.0.is_empty() || self.0.contains(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

//
// ─── CRITERIA ──────────────────────────────────────────────────────────────────
//

/// Review filters. `Default` lets every question through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub sections: Selection,
    pub topics: Selection,
    pub min_confidence: Confidence,
    pub max_confidence: Confidence,
    pub include_no_confidence: bool,
    /// Upper bound (inclusive) on the number of confidence submissions.
    pub max_views: Option<u32>,
    pub only_marked: bool,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            sections: Selection::all(),
            topics: Selection::all(),
            min_confidence: Confidence::MIN,
            max_confidence: Confidence::MAX,
            include_no_confidence: true,
            max_views: None,
            only_marked: false,
        }
    }
}

impl FilterCriteria {
    #[must_use]
    pub fn with_sections(mut self, sections: Selection) -> Self {
        self.sections = sections;
        self
    }

    #[must_use]
    pub fn with_topics(mut self, topics: Selection) -> Self {
        self.topics = topics;
        self
    }

    /// Restrict to questions whose last confidence is in `min..=max`.
    ///
    /// `min > max` is not rejected; it simply excludes every rated question.
    #[must_use]
    pub fn with_confidence_range(mut self, min: Confidence, max: Confidence) -> Self {
        self.min_confidence = min;
        self.max_confidence = max;
        self
    }

    #[must_use]
    pub fn with_include_no_confidence(mut self, include: bool) -> Self {
        self.include_no_confidence = include;
        self
    }

    #[must_use]
    pub fn with_max_views(mut self, max_views: Option<u32>) -> Self {
        self.max_views = max_views;
        self
    }

    #[must_use]
    pub fn with_only_marked(mut self, only_marked: bool) -> Self {
        self.only_marked = only_marked;
        self
    }

    /// Whether a single question passes all criteria.
    ///
    /// A missing record is treated as the zero record (never rated, never marked).
    #[must_use]
    pub fn accepts(&self, question: &Question, record: Option<&ProgressRecord>) -> bool {
        if !self.sections.admits(question.section()) {
            return false;
        }
        if !self.topics.admits(question.topic()) {
            return false;
        }

        match record.and_then(ProgressRecord::last_confidence) {
            Some(level) => {
                if level < self.min_confidence || level > self.max_confidence {
                    return false;
                }
            }
            None => {
                if !self.include_no_confidence {
                    return false;
                }
            }
        }

        if let Some(max_views) = self.max_views {
            let views = record.map_or(0, ProgressRecord::confidence_count);
            if views > max_views {
                return false;
            }
        }

        if self.only_marked && !record.is_some_and(ProgressRecord::is_marked) {
            return false;
        }

        true
    }

    /// Filter `questions`, keeping their original order.
    #[must_use]
    pub fn apply(&self, questions: &[Question], progress: &ProgressMap) -> Vec<Question> {
        questions
            .iter()
            .filter(|q| self.accepts(q, progress.get(&q.id())))
            .cloned()
            .collect()
    }
}

/// Topics offered for picking given the selected sections.
///
/// Read-only view for presentation: only topics that occur under a selected
/// section are listed. It does not change what `FilterCriteria` accepts.
#[must_use]
pub fn available_topics(questions: &[Question], sections: &Selection) -> Vec<String> {
    questions
        .iter()
        .filter(|q| sections.admits(q.section()))
        .map(Question::topic)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProgressUpdate, QuestionId};
    use crate::time::fixed_now;

    fn c(v: u8) -> Confidence {
        Confidence::new(v).unwrap()
    }

    fn q(id: u64, section: &str, topic: &str) -> Question {
        Question::new(QuestionId::new(id), section, topic, format!("Q{id}"))
    }

    fn rated(levels: &[u8]) -> ProgressRecord {
        levels.iter().fold(ProgressRecord::default(), |r, &l| {
            r.apply_update(ProgressUpdate::confidence(c(l)), fixed_now())
        })
    }

    fn fixture() -> (Vec<Question>, ProgressMap) {
        let questions = vec![
            q(1, "A", "t1"),
            q(2, "A", "t2"),
            q(3, "A", "t1"),
            q(4, "B", "t3"),
            q(5, "B", "t1"),
        ];
        let mut progress = ProgressMap::new();
        progress.insert(QuestionId::new(1), rated(&[4]));
        progress.insert(QuestionId::new(2), rated(&[2]));
        // 3 never rated
        progress.insert(QuestionId::new(4), rated(&[5, 5, 5]));
        progress.insert(
            QuestionId::new(5),
            rated(&[1]).apply_update(ProgressUpdate::marked(true), fixed_now()),
        );
        (questions, progress)
    }

    fn ids(questions: &[Question]) -> Vec<u64> {
        questions.iter().map(|q| q.id().value()).collect()
    }

    #[test]
    fn default_criteria_keep_everything() {
        let (questions, progress) = fixture();
        let out = FilterCriteria::default().apply(&questions, &progress);
        assert_eq!(ids(&out), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn section_and_confidence_range_combine() {
        let (questions, progress) = fixture();
        let criteria = FilterCriteria::default()
            .with_sections(Selection::only(["A"]))
            .with_confidence_range(c(3), c(5))
            .with_include_no_confidence(false);
        let out = criteria.apply(&questions, &progress);
        assert_eq!(ids(&out), vec![1]);
    }

    #[test]
    fn unrated_questions_follow_include_flag() {
        let (questions, progress) = fixture();
        let criteria = FilterCriteria::default()
            .with_sections(Selection::only(["A"]))
            .with_confidence_range(c(3), c(5));
        assert_eq!(ids(&criteria.apply(&questions, &progress)), vec![1, 3]);
    }

    #[test]
    fn topics_filter_independently_of_sections() {
        let (questions, progress) = fixture();
        let criteria = FilterCriteria::default().with_topics(Selection::only(["t1"]));
        assert_eq!(ids(&criteria.apply(&questions, &progress)), vec![1, 3, 5]);
    }

    #[test]
    fn max_views_counts_missing_records_as_zero() {
        let (questions, progress) = fixture();
        let unseen = FilterCriteria::default().with_max_views(Some(0));
        assert_eq!(ids(&unseen.apply(&questions, &progress)), vec![3]);

        let under_three = FilterCriteria::default().with_max_views(Some(2));
        assert_eq!(ids(&under_three.apply(&questions, &progress)), vec![1, 2, 3, 5]);
    }

    #[test]
    fn only_marked_requires_bookmark() {
        let (questions, progress) = fixture();
        let criteria = FilterCriteria::default().with_only_marked(true);
        assert_eq!(ids(&criteria.apply(&questions, &progress)), vec![5]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let (questions, progress) = fixture();
        let variants = [
            FilterCriteria::default(),
            FilterCriteria::default().with_sections(Selection::only(["B"])),
            FilterCriteria::default()
                .with_confidence_range(c(2), c(4))
                .with_include_no_confidence(false),
            FilterCriteria::default().with_max_views(Some(1)).with_only_marked(true),
        ];
        for criteria in variants {
            let once = criteria.apply(&questions, &progress);
            let twice = criteria.apply(&once, &progress);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn inverted_range_excludes_rated_questions() {
        let (questions, progress) = fixture();
        let criteria = FilterCriteria::default().with_confidence_range(c(5), c(1));
        assert_eq!(ids(&criteria.apply(&questions, &progress)), vec![3]);
    }

    #[test]
    fn empty_selection_admits_everything() {
        let sel = Selection::only(Vec::<String>::new());
        assert!(sel.is_unrestricted());
        assert!(sel.admits("anything"));
        let sel = Selection::only(["A"]);
        assert!(sel.admits("A"));
        assert!(!sel.admits("B"));
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn available_topics_follow_selected_sections() {
        let (questions, _) = fixture();
        assert_eq!(
            available_topics(&questions, &Selection::only(["B"])),
            vec!["t1", "t3"]
        );
        assert_eq!(
            available_topics(&questions, &Selection::all()),
            vec!["t1", "t2", "t3"]
        );
    }
}
