use rand::SeedableRng;
use rand::rngs::StdRng;

use study_core::filter::FilterCriteria;
use study_core::model::{AnswerLevel, ProgressMap, Question};

use super::plan::{SequenceOrder, build_sequence};
use super::progress::SessionPosition;

/// Which study screen a session backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StudyMode {
    #[default]
    Study,
    Review,
}

/// Whether the current answer is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Browsing,
    AnswerShown,
}

//
// ─── BUILDER ───────────────────────────────────────────────────────────────────
//

pub struct StudySessionBuilder {
    mode: StudyMode,
    questions: Vec<Question>,
    criteria: FilterCriteria,
    order: SequenceOrder,
    rng: Option<StdRng>,
}

impl StudySessionBuilder {
    #[must_use]
    pub fn with_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: SequenceOrder) -> Self {
        self.order = order;
        self
    }

    /// Make shuffles reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    /// Filter against `progress` and lay out the first sequence.
    #[must_use]
    pub fn build(self, progress: &ProgressMap) -> StudySession {
        let rng = self
            .rng
            .unwrap_or_else(|| StdRng::from_rng(&mut rand::rng()));
        let mut session = StudySession {
            mode: self.mode,
            questions: self.questions,
            criteria: self.criteria,
            order: self.order,
            rng,
            visible: Vec::new(),
            sequence: Vec::new(),
            index: 0,
            phase: SessionPhase::Browsing,
            answer_level: AnswerLevel::default(),
        };
        session.rebuild(progress);
        session
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Navigation state of a study or review run.
///
/// The visible question list is computed when the session is built and
/// whenever criteria or order change; rating questions does not reshuffle or
/// refilter, so the learner's position stays stable. Progress persistence is
/// left to `StudyLoopService`.
pub struct StudySession {
    mode: StudyMode,
    questions: Vec<Question>,
    criteria: FilterCriteria,
    order: SequenceOrder,
    rng: StdRng,
    visible: Vec<Question>,
    sequence: Vec<usize>,
    index: usize,
    phase: SessionPhase,
    answer_level: AnswerLevel,
}

impl StudySession {
    #[must_use]
    pub fn builder(mode: StudyMode, questions: Vec<Question>) -> StudySessionBuilder {
        StudySessionBuilder {
            mode,
            questions,
            criteria: FilterCriteria::default(),
            order: SequenceOrder::default(),
            rng: None,
        }
    }

    fn rebuild(&mut self, progress: &ProgressMap) {
        self.visible = self.criteria.apply(&self.questions, progress);
        self.sequence = build_sequence(self.visible.len(), self.order, &mut self.rng);
        self.index = 0;
        self.reset_view();
    }

    fn reset_view(&mut self) {
        self.phase = SessionPhase::Browsing;
        self.answer_level = AnswerLevel::SuperShort;
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    #[must_use]
    pub fn order(&self) -> SequenceOrder {
        self.order
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn answer_level(&self) -> AnswerLevel {
        self.answer_level
    }

    #[must_use]
    pub fn is_answer_shown(&self) -> bool {
        self.phase == SessionPhase::AnswerShown
    }

    /// Questions passing the current criteria, in set order.
    #[must_use]
    pub fn visible_questions(&self) -> &[Question] {
        &self.visible
    }

    /// Number of questions in the whole set.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    #[must_use]
    pub fn position(&self) -> SessionPosition {
        SessionPosition {
            index: self.index,
            total: self.sequence.len(),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&Question> {
        self.sequence
            .get(self.index)
            .and_then(|&i| self.visible.get(i))
    }

    pub fn show_answer(&mut self) {
        if self.current().is_some() {
            self.phase = SessionPhase::AnswerShown;
        }
    }

    pub fn set_answer_level(&mut self, level: AnswerLevel) {
        self.answer_level = level;
    }

    /// Move forward one question. No-op at the last question; returns whether it moved.
    pub fn next(&mut self) -> bool {
        if self.index + 1 >= self.sequence.len() {
            return false;
        }
        self.index += 1;
        self.reset_view();
        true
    }

    /// Advance without rating.
    pub fn skip(&mut self) -> bool {
        self.next()
    }

    /// Move back one question. No-op at the first question.
    pub fn prev(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        self.reset_view();
        true
    }

    /// State change after a confidence was recorded for the current question.
    ///
    /// Advances unless on the last question; the answer is hidden either way.
    pub fn after_confidence(&mut self) {
        if !self.next() {
            self.reset_view();
        }
    }

    /// Reveal the answer if hidden, otherwise advance.
    pub fn reveal_or_next(&mut self) {
        if self.is_answer_shown() {
            self.next();
        } else {
            self.show_answer();
        }
    }

    /// Replace the filters; the sequence restarts from the first question.
    pub fn set_criteria(&mut self, criteria: FilterCriteria, progress: &ProgressMap) {
        self.criteria = criteria;
        self.rebuild(progress);
    }

    /// Change the order; a new permutation is drawn even if the order is unchanged.
    pub fn set_order(&mut self, order: SequenceOrder, progress: &ProgressMap) {
        self.order = order;
        self.rebuild(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::filter::Selection;
    use study_core::model::{Confidence, ProgressRecord, ProgressUpdate, QuestionId};
    use study_core::time::fixed_now;

    fn questions() -> Vec<Question> {
        vec![
            Question::new(QuestionId::new(1), "A", "t1", "uno"),
            Question::new(QuestionId::new(2), "A", "t2", "dos"),
            Question::new(QuestionId::new(3), "B", "t1", "tres"),
        ]
    }

    fn session() -> StudySession {
        StudySession::builder(StudyMode::Study, questions()).build(&ProgressMap::new())
    }

    fn current_id(session: &StudySession) -> u64 {
        session.current().unwrap().id().value()
    }

    #[test]
    fn navigation_is_clamped() {
        let mut s = session();
        assert!(!s.prev());
        assert_eq!(current_id(&s), 1);
        assert!(s.next());
        assert!(s.next());
        assert!(!s.next());
        assert_eq!(current_id(&s), 3);
        assert_eq!(s.position().index, 2);
    }

    #[test]
    fn navigation_hides_answer_and_resets_level() {
        let mut s = session();
        s.show_answer();
        s.set_answer_level(AnswerLevel::Full);
        assert_eq!(s.phase(), SessionPhase::AnswerShown);
        s.next();
        assert_eq!(s.phase(), SessionPhase::Browsing);
        assert_eq!(s.answer_level(), AnswerLevel::SuperShort);

        s.show_answer();
        s.prev();
        assert!(!s.is_answer_shown());
    }

    #[test]
    fn confidence_at_the_end_stays_on_last() {
        let mut s = session();
        s.next();
        s.next();
        s.show_answer();
        s.after_confidence();
        assert_eq!(current_id(&s), 3);
        assert_eq!(s.phase(), SessionPhase::Browsing);
    }

    #[test]
    fn reveal_or_next_alternates() {
        let mut s = session();
        s.reveal_or_next();
        assert!(s.is_answer_shown());
        s.reveal_or_next();
        assert_eq!(current_id(&s), 2);
        assert!(!s.is_answer_shown());
    }

    #[test]
    fn criteria_change_restarts_sequence() {
        let mut s = session();
        s.next();
        s.show_answer();
        s.set_criteria(
            FilterCriteria::default().with_sections(Selection::only(["A"])),
            &ProgressMap::new(),
        );
        assert_eq!(s.position(), SessionPosition { index: 0, total: 2 });
        assert_eq!(s.phase(), SessionPhase::Browsing);
        assert_eq!(s.total_questions(), 3);
    }

    #[test]
    fn filters_use_progress_at_build_time() {
        let mut progress = ProgressMap::new();
        progress.insert(
            QuestionId::new(2),
            ProgressRecord::default().apply_update(ProgressUpdate::marked(true), fixed_now()),
        );
        let s = StudySession::builder(StudyMode::Review, questions())
            .with_criteria(FilterCriteria::default().with_only_marked(true))
            .build(&progress);
        assert_eq!(s.visible_questions().len(), 1);
        assert_eq!(current_id(&s), 2);
        assert_eq!(s.mode(), StudyMode::Review);
    }

    #[test]
    fn shuffled_order_visits_every_question_once() {
        let mut progress = ProgressMap::new();
        progress.insert(
            QuestionId::new(1),
            ProgressRecord::default().apply_update(
                ProgressUpdate::confidence(Confidence::new(3).unwrap()),
                fixed_now(),
            ),
        );
        let mut s = StudySession::builder(StudyMode::Study, questions())
            .with_order(SequenceOrder::Shuffled)
            .with_seed(11)
            .build(&progress);

        let mut seen = vec![current_id(&s)];
        while s.next() {
            seen.push(current_id(&s));
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);

        s.set_order(SequenceOrder::Sequential, &progress);
        assert_eq!(current_id(&s), 1);
    }

    #[test]
    fn empty_selection_has_no_current_question() {
        let mut s = StudySession::builder(StudyMode::Study, questions())
            .with_criteria(FilterCriteria::default().with_only_marked(true))
            .build(&ProgressMap::new());
        assert!(s.is_empty());
        assert!(s.current().is_none());
        s.show_answer();
        assert_eq!(s.phase(), SessionPhase::Browsing);
        assert!(!s.next());
        assert!(!s.prev());
    }
}
