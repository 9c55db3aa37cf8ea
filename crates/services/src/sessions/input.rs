//! Keyboard bindings for study and exam screens.
//!
//! Keys are translated to commands through static tables; the screens only
//! execute commands and never look at raw keys.

use study_core::model::Confidence;

use super::study::StudyMode;

/// Keys the study screens react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Space,
    Enter,
    Char(char),
}

impl Key {
    /// Parse a DOM-style key name ("ArrowLeft", " ", "Enter", "3").
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ArrowLeft" => Some(Key::ArrowLeft),
            "ArrowRight" => Some(Key::ArrowRight),
            " " | "Space" => Some(Key::Space),
            "Enter" => Some(Key::Enter),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c)),
                    _ => None,
                }
            }
        }
    }

    fn confidence(self) -> Option<Confidence> {
        let Key::Char(c) = self else {
            return None;
        };
        let digit = u8::try_from(c.to_digit(10)?).ok()?;
        Confidence::new(digit).ok()
    }
}

/// Study and review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyCommand {
    /// Show the answer if hidden, otherwise move on.
    RevealOrNext,
    Reveal,
    Prev,
    /// Flip the bookmark of the current question.
    ToggleBookmark,
    Confidence(Confidence),
}

/// Exam screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamCommand {
    Reveal,
    Answer(Confidence),
    Skip,
    TogglePause,
}

const STUDY_BINDINGS: &[(Key, StudyCommand)] = &[
    (Key::ArrowRight, StudyCommand::RevealOrNext),
    (Key::Space, StudyCommand::RevealOrNext),
    (Key::ArrowLeft, StudyCommand::Prev),
    (Key::Enter, StudyCommand::Reveal),
    (Key::Char('b'), StudyCommand::ToggleBookmark),
];

const REVIEW_BINDINGS: &[(Key, StudyCommand)] = &[
    (Key::ArrowRight, StudyCommand::RevealOrNext),
    (Key::Space, StudyCommand::RevealOrNext),
    (Key::ArrowLeft, StudyCommand::Prev),
    (Key::Char('b'), StudyCommand::ToggleBookmark),
];

const EXAM_BINDINGS: &[(Key, ExamCommand)] = &[
    (Key::Space, ExamCommand::Reveal),
    (Key::Enter, ExamCommand::Reveal),
    (Key::Char('s'), ExamCommand::Skip),
    (Key::Char('p'), ExamCommand::TogglePause),
];

fn lookup<C: Copy>(table: &[(Key, C)], key: Key) -> Option<C> {
    table.iter().find(|(k, _)| *k == key).map(|(_, c)| *c)
}

/// Review has no `Enter` binding.
#[must_use]
pub fn study_command(mode: StudyMode, key: Key) -> Option<StudyCommand> {
    if let Some(level) = key.confidence() {
        return Some(StudyCommand::Confidence(level));
    }
    let table = match mode {
        StudyMode::Study => STUDY_BINDINGS,
        StudyMode::Review => REVIEW_BINDINGS,
    };
    lookup(table, key)
}

#[must_use]
pub fn exam_command(key: Key) -> Option<ExamCommand> {
    if let Some(level) = key.confidence() {
        return Some(ExamCommand::Answer(level));
    }
    lookup(EXAM_BINDINGS, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(v: u8) -> Confidence {
        Confidence::new(v).unwrap()
    }

    #[test]
    fn study_keys() {
        let cases = [
            ("ArrowRight", Some(StudyCommand::RevealOrNext)),
            (" ", Some(StudyCommand::RevealOrNext)),
            ("ArrowLeft", Some(StudyCommand::Prev)),
            ("Enter", Some(StudyCommand::Reveal)),
            ("1", Some(StudyCommand::Confidence(c(1)))),
            ("5", Some(StudyCommand::Confidence(c(5)))),
            ("b", Some(StudyCommand::ToggleBookmark)),
            ("0", None),
            ("6", None),
            ("x", None),
        ];
        for (name, expected) in cases {
            let key = Key::from_name(name).unwrap();
            assert_eq!(study_command(StudyMode::Study, key), expected, "key {name:?}");
        }
    }

    #[test]
    fn review_has_no_enter_binding() {
        assert_eq!(study_command(StudyMode::Review, Key::Enter), None);
        assert_eq!(
            study_command(StudyMode::Review, Key::Char('b')),
            Some(StudyCommand::ToggleBookmark)
        );
        assert_eq!(
            study_command(StudyMode::Review, Key::Char('3')),
            Some(StudyCommand::Confidence(c(3)))
        );
    }

    #[test]
    fn exam_keys() {
        assert_eq!(exam_command(Key::Space), Some(ExamCommand::Reveal));
        assert_eq!(exam_command(Key::Enter), Some(ExamCommand::Reveal));
        assert_eq!(exam_command(Key::Char('s')), Some(ExamCommand::Skip));
        assert_eq!(exam_command(Key::Char('p')), Some(ExamCommand::TogglePause));
        assert_eq!(exam_command(Key::Char('4')), Some(ExamCommand::Answer(c(4))));
        assert_eq!(exam_command(Key::ArrowLeft), None);
    }

    #[test]
    fn unknown_key_names() {
        assert_eq!(Key::from_name("Escape"), None);
        assert_eq!(Key::from_name(""), None);
    }
}
