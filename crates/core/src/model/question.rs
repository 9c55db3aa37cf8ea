use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

//
// ─── ANSWER LEVEL ──────────────────────────────────────────────────────────────
//

/// Which of the three answer variants is being displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerLevel {
    #[default]
    SuperShort,
    Short,
    Full,
}

impl AnswerLevel {
    pub const ALL: [AnswerLevel; 3] = [
        AnswerLevel::SuperShort,
        AnswerLevel::Short,
        AnswerLevel::Full,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AnswerLevel::SuperShort => "Super corta",
            AnswerLevel::Short => "Corta",
            AnswerLevel::Full => "Normal",
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single imported question.
///
/// Serialized with the canonical spreadsheet attribute names so stored sets and
/// exports stay readable by the importer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "numero")]
    id: QuestionId,
    #[serde(rename = "seccion", default)]
    section: String,
    #[serde(rename = "tema", default)]
    topic: String,
    #[serde(rename = "pregunta", default)]
    prompt: String,
    #[serde(rename = "respuesta_super_corta", default)]
    answer_super_short: String,
    #[serde(rename = "respuesta_corta", default)]
    answer_short: String,
    #[serde(rename = "respuesta_normal", default)]
    answer_full: String,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        section: impl Into<String>,
        topic: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id,
            section: section.into(),
            topic: topic.into(),
            prompt: prompt.into(),
            answer_super_short: String::new(),
            answer_short: String::new(),
            answer_full: String::new(),
        }
    }

    /// Attach the three answer variants.
    #[must_use]
    pub fn with_answers(
        mut self,
        super_short: impl Into<String>,
        short: impl Into<String>,
        full: impl Into<String>,
    ) -> Self {
        self.answer_super_short = super_short.into();
        self.answer_short = short.into();
        self.answer_full = full.into();
        self
    }

    /// Same question under another number. Used when appending to a set.
    #[must_use]
    pub(crate) fn renumbered(mut self, id: QuestionId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn section(&self) -> &str {
        &self.section
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn answer(&self, level: AnswerLevel) -> &str {
        match level {
            AnswerLevel::SuperShort => &self.answer_super_short,
            AnswerLevel::Short => &self.answer_short,
            AnswerLevel::Full => &self.answer_full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_variants_follow_level() {
        let q = Question::new(QuestionId::new(1), "A", "T", "¿Qué?").with_answers("s", "c", "n");
        assert_eq!(q.answer(AnswerLevel::SuperShort), "s");
        assert_eq!(q.answer(AnswerLevel::Short), "c");
        assert_eq!(q.answer(AnswerLevel::Full), "n");
        assert_eq!(AnswerLevel::default(), AnswerLevel::SuperShort);
    }

    #[test]
    fn deserializes_canonical_names_with_missing_fields() {
        let q: Question = serde_json::from_str(r#"{"numero": 7, "pregunta": "P"}"#).unwrap();
        assert_eq!(q.id(), QuestionId::new(7));
        assert_eq!(q.prompt(), "P");
        assert_eq!(q.section(), "");
        assert_eq!(q.answer(AnswerLevel::Full), "");
    }
}
