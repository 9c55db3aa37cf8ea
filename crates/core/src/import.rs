//! Spreadsheet row normalization.
//!
//! Spreadsheets arrive with whatever headers their authors typed ("N°",
//! "Sección", "Respuesta super corta", ...). Rows are given here as
//! `(header, cell)` pairs with cells already rendered to text; headers are
//! folded to a canonical field and unknown columns are dropped.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::model::{Question, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImportError {
    #[error("the sheet has no rows")]
    NoRows,

    #[error("no recognizable columns in header: {0:?}")]
    NoKnownColumns(Vec<String>),
}

/// Canonical question attribute a column maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Number,
    Section,
    Topic,
    Prompt,
    AnswerSuperShort,
    AnswerShort,
    AnswerFull,
}

impl Field {
    /// Canonical attribute name.
    #[must_use]
    pub fn canonical_name(self) -> &'static str {
        match self {
            Field::Number => "numero",
            Field::Section => "seccion",
            Field::Topic => "tema",
            Field::Prompt => "pregunta",
            Field::AnswerSuperShort => "respuesta_super_corta",
            Field::AnswerShort => "respuesta_corta",
            Field::AnswerFull => "respuesta_normal",
        }
    }
}

/// One spreadsheet row as `(header, cell text)` pairs.
pub type RawRow = Vec<(String, String)>;

/// Fold a header to lowercase ASCII letters and digits, dropping accents.
#[must_use]
pub fn fold_header(header: &str) -> String {
    header
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Map a raw header to its canonical field, if it names one.
#[must_use]
pub fn normalize_header(header: &str) -> Option<Field> {
    match fold_header(header).as_str() {
        "n" | "numero" | "nro" | "num" => Some(Field::Number),
        "seccion" => Some(Field::Section),
        "tema" => Some(Field::Topic),
        "pregunta" => Some(Field::Prompt),
        "respuestasupercorta" => Some(Field::AnswerSuperShort),
        "respuestacorta" => Some(Field::AnswerShort),
        "respuestanormal" => Some(Field::AnswerFull),
        _ => None,
    }
}

/// Turn raw rows into questions.
///
/// A row without a usable positive `numero` gets its 1-based position.
/// Duplicate numbers are left for `QuestionSet` validation to report.
///
/// # Errors
///
/// Returns `ImportError::NoRows` for an empty sheet and
/// `ImportError::NoKnownColumns` when no header maps to a known field.
pub fn import_rows(rows: &[RawRow]) -> Result<Vec<Question>, ImportError> {
    if rows.is_empty() {
        return Err(ImportError::NoRows);
    }

    let recognized = rows
        .iter()
        .flatten()
        .any(|(header, _)| normalize_header(header).is_some());
    if !recognized {
        let mut headers: Vec<String> = rows[0].iter().map(|(h, _)| h.clone()).collect();
        headers.dedup();
        return Err(ImportError::NoKnownColumns(headers));
    }

    Ok(rows
        .iter()
        .enumerate()
        .map(|(index, row)| import_row(index, row))
        .collect())
}

fn import_row(index: usize, row: &RawRow) -> Question {
    let mut number = None;
    let mut section = String::new();
    let mut topic = String::new();
    let mut prompt = String::new();
    let mut super_short = String::new();
    let mut short = String::new();
    let mut full = String::new();

    for (header, cell) in row {
        let Some(field) = normalize_header(header) else {
            continue;
        };
        let value = cell.trim().to_string();
        match field {
            Field::Number => number = parse_number(&value),
            Field::Section => section = value,
            Field::Topic => topic = value,
            Field::Prompt => prompt = value,
            Field::AnswerSuperShort => super_short = value,
            Field::AnswerShort => short = value,
            Field::AnswerFull => full = value,
        }
    }

    let position = u64::try_from(index).map_or(u64::MAX, |i| i.saturating_add(1));
    let id = QuestionId::new(number.unwrap_or(position));
    Question::new(id, section, topic, prompt).with_answers(super_short, short, full)
}

/// Spreadsheet numbers often arrive as "12" or "12.0".
fn parse_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let parsed = raw.parse::<u64>().ok().or_else(|| {
        let float = raw.parse::<f64>().ok()?;
        if float.is_finite() && float >= 1.0 && float.fract() == 0.0 && float < 9.0e15 {
            // Checked above: integral and within range.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(float as u64)
        } else {
            None
        }
    })?;
    (parsed > 0).then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerLevel;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(h, v)| ((*h).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn headers_fold_case_accents_and_punctuation() {
        assert_eq!(normalize_header("N°"), Some(Field::Number));
        assert_eq!(normalize_header("  Nro. "), Some(Field::Number));
        assert_eq!(normalize_header("Sección"), Some(Field::Section));
        assert_eq!(normalize_header("TEMA"), Some(Field::Topic));
        assert_eq!(normalize_header("Respuesta super corta"), Some(Field::AnswerSuperShort));
        assert_eq!(normalize_header("respuesta_corta"), Some(Field::AnswerShort));
        assert_eq!(normalize_header("Respuesta Normal"), Some(Field::AnswerFull));
        assert_eq!(normalize_header("Observaciones"), None);
        assert_eq!(Field::AnswerFull.canonical_name(), "respuesta_normal");
    }

    #[test]
    fn imports_rows_and_assigns_missing_numbers() {
        let rows = vec![
            row(&[("N°", "10"), ("Sección", "A"), ("Pregunta", "¿Uno?"), ("Respuesta corta", "1")]),
            row(&[("N°", ""), ("Sección", "B"), ("Pregunta", "¿Dos?")]),
            row(&[("Sección", "B"), ("Pregunta", "¿Tres?"), ("Extra", "x")]),
            row(&[("N°", "4.0"), ("Pregunta", "¿Cuatro?")]),
        ];
        let questions = import_rows(&rows).unwrap();
        let ids: Vec<u64> = questions.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![10, 2, 3, 4]);
        assert_eq!(questions[0].section(), "A");
        assert_eq!(questions[0].answer(AnswerLevel::Short), "1");
        assert_eq!(questions[2].prompt(), "¿Tres?");
    }

    #[test]
    fn zero_and_garbage_numbers_fall_back_to_position() {
        let rows = vec![
            row(&[("numero", "0"), ("pregunta", "a")]),
            row(&[("numero", "abc"), ("pregunta", "b")]),
            row(&[("numero", "-2"), ("pregunta", "c")]),
        ];
        let ids: Vec<u64> = import_rows(&rows)
            .unwrap()
            .iter()
            .map(|q| q.id().value())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_empty_and_unrecognized_sheets() {
        assert_eq!(import_rows(&[]), Err(ImportError::NoRows));
        let err = import_rows(&[row(&[("Foo", "1"), ("Bar", "2")])]).unwrap_err();
        assert_eq!(
            err,
            ImportError::NoKnownColumns(vec!["Foo".to_string(), "Bar".to_string()])
        );
    }
}
