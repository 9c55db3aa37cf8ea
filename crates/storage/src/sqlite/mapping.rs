use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use study_core::model::{
    Confidence, ProgressRecord, Question, QuestionId, QuestionSet, QuestionSetSummary, SetId,
    SetOrigin,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    u64::try_from(v)
        .map(QuestionId::new)
        .map_err(|_| StorageError::Serialization("question_id sign overflow".into()))
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("question_id overflow".into()))
}

pub(crate) fn parse_origin(s: &str) -> Result<SetOrigin, StorageError> {
    match s {
        "built_in" => Ok(SetOrigin::BuiltIn),
        "uploaded" => Ok(SetOrigin::Uploaded),
        _ => Err(StorageError::Serialization(format!("invalid origin: {s}"))),
    }
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<(QuestionId, ProgressRecord), StorageError> {
    let question_id = question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?;

    let last_confidence = row
        .try_get::<Option<i64>, _>("ultima_confianza")
        .map_err(ser)?
        .map(|v| {
            let level = u8::try_from(v)
                .map_err(|_| StorageError::Serialization(format!("invalid confidence: {v}")))?;
            Confidence::new(level).map_err(ser)
        })
        .transpose()?;

    let record = ProgressRecord::from_persisted(
        i64_to_u32("veces_mostrada", row.try_get("veces_mostrada").map_err(ser)?)?,
        last_confidence,
        i64_to_u32("confianza_sum", row.try_get("confianza_sum").map_err(ser)?)?,
        i64_to_u32("confianza_count", row.try_get("confianza_count").map_err(ser)?)?,
        row.try_get::<Option<DateTime<Utc>>, _>("ultima_fecha_vista")
            .map_err(ser)?,
        row.try_get::<bool, _>("marcada_para_repaso").map_err(ser)?,
    )
    .map_err(ser)?;

    Ok((question_id, record))
}

pub(crate) fn map_set_row(row: &SqliteRow) -> Result<QuestionSet, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let name: String = row.try_get("name").map_err(ser)?;
    let origin_str: String = row.try_get("origin").map_err(ser)?;
    let created_at: Option<DateTime<Utc>> = row.try_get("created_at").map_err(ser)?;
    let questions_json: String = row.try_get("questions").map_err(ser)?;
    let questions: Vec<Question> = serde_json::from_str(&questions_json).map_err(ser)?;

    QuestionSet::from_persisted(
        SetId::new(id),
        name,
        parse_origin(&origin_str)?,
        created_at,
        questions,
    )
    .map_err(ser)
}

pub(crate) fn map_summary_row(row: &SqliteRow) -> Result<QuestionSetSummary, StorageError> {
    let origin_str: String = row.try_get("origin").map_err(ser)?;
    let count: i64 = row.try_get("question_count").map_err(ser)?;
    Ok(QuestionSetSummary {
        id: SetId::new(row.try_get::<String, _>("id").map_err(ser)?),
        name: row.try_get("name").map_err(ser)?,
        origin: parse_origin(&origin_str)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        question_count: usize::try_from(count)
            .map_err(|_| StorageError::Serialization(format!("invalid question_count: {count}")))?,
    })
}
