use study_core::model::{ProgressMap, ProgressRecord, QuestionId, SetId};

use super::SqliteRepository;
use super::mapping::{conn, map_progress_row, question_id_to_i64};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self, set_id: &SetId) -> Result<ProgressMap, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT question_id, veces_mostrada, ultima_confianza, confianza_sum,
                   confianza_count, ultima_fecha_vista, marcada_para_repaso
            FROM progress
            WHERE set_id = ?1
            ",
        )
        .bind(set_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn get_progress(
        &self,
        set_id: &SetId,
        question_id: QuestionId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT question_id, veces_mostrada, ultima_confianza, confianza_sum,
                   confianza_count, ultima_fecha_vista, marcada_para_repaso
            FROM progress
            WHERE set_id = ?1 AND question_id = ?2
            ",
        )
        .bind(set_id.as_str())
        .bind(question_id_to_i64(question_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref()
            .map(map_progress_row)
            .transpose()
            .map(|found| found.map(|(_, record)| record))
    }

    async fn upsert_progress(
        &self,
        set_id: &SetId,
        question_id: QuestionId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (
                set_id, question_id, veces_mostrada, ultima_confianza, confianza_sum,
                confianza_count, confianza_promedio, ultima_fecha_vista, marcada_para_repaso
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(set_id, question_id) DO UPDATE SET
                veces_mostrada = excluded.veces_mostrada,
                ultima_confianza = excluded.ultima_confianza,
                confianza_sum = excluded.confianza_sum,
                confianza_count = excluded.confianza_count,
                confianza_promedio = excluded.confianza_promedio,
                ultima_fecha_vista = excluded.ultima_fecha_vista,
                marcada_para_repaso = excluded.marcada_para_repaso
            ",
        )
        .bind(set_id.as_str())
        .bind(question_id_to_i64(question_id)?)
        .bind(i64::from(record.times_shown()))
        .bind(record.last_confidence().map(|c| i64::from(c.value())))
        .bind(i64::from(record.confidence_sum()))
        .bind(i64::from(record.confidence_count()))
        .bind(record.confidence_avg())
        .bind(record.last_seen_at())
        .bind(record.is_marked())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn delete_progress(&self, set_id: &SetId) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM progress WHERE set_id = ?1")
            .bind(set_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}
