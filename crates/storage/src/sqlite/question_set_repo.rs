use study_core::model::{QuestionSet, QuestionSetSummary, SetId};

use super::SqliteRepository;
use super::mapping::{conn, map_set_row, map_summary_row, ser};
use crate::repository::{QuestionSetRepository, StorageError};

#[async_trait::async_trait]
impl QuestionSetRepository for SqliteRepository {
    async fn list_sets(&self) -> Result<Vec<QuestionSetSummary>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, origin, created_at, json_array_length(questions) AS question_count
            FROM question_sets
            ORDER BY created_at DESC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_summary_row).collect()
    }

    async fn get_set(&self, id: &SetId) -> Result<Option<QuestionSet>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, origin, created_at, questions
            FROM question_sets
            WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_set_row).transpose()
    }

    async fn upsert_set(&self, set: &QuestionSet) -> Result<(), StorageError> {
        let questions = serde_json::to_string(set.questions()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO question_sets (id, name, origin, created_at, questions)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                origin = excluded.origin,
                questions = excluded.questions
            ",
        )
        .bind(set.id().as_str())
        .bind(set.name())
        .bind(set.origin().as_str())
        .bind(set.created_at())
        .bind(questions)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn delete_set(&self, id: &SetId) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM question_sets WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }
}
