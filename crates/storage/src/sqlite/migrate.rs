use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies pending schema versions.
///
/// Version 1 creates uploaded question sets and per-question progress.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        // Questions are stored as a JSON array; sets are always read whole.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS question_sets (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    origin TEXT NOT NULL,
                    created_at TEXT,
                    questions TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // No foreign key: built-in sets have progress but no row here.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress (
                    set_id TEXT NOT NULL,
                    question_id INTEGER NOT NULL CHECK (question_id > 0),
                    veces_mostrada INTEGER NOT NULL CHECK (veces_mostrada >= 0),
                    ultima_confianza INTEGER CHECK (ultima_confianza BETWEEN 1 AND 5),
                    confianza_sum INTEGER NOT NULL CHECK (confianza_sum >= 0),
                    confianza_count INTEGER NOT NULL CHECK (confianza_count >= 0),
                    confianza_promedio REAL,
                    ultima_fecha_vista TEXT,
                    marcada_para_repaso INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (set_id, question_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_question_sets_created
                    ON question_sets (created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
