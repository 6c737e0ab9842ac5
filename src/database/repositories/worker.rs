use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use crate::database::models::Worker;

const WORKER_COLUMNS: &str = "id, name, suspended, suspended_until, suspension_reason, boarding_point_id, created_at, updated_at";

#[derive(Clone)]
pub struct WorkerRepository {
    pool: PgPool,
}

impl WorkerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Worker>> {
        let row = sqlx::query_as::<_, Worker>(&format!(
            "SELECT {} FROM workers WHERE id = $1",
            WORKER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn set_suspension(
        &self,
        id: i64,
        until: NaiveDate,
        reason: &str,
    ) -> Result<Option<Worker>> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query_as::<_, Worker>(&format!(
            r#"
            UPDATE workers
            SET suspended = TRUE, suspended_until = $1, suspension_reason = $2, updated_at = $3
            WHERE id = $4
            RETURNING {}
            "#,
            WORKER_COLUMNS
        ))
        .bind(until)
        .bind(reason)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn clear_suspension(&self, id: i64) -> Result<Option<Worker>> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query_as::<_, Worker>(&format!(
            r#"
            UPDATE workers
            SET suspended = FALSE, suspended_until = NULL, suspension_reason = NULL, updated_at = $1
            WHERE id = $2
            RETURNING {}
            "#,
            WORKER_COLUMNS
        ))
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
