use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use crate::database::models::{Shift, ShiftStatus};

const SHIFT_COLUMNS: &str = "id, title, shift_date, start_time, end_time, seat_count, rate, status, company_id, supervisor_id, version, created_at, updated_at";

#[derive(Clone)]
pub struct ShiftRepository {
    pool: PgPool,
}

impl ShiftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Shift>> {
        let row = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {} FROM shifts WHERE id = $1",
            SHIFT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Compare-and-swap status update; returns None when the shift is gone
    /// or another writer bumped the version first.
    pub async fn update_status(
        &self,
        id: i64,
        status: ShiftStatus,
        expected_version: i64,
    ) -> Result<Option<Shift>> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query_as::<_, Shift>(&format!(
            r#"
            UPDATE shifts
            SET status = $1, version = version + 1, updated_at = $2
            WHERE id = $3 AND version = $4
            RETURNING {}
            "#,
            SHIFT_COLUMNS
        ))
        .bind(status)
        .bind(now)
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Open shifts dated up to the cutoff, for the auto-closer. The exact
    /// start-datetime comparison happens in the caller since start_time is
    /// nullable.
    pub async fn find_open_through(&self, cutoff_date: NaiveDate) -> Result<Vec<Shift>> {
        let rows = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {} FROM shifts WHERE status = $1 AND shift_date <= $2 ORDER BY shift_date",
            SHIFT_COLUMNS
        ))
        .bind(ShiftStatus::Open)
        .bind(cutoff_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Shifts that may have ended: completed, or still marked in-progress.
    pub async fn find_ended_candidates(&self) -> Result<Vec<Shift>> {
        let rows = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {} FROM shifts WHERE status = $1 OR status = $2 ORDER BY shift_date",
            SHIFT_COLUMNS
        ))
        .bind(ShiftStatus::Completed)
        .bind(ShiftStatus::InProgress)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
