use anyhow::Result;
use sqlx::PgPool;

use crate::database::models::AttendanceRecord;

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_enrollment(&self, enrollment_id: i64) -> Result<Option<AttendanceRecord>> {
        let row = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT id, enrollment_id, checked_in_at FROM attendance_records WHERE enrollment_id = $1",
        )
        .bind(enrollment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
