use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;

use crate::database::models::{
    BoardingPoint, Enrollment, EnrolleeView, EnrollmentStatus, EnrollmentWindow,
};

const ENROLLMENT_COLUMNS: &str =
    "id, worker_id, shift_id, status, version, created_at, updated_at";

/// Flat join row behind EnrolleeView; the boarding point columns are all
/// nullable because the join is a LEFT JOIN.
#[derive(sqlx::FromRow)]
struct EnrolleeRow {
    enrollment_id: i64,
    worker_id: i64,
    worker_name: String,
    point_id: Option<i64>,
    point_route_id: Option<i64>,
    point_name: Option<String>,
    point_address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    route_order: Option<i32>,
}

impl From<EnrolleeRow> for EnrolleeView {
    fn from(row: EnrolleeRow) -> Self {
        let boarding_point = match (row.point_id, row.point_route_id, row.point_name) {
            (Some(id), Some(route_id), Some(name)) => Some(BoardingPoint {
                id,
                route_id,
                name,
                address: row.point_address,
                latitude: row.latitude,
                longitude: row.longitude,
                route_order: row.route_order,
            }),
            _ => None,
        };

        EnrolleeView {
            enrollment_id: row.enrollment_id,
            worker_id: row.worker_id,
            worker_name: row.worker_name,
            boarding_point,
        }
    }
}

#[derive(Clone)]
pub struct EnrollmentRepository {
    pool: PgPool,
}

impl EnrollmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Enrollment>> {
        let row = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM enrollments WHERE id = $1",
            ENROLLMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_worker_and_shift(
        &self,
        worker_id: i64,
        shift_id: i64,
    ) -> Result<Option<Enrollment>> {
        let row = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM enrollments WHERE worker_id = $1 AND shift_id = $2 ORDER BY created_at DESC, id DESC LIMIT 1",
            ENROLLMENT_COLUMNS
        ))
        .bind(worker_id)
        .bind(shift_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn active_count_for_shift(&self, shift_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE shift_id = $1 AND status IN ('pending', 'confirmed')",
        )
        .bind(shift_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Shift windows of every active enrollment of a worker, for the
    /// rest-interval check.
    pub async fn active_windows_for_worker(&self, worker_id: i64) -> Result<Vec<EnrollmentWindow>> {
        let rows = sqlx::query_as::<_, EnrollmentWindow>(
            r#"
            SELECT s.id AS shift_id, s.shift_date, s.start_time, s.end_time
            FROM enrollments e
            INNER JOIN shifts s ON s.id = e.shift_id
            WHERE e.worker_id = $1 AND e.status IN ('pending', 'confirmed')
            ORDER BY s.shift_date
            "#,
        )
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Insert a pending enrollment, re-checking the seat count with the shift
    /// row locked so two concurrent requests cannot over-fill the shift.
    /// Returns None when no seat was left at commit time.
    pub async fn insert_pending_guarded(
        &self,
        worker_id: i64,
        shift_id: i64,
    ) -> Result<Option<Enrollment>> {
        let mut tx = self.pool.begin().await?;

        let seat_count: i32 =
            sqlx::query_scalar("SELECT seat_count FROM shifts WHERE id = $1 FOR UPDATE")
                .bind(shift_id)
                .fetch_one(&mut *tx)
                .await?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE shift_id = $1 AND status IN ('pending', 'confirmed')",
        )
        .bind(shift_id)
        .fetch_one(&mut *tx)
        .await?;

        if active >= seat_count as i64 {
            tx.rollback().await?;
            return Ok(None);
        }

        let now = Utc::now().naive_utc();
        let row = sqlx::query_as::<_, Enrollment>(&format!(
            r#"
            INSERT INTO enrollments (worker_id, shift_id, status, version, created_at, updated_at)
            VALUES ($1, $2, $3, 1, $4, $4)
            RETURNING {}
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(worker_id)
        .bind(shift_id)
        .bind(EnrollmentStatus::Pending)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(row))
    }

    /// Removes a superseded cancelled/rejected record before re-enrollment.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Compare-and-swap status update; returns None when the enrollment is
    /// gone or another writer got there first.
    pub async fn update_status(
        &self,
        id: i64,
        status: EnrollmentStatus,
        expected_version: i64,
    ) -> Result<Option<Enrollment>> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query_as::<_, Enrollment>(&format!(
            r#"
            UPDATE enrollments
            SET status = $1, version = version + 1, updated_at = $2
            WHERE id = $3 AND version = $4
            RETURNING {}
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(status)
        .bind(now)
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn confirmed_for_shift(&self, shift_id: i64) -> Result<Vec<Enrollment>> {
        let rows = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM enrollments WHERE shift_id = $1 AND status = $2 ORDER BY id",
            ENROLLMENT_COLUMNS
        ))
        .bind(shift_id)
        .bind(EnrollmentStatus::Confirmed)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Active enrollees of a shift with worker name and boarding point, in
    /// enrollment order — the planner's input queue.
    pub async fn enrollees_for_shift(&self, shift_id: i64) -> Result<Vec<EnrolleeView>> {
        let rows = sqlx::query_as::<_, EnrolleeRow>(
            r#"
            SELECT e.id AS enrollment_id, w.id AS worker_id, w.name AS worker_name,
                   bp.id AS point_id, bp.route_id AS point_route_id, bp.name AS point_name,
                   bp.address AS point_address, bp.latitude, bp.longitude, bp.route_order
            FROM enrollments e
            INNER JOIN workers w ON w.id = e.worker_id
            LEFT JOIN boarding_points bp ON bp.id = w.boarding_point_id
            WHERE e.shift_id = $1 AND e.status IN ('pending', 'confirmed')
            ORDER BY e.created_at, e.id
            "#,
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.into()).collect())
    }
}
