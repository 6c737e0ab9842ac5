use std::collections::HashMap;

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;

use crate::database::models::{
    AllocatedWorkerView, MyAllocationView, ShiftAllocation, VehicleAllocationView,
    WorkerAllocation,
};

#[derive(sqlx::FromRow)]
struct VehicleAllocationRow {
    id: i64,
    shift_id: i64,
    vehicle_id: i64,
    departure_time: NaiveTime,
    plate: String,
    model: Option<String>,
    driver_name: Option<String>,
    driver_phone: Option<String>,
}

#[derive(sqlx::FromRow)]
struct AllocatedWorkerRow {
    shift_allocation_id: i64,
    id: i64,
    enrollment_id: i64,
    worker_name: String,
    boarding_point_name: Option<String>,
    estimated_time: Option<NaiveTime>,
    boarding_order: i32,
}

#[derive(Clone)]
pub struct AllocationRepository {
    pool: PgPool,
}

impl AllocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent reset: a planning run discards every allocation row of the
    /// shift before recreating them. Worker rows cascade.
    pub async fn delete_for_shift(&self, shift_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM shift_allocations WHERE shift_id = $1")
            .bind(shift_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn insert_shift_allocation(
        &self,
        shift_id: i64,
        vehicle_id: i64,
        departure_time: NaiveTime,
    ) -> Result<ShiftAllocation> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query_as::<_, ShiftAllocation>(
            r#"
            INSERT INTO shift_allocations (shift_id, vehicle_id, route_id, departure_time, created_at)
            VALUES ($1, $2, NULL, $3, $4)
            RETURNING id, shift_id, vehicle_id, route_id, departure_time, created_at
            "#,
        )
        .bind(shift_id)
        .bind(vehicle_id)
        .bind(departure_time)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn insert_worker_allocation(
        &self,
        shift_allocation_id: i64,
        enrollment_id: i64,
        boarding_point_id: Option<i64>,
        estimated_time: Option<NaiveTime>,
        boarding_order: i32,
    ) -> Result<WorkerAllocation> {
        let row = sqlx::query_as::<_, WorkerAllocation>(
            r#"
            INSERT INTO worker_allocations (shift_allocation_id, enrollment_id, boarding_point_id, estimated_time, boarding_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, shift_allocation_id, enrollment_id, boarding_point_id, estimated_time, boarding_order
            "#,
        )
        .bind(shift_allocation_id)
        .bind(enrollment_id)
        .bind(boarding_point_id)
        .bind(estimated_time)
        .bind(boarding_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Vehicle allocations of a shift with their pickup sequences, fully
    /// loaded in two queries.
    pub async fn vehicle_allocations_for_shift(
        &self,
        shift_id: i64,
    ) -> Result<Vec<VehicleAllocationView>> {
        let allocations = sqlx::query_as::<_, VehicleAllocationRow>(
            r#"
            SELECT sa.id, sa.shift_id, sa.vehicle_id, sa.departure_time,
                   v.plate, v.model, v.driver_name, v.driver_phone
            FROM shift_allocations sa
            INNER JOIN vehicles v ON v.id = sa.vehicle_id
            WHERE sa.shift_id = $1
            ORDER BY sa.id
            "#,
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        let workers = sqlx::query_as::<_, AllocatedWorkerRow>(
            r#"
            SELECT wa.shift_allocation_id, wa.id, wa.enrollment_id, w.name AS worker_name,
                   bp.name AS boarding_point_name, wa.estimated_time, wa.boarding_order
            FROM worker_allocations wa
            INNER JOIN shift_allocations sa ON sa.id = wa.shift_allocation_id
            INNER JOIN enrollments e ON e.id = wa.enrollment_id
            INNER JOIN workers w ON w.id = e.worker_id
            LEFT JOIN boarding_points bp ON bp.id = wa.boarding_point_id
            WHERE sa.shift_id = $1
            ORDER BY wa.shift_allocation_id, wa.boarding_order
            "#,
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_allocation: HashMap<i64, Vec<AllocatedWorkerView>> = HashMap::new();
        for row in workers {
            by_allocation
                .entry(row.shift_allocation_id)
                .or_default()
                .push(AllocatedWorkerView {
                    id: row.id,
                    enrollment_id: row.enrollment_id,
                    worker_name: row.worker_name,
                    boarding_point_name: row.boarding_point_name,
                    estimated_time: row.estimated_time,
                    boarding_order: row.boarding_order,
                });
        }

        Ok(allocations
            .into_iter()
            .map(|row| VehicleAllocationView {
                workers: by_allocation.remove(&row.id).unwrap_or_default(),
                id: row.id,
                shift_id: row.shift_id,
                vehicle_id: row.vehicle_id,
                plate: row.plate,
                model: row.model,
                driver_name: row.driver_name,
                driver_phone: row.driver_phone,
                departure_time: row.departure_time,
            })
            .collect())
    }

    /// A worker's allocations for shifts on or after the given date.
    pub async fn future_allocations_for_worker(
        &self,
        worker_id: i64,
        from_date: NaiveDate,
    ) -> Result<Vec<MyAllocationView>> {
        let rows = sqlx::query_as::<_, MyAllocationRow>(
            r#"
            SELECT s.id AS shift_id, s.title AS shift_title, s.shift_date,
                   v.plate, v.model, v.driver_name, v.driver_phone,
                   bp.name AS boarding_point_name, bp.address AS boarding_point_address,
                   wa.estimated_time, wa.boarding_order
            FROM worker_allocations wa
            INNER JOIN enrollments e ON e.id = wa.enrollment_id
            INNER JOIN shift_allocations sa ON sa.id = wa.shift_allocation_id
            INNER JOIN shifts s ON s.id = sa.shift_id
            INNER JOIN vehicles v ON v.id = sa.vehicle_id
            LEFT JOIN boarding_points bp ON bp.id = wa.boarding_point_id
            WHERE e.worker_id = $1 AND s.shift_date >= $2
            ORDER BY s.shift_date, s.id
            "#,
        )
        .bind(worker_id)
        .bind(from_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.into()).collect())
    }
}

#[derive(sqlx::FromRow)]
struct MyAllocationRow {
    shift_id: i64,
    shift_title: String,
    shift_date: NaiveDate,
    plate: String,
    model: Option<String>,
    driver_name: Option<String>,
    driver_phone: Option<String>,
    boarding_point_name: Option<String>,
    boarding_point_address: Option<String>,
    estimated_time: Option<NaiveTime>,
    boarding_order: i32,
}

impl From<MyAllocationRow> for MyAllocationView {
    fn from(row: MyAllocationRow) -> Self {
        MyAllocationView {
            shift_id: row.shift_id,
            shift_title: row.shift_title,
            shift_date: row.shift_date,
            plate: row.plate,
            model: row.model,
            driver_name: row.driver_name,
            driver_phone: row.driver_phone,
            boarding_point_name: row.boarding_point_name,
            boarding_point_address: row.boarding_point_address,
            estimated_time: row.estimated_time,
            boarding_order: row.boarding_order,
        }
    }
}
