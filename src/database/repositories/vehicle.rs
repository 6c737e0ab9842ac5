use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::database::models::Vehicle;

#[derive(Clone)]
pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active vehicles not allocated to any other shift on the given date,
    /// largest capacity first. A vehicle serves at most one shift per date.
    pub async fn available_for_date(&self, date: NaiveDate, shift_id: i64) -> Result<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT v.id, v.plate, v.model, v.driver_name, v.driver_phone, v.capacity, v.active
            FROM vehicles v
            WHERE v.active = TRUE
              AND v.id NOT IN (
                  SELECT sa.vehicle_id
                  FROM shift_allocations sa
                  INNER JOIN shifts s ON s.id = sa.shift_id
                  WHERE s.shift_date = $1 AND sa.shift_id <> $2
              )
            ORDER BY v.capacity DESC, v.id
            "#,
        )
        .bind(date)
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
