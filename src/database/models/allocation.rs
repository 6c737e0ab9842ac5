use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::route::BoardingPoint;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShiftAllocation {
    pub id: i64,
    pub shift_id: i64,
    pub vehicle_id: i64,
    pub route_id: Option<i64>,
    pub departure_time: NaiveTime,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkerAllocation {
    pub id: i64,
    pub shift_allocation_id: i64,
    pub enrollment_id: i64,
    pub boarding_point_id: Option<i64>,
    pub estimated_time: Option<NaiveTime>,
    pub boarding_order: i32,
}

/// One active enrollee as the planner consumes it: the enrollment, the
/// worker's name for reporting, and the worker's boarding point if any.
#[derive(Debug, Clone)]
pub struct EnrolleeView {
    pub enrollment_id: i64,
    pub worker_id: i64,
    pub worker_name: String,
    pub boarding_point: Option<BoardingPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocatedWorkerView {
    pub id: i64,
    pub enrollment_id: i64,
    pub worker_name: String,
    pub boarding_point_name: Option<String>,
    pub estimated_time: Option<NaiveTime>,
    pub boarding_order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleAllocationView {
    pub id: i64,
    pub shift_id: i64,
    pub vehicle_id: i64,
    pub plate: String,
    pub model: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub departure_time: NaiveTime,
    pub workers: Vec<AllocatedWorkerView>,
}

/// A worker's row in "my upcoming rides": one per future allocated shift.
#[derive(Debug, Clone, Serialize)]
pub struct MyAllocationView {
    pub shift_id: i64,
    pub shift_title: String,
    pub shift_date: NaiveDate,
    pub plate: String,
    pub model: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub boarding_point_name: Option<String>,
    pub boarding_point_address: Option<String>,
    pub estimated_time: Option<NaiveTime>,
    pub boarding_order: i32,
}

/// Outcome of a planning run. Infeasibility (no enrollees, no vehicles) is
/// reported here with `success = false`, never as an error.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationResult {
    pub success: bool,
    pub message: String,
    pub vehicles_used: usize,
    pub workers_allocated: usize,
    pub workers_without_boarding_point: Vec<String>,
    pub allocations: Vec<VehicleAllocationView>,
}

impl AllocationResult {
    pub fn infeasible(message: &str, workers_without_boarding_point: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            vehicles_used: 0,
            workers_allocated: 0,
            workers_without_boarding_point,
            allocations: Vec::new(),
        }
    }
}
