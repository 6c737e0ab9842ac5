use actix_web::{web, HttpResponse};
use chrono::NaiveTime;
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::AllocationPlanner;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAllocationRequest {
    /// Departure time of every vehicle, "HH:MM".
    pub departure_time: String,
}

pub async fn generate_allocation(
    path: web::Path<i64>,
    input: web::Json<GenerateAllocationRequest>,
    planner: web::Data<AllocationPlanner>,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();

    let departure_time = NaiveTime::parse_from_str(&input.departure_time, "%H:%M")
        .map_err(|_| AppError::BadRequest("Invalid departure time, expected HH:MM".to_string()))?;

    let result = planner.generate(shift_id, departure_time).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(result)))
}

pub async fn get_shift_allocations(
    path: web::Path<i64>,
    planner: web::Data<AllocationPlanner>,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();

    let allocations = planner.shift_allocations(shift_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(allocations)))
}

pub async fn get_my_allocations(
    path: web::Path<i64>,
    planner: web::Data<AllocationPlanner>,
) -> Result<HttpResponse, AppError> {
    let worker_id = path.into_inner();

    let allocations = planner.my_allocations(worker_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(allocations)))
}
