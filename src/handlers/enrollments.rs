use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::database::models::EnrollmentStatus;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::EnrollmentService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub worker_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEnrollmentStatusRequest {
    pub status: EnrollmentStatus,
}

pub async fn request_enrollment(
    path: web::Path<i64>,
    input: web::Json<EnrollmentRequest>,
    service: web::Data<EnrollmentService>,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();

    let enrollment = service
        .request_enrollment(input.worker_id, shift_id)
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(enrollment)))
}

pub async fn cancel_enrollment(
    path: web::Path<i64>,
    input: web::Json<EnrollmentRequest>,
    service: web::Data<EnrollmentService>,
) -> Result<HttpResponse, AppError> {
    let enrollment_id = path.into_inner();

    let enrollment = service
        .cancel_enrollment(input.worker_id, enrollment_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(enrollment)))
}

pub async fn update_enrollment_status(
    path: web::Path<i64>,
    input: web::Json<UpdateEnrollmentStatusRequest>,
    service: web::Data<EnrollmentService>,
) -> Result<HttpResponse, AppError> {
    let enrollment_id = path.into_inner();

    let enrollment = service
        .override_status(enrollment_id, input.status)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(enrollment)))
}
