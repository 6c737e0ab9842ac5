use actix_web::{web, HttpResponse};

use crate::database::repositories::WorkerRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;

/// Administrative override: lifts a suspension regardless of its end date.
pub async fn clear_suspension(
    path: web::Path<i64>,
    workers: web::Data<WorkerRepository>,
) -> Result<HttpResponse, AppError> {
    let worker_id = path.into_inner();

    let worker = workers
        .clear_suspension(worker_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Worker not found".to_string()))?;

    log::info!("Suspension cleared for worker {}", worker_id);

    Ok(HttpResponse::Ok().json(ApiResponse::success(worker)))
}
