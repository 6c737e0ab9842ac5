use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{get, middleware::Logger, web, App, HttpResponse, HttpServer, Responder};
use anyhow::Result;

use rotalink::database::{
    init_database,
    repositories::{
        AllocationRepository, AttendanceRepository, EnrollmentRepository, ShiftRepository,
        VehicleRepository, WorkerRepository,
    },
};
use rotalink::handlers::{allocations, enrollments, workers};
use rotalink::middleware::RequestId;
use rotalink::services::{
    AllocationPlanner, EnrollmentService, GoogleDirectionsClient, ReconcilerConfig,
    ReconciliationService, RouteTimingEstimator,
};
use rotalink::Config;

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("Rotalink API v1.0")
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init();

    println!("🚀 Starting Rotalink API server...");

    // Load configuration
    let config = Config::from_env()?;
    println!(
        "📋 Configuration loaded (environment: {})",
        config.environment
    );

    // Initialize database
    let pool = init_database(&config.database_url).await?;
    println!("✅ Database initialized");

    // Initialize repositories
    let shift_repository = ShiftRepository::new(pool.clone());
    let enrollment_repository = EnrollmentRepository::new(pool.clone());
    let worker_repository = WorkerRepository::new(pool.clone());
    let vehicle_repository = VehicleRepository::new(pool.clone());
    let allocation_repository = AllocationRepository::new(pool.clone());
    let attendance_repository = AttendanceRepository::new(pool.clone());

    // Directions provider behind an explicit timeout; planner degrades to
    // the fallback duration when it fails
    let directions = GoogleDirectionsClient::new(
        config.directions_base_url.clone(),
        config.directions_api_key.clone(),
        Duration::from_secs(config.directions_timeout_secs),
    )?;
    let estimator = RouteTimingEstimator::new(
        Arc::new(directions),
        config.fallback_leg_minutes,
        config.dwell_minutes,
    );

    let enrollment_service = EnrollmentService::new(
        shift_repository.clone(),
        enrollment_repository.clone(),
        worker_repository.clone(),
    );
    let planner = AllocationPlanner::new(
        shift_repository.clone(),
        enrollment_repository.clone(),
        worker_repository.clone(),
        vehicle_repository,
        allocation_repository,
        estimator,
    );

    // Background reconciliation task with explicit start/stop lifecycle
    let reconciler = ReconciliationService::new(
        shift_repository,
        enrollment_repository,
        worker_repository.clone(),
        attendance_repository,
        ReconcilerConfig {
            interval: Duration::from_secs(config.reconcile_interval_minutes * 60),
            close_lookahead_hours: config.close_lookahead_hours,
            suspension_days: config.suspension_days,
        },
    );
    let reconciler_handle = reconciler.spawn();
    println!("🔄 Reconciliation task started");

    let enrollment_service_data = web::Data::new(enrollment_service);
    let planner_data = web::Data::new(planner);
    let worker_repo_data = web::Data::new(worker_repository);

    let server_address = config.server_address();
    println!("🌐 Server starting on http://{}", server_address);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(enrollment_service_data.clone())
            .app_data(planner_data.clone())
            .app_data(worker_repo_data.clone())
            .wrap(
                Cors::default()
                    .allowed_origin("http://localhost:3000")
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Requested-With",
                        "X-Correlation-ID",
                    ])
                    .max_age(3600),
            )
            .wrap(RequestId)
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T correlation_id=%{x-correlation-id}o"#,
            ))
            .service(hello)
            .service(health)
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/shifts")
                            .route(
                                "/{id}/enrollments",
                                web::post().to(enrollments::request_enrollment),
                            )
                            .route(
                                "/{id}/allocation",
                                web::post().to(allocations::generate_allocation),
                            )
                            .route(
                                "/{id}/allocation",
                                web::get().to(allocations::get_shift_allocations),
                            ),
                    )
                    .service(
                        web::scope("/enrollments")
                            .route("/{id}/cancel", web::post().to(enrollments::cancel_enrollment))
                            .route(
                                "/{id}/status",
                                web::put().to(enrollments::update_enrollment_status),
                            ),
                    )
                    .service(
                        web::scope("/workers")
                            .route(
                                "/{id}/allocations",
                                web::get().to(allocations::get_my_allocations),
                            )
                            .route(
                                "/{id}/suspension/clear",
                                web::post().to(workers::clear_suspension),
                            ),
                    ),
            )
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    // Stop the reconciliation loop cleanly once the server exits
    reconciler_handle.shutdown().await;

    Ok(())
}
