pub mod allocation;
pub mod attendance;
pub mod enrollment;
pub mod shift;
pub mod vehicle;
pub mod worker;

// Re-export all repositories for easy importing
pub use allocation::AllocationRepository;
pub use attendance::AttendanceRepository;
pub use enrollment::EnrollmentRepository;
pub use shift::ShiftRepository;
pub use vehicle::VehicleRepository;
pub use worker::WorkerRepository;
