pub mod allocations;
pub mod enrollments;
pub mod shared;
pub mod workers;
