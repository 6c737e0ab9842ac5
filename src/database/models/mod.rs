pub mod allocation;
pub mod attendance;
pub mod enrollment;
pub mod route;
pub mod shift;
pub mod vehicle;
pub mod worker;

// Re-export all models for easy importing
pub use allocation::*;
pub use attendance::*;
pub use enrollment::*;
pub use route::*;
pub use shift::*;
pub use vehicle::*;
pub use worker::*;
