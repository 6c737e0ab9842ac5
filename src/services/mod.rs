pub mod allocation;
pub mod directions;
pub mod eligibility;
pub mod reconciler;
pub mod timing;

pub use allocation::AllocationPlanner;
pub use directions::{DirectionsProvider, GoogleDirectionsClient};
pub use eligibility::EnrollmentService;
pub use reconciler::{ReconcilerConfig, ReconcilerHandle, ReconciliationService};
pub use timing::RouteTimingEstimator;
