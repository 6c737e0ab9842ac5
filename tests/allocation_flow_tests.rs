use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use pretty_assertions::assert_eq;

use rotalink::database::models::{BoardingPoint, EnrolleeView, Vehicle};
use rotalink::services::allocation::{group_by_boarding_point, plan_vehicle_loads};
use rotalink::services::directions::{DirectionsError, DirectionsProvider};
use rotalink::services::RouteTimingEstimator;

struct ScriptedProvider {
    /// Minutes per successful hop; None makes that hop fail.
    legs: Vec<Option<f64>>,
    calls: std::sync::Mutex<usize>,
}

impl ScriptedProvider {
    fn new(legs: Vec<Option<f64>>) -> Self {
        Self {
            legs,
            calls: std::sync::Mutex::new(0),
        }
    }
}

#[async_trait]
impl DirectionsProvider for ScriptedProvider {
    async fn travel_duration(
        &self,
        _origin: (f64, f64),
        _destination: (f64, f64),
    ) -> Result<f64, DirectionsError> {
        let mut calls = self.calls.lock().unwrap();
        let leg = self.legs.get(*calls).copied().flatten();
        *calls += 1;
        leg.ok_or_else(|| DirectionsError::Provider("OVER_QUERY_LIMIT".to_string()))
    }
}

fn point(id: i64, order: i32) -> BoardingPoint {
    BoardingPoint {
        id,
        route_id: 1,
        name: format!("Stop {}", id),
        address: None,
        latitude: Some(-23.5 - id as f64 * 0.01),
        longitude: Some(-46.6 - id as f64 * 0.01),
        route_order: Some(order),
    }
}

fn enrollee(id: i64, name: &str, point: Option<BoardingPoint>) -> EnrolleeView {
    EnrolleeView {
        enrollment_id: id,
        worker_id: id * 10,
        worker_name: name.to_string(),
        boarding_point: point,
    }
}

fn vehicle(id: i64, capacity: i32) -> Vehicle {
    Vehicle {
        id,
        plate: format!("BUS-{:04}", id),
        model: Some("Sprinter".to_string()),
        driver_name: Some("Carlos".to_string()),
        driver_phone: None,
        capacity,
        active: true,
    }
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Five active enrollments, one 3-seater and one 2-seater: the planner
/// fills the larger vehicle first and nobody is left out for capacity.
#[tokio::test]
async fn five_workers_two_vehicles_full_plan() {
    let p1 = point(1, 1);
    let p2 = point(2, 2);
    let p3 = point(3, 3);

    let enrollees = vec![
        enrollee(1, "Ana", Some(p1.clone())),
        enrollee(2, "Bruno", Some(p2.clone())),
        enrollee(3, "Clara", Some(p1.clone())),
        enrollee(4, "Davi", Some(p3.clone())),
        enrollee(5, "Elisa", Some(p2.clone())),
    ];
    let vehicles = vec![vehicle(1, 2), vehicle(2, 3)];

    let loads = plan_vehicle_loads(&vehicles, &enrollees);

    assert_eq!(loads.len(), 2);
    assert_eq!(loads[0].vehicle.id, 2);
    assert_eq!(loads[0].enrollees.len(), 3);
    assert_eq!(loads[1].vehicle.id, 1);
    assert_eq!(loads[1].enrollees.len(), 2);

    let placed: usize = loads.iter().map(|l| l.enrollees.len()).sum();
    assert_eq!(placed, 5);
}

/// Boarding order strictly follows route order within a vehicle: workers
/// at an earlier point always board before workers at a later one.
#[tokio::test]
async fn pickup_sequence_follows_route_order() {
    let early = point(1, 1);
    let late = point(2, 8);

    // Enrollment order deliberately visits the late point first.
    let enrollees = vec![
        enrollee(1, "Ana", Some(late.clone())),
        enrollee(2, "Bruno", Some(early.clone())),
        enrollee(3, "Clara", Some(late.clone())),
    ];

    let groups = group_by_boarding_point(&enrollees);

    // The early point is visited first, so its riders get the lowest
    // boarding indices once the planner numbers the flattened sequence.
    let sequence: Vec<(i64, i64)> = groups
        .iter()
        .flat_map(|(p, members)| members.iter().map(|m| (p.id, m.enrollment_id)))
        .collect();
    assert_eq!(sequence, vec![(1, 2), (2, 1), (2, 3)]);
}

/// ETAs walk the route with the provider; a failed hop advances the clock
/// by exactly the 10-minute fallback instead of failing the run.
#[tokio::test]
async fn eta_walk_with_one_failed_hop() {
    let provider = Arc::new(ScriptedProvider::new(vec![Some(6.0), None]));
    let estimator = RouteTimingEstimator::new(provider, 10, 0);

    let points = vec![point(1, 1), point(2, 2), point(3, 3)];
    let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();

    let estimates = estimator.stop_times(date, t(6, 0), &points).await;

    assert_eq!(estimates.len(), 3);
    assert_eq!(estimates[0].arrival, t(6, 0));
    assert_eq!(estimates[1].arrival, t(6, 6));
    // Second hop failed: 10min fallback, not an aborted run.
    assert_eq!(estimates[2].arrival, t(6, 16));
}

/// Workers without a boarding point are reported by name and never packed.
#[tokio::test]
async fn workers_without_a_point_are_left_aside() {
    let enrollees = vec![
        enrollee(1, "Ana", Some(point(1, 1))),
        enrollee(2, "Bruno", None),
        enrollee(3, "Clara", Some(point(1, 1))),
    ];

    let (with_point, without_point): (Vec<EnrolleeView>, Vec<EnrolleeView>) = enrollees
        .into_iter()
        .partition(|e| e.boarding_point.is_some());

    let names: Vec<String> = without_point.iter().map(|e| e.worker_name.clone()).collect();
    assert_eq!(names, vec!["Bruno".to_string()]);

    let loads = plan_vehicle_loads(&[vehicle(1, 10)], &with_point);
    let packed: Vec<i64> = loads
        .iter()
        .flat_map(|l| l.enrollees.iter().map(|e| e.enrollment_id))
        .collect();
    assert_eq!(packed, vec![1, 3]);
}
