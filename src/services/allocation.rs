use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use tokio::sync::Mutex;

use crate::database::models::{
    AllocationResult, BoardingPoint, EnrolleeView, MyAllocationView, Shift, ShiftStatus,
    Vehicle, VehicleAllocationView,
};
use crate::database::repositories::{
    AllocationRepository, EnrollmentRepository, ShiftRepository, VehicleRepository,
    WorkerRepository,
};
use crate::error::AppError;
use crate::services::timing::RouteTimingEstimator;

/// One vehicle and the enrollees it will carry, at most `capacity` of them.
#[derive(Debug, Clone)]
pub struct VehicleLoad {
    pub vehicle: Vehicle,
    pub enrollees: Vec<EnrolleeView>,
}

/// Greedy bin-packing: largest vehicle first, enrollees consumed in
/// enrollment order. Enrollees beyond the last vehicle's capacity remain
/// unallocated. Deterministic for unchanged inputs.
pub fn plan_vehicle_loads(vehicles: &[Vehicle], enrollees: &[EnrolleeView]) -> Vec<VehicleLoad> {
    let mut sorted: Vec<Vehicle> = vehicles.to_vec();
    sorted.sort_by(|a, b| b.capacity.cmp(&a.capacity).then(a.id.cmp(&b.id)));

    let mut queue: VecDeque<EnrolleeView> = enrollees.iter().cloned().collect();
    let mut loads = Vec::new();

    for vehicle in sorted {
        if queue.is_empty() {
            break;
        }

        let take = (vehicle.capacity.max(0) as usize).min(queue.len());
        let enrollees: Vec<EnrolleeView> = queue.drain(..take).collect();
        loads.push(VehicleLoad { vehicle, enrollees });
    }

    loads
}

/// Groups a vehicle's enrollees by boarding point and orders the points by
/// route order index (unordered points last, ties by id). Enrollee order
/// within a point is stable.
pub fn group_by_boarding_point(
    enrollees: &[EnrolleeView],
) -> Vec<(BoardingPoint, Vec<EnrolleeView>)> {
    let mut groups: Vec<(BoardingPoint, Vec<EnrolleeView>)> = Vec::new();

    for enrollee in enrollees {
        let Some(point) = &enrollee.boarding_point else {
            continue;
        };
        match groups.iter_mut().find(|(p, _)| p.id == point.id) {
            Some((_, members)) => members.push(enrollee.clone()),
            None => groups.push((point.clone(), vec![enrollee.clone()])),
        }
    }

    groups.sort_by(|(a, _), (b, _)| a.order_key().cmp(&b.order_key()).then(a.id.cmp(&b.id)));
    groups
}

/// Regenerates a shift's complete vehicle assignment: reset, pack, sequence,
/// estimate. Runs for the same shift are serialized with a per-shift mutex
/// so two operators cannot interleave the delete-then-recreate sequence.
pub struct AllocationPlanner {
    shifts: ShiftRepository,
    enrollments: EnrollmentRepository,
    workers: WorkerRepository,
    vehicles: VehicleRepository,
    allocations: AllocationRepository,
    estimator: RouteTimingEstimator,
    shift_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl AllocationPlanner {
    pub fn new(
        shifts: ShiftRepository,
        enrollments: EnrollmentRepository,
        workers: WorkerRepository,
        vehicles: VehicleRepository,
        allocations: AllocationRepository,
        estimator: RouteTimingEstimator,
    ) -> Self {
        Self {
            shifts,
            enrollments,
            workers,
            vehicles,
            allocations,
            estimator,
            shift_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for_shift(&self, shift_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.shift_locks.lock().await;
        locks
            .entry(shift_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn generate(
        &self,
        shift_id: i64,
        departure_time: NaiveTime,
    ) -> Result<AllocationResult, AppError> {
        let lock = self.lock_for_shift(shift_id).await;
        let _guard = lock.lock().await;

        let shift = self
            .shifts
            .find_by_id(shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

        if !matches!(shift.status, ShiftStatus::Open | ShiftStatus::Closed) {
            return Err(AppError::BadRequest(
                "Shift must be open or closed to generate an allocation".to_string(),
            ));
        }

        // Idempotent reset: prior allocation rows are discarded before
        // anything is recreated.
        self.allocations.delete_for_shift(shift_id).await?;

        let enrollees = self.enrollments.enrollees_for_shift(shift_id).await?;
        if enrollees.is_empty() {
            return Ok(AllocationResult::infeasible(
                "No active enrollments for this shift",
                Vec::new(),
            ));
        }

        let (with_point, without_point): (Vec<EnrolleeView>, Vec<EnrolleeView>) = enrollees
            .into_iter()
            .partition(|e| e.boarding_point.is_some());
        let without_point_names: Vec<String> = without_point
            .iter()
            .map(|e| e.worker_name.clone())
            .collect();

        let vehicles = self
            .vehicles
            .available_for_date(shift.shift_date, shift_id)
            .await?;
        if vehicles.is_empty() {
            return Ok(AllocationResult::infeasible(
                "No vehicles available for this date (all are already allocated to other shifts)",
                without_point_names,
            ));
        }

        let loads = plan_vehicle_loads(&vehicles, &with_point);
        let mut workers_allocated = 0;

        for load in &loads {
            let allocation = self
                .allocations
                .insert_shift_allocation(shift_id, load.vehicle.id, departure_time)
                .await?;

            let groups = group_by_boarding_point(&load.enrollees);
            let points: Vec<BoardingPoint> = groups.iter().map(|(p, _)| p.clone()).collect();
            let estimates = self
                .estimator
                .stop_times(shift.shift_date, departure_time, &points)
                .await;

            let mut boarding_order = 1;
            for ((point, members), estimate) in groups.iter().zip(estimates.iter()) {
                for enrollee in members {
                    self.allocations
                        .insert_worker_allocation(
                            allocation.id,
                            enrollee.enrollment_id,
                            Some(point.id),
                            Some(estimate.arrival),
                            boarding_order,
                        )
                        .await?;
                    boarding_order += 1;
                    workers_allocated += 1;
                }
            }
        }

        let allocations = self.allocations.vehicle_allocations_for_shift(shift_id).await?;

        log::info!(
            "Allocation generated for shift {}: {} vehicle(s), {} worker(s), {} without boarding point",
            shift_id,
            loads.len(),
            workers_allocated,
            without_point_names.len()
        );

        Ok(AllocationResult {
            success: true,
            message: format!(
                "Allocation generated successfully: {} vehicle(s) used",
                loads.len()
            ),
            vehicles_used: loads.len(),
            workers_allocated,
            workers_without_boarding_point: without_point_names,
            allocations,
        })
    }

    pub async fn shift_allocations(
        &self,
        shift_id: i64,
    ) -> Result<Vec<VehicleAllocationView>, AppError> {
        let shift: Shift = self
            .shifts
            .find_by_id(shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

        Ok(self.allocations.vehicle_allocations_for_shift(shift.id).await?)
    }

    /// A worker's upcoming rides, future shifts only.
    pub async fn my_allocations(&self, worker_id: i64) -> Result<Vec<MyAllocationView>, AppError> {
        let worker = self
            .workers
            .find_by_id(worker_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Worker not found".to_string()))?;

        let today = Utc::now().date_naive();
        Ok(self
            .allocations
            .future_allocations_for_worker(worker.id, today)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vehicle(id: i64, capacity: i32) -> Vehicle {
        Vehicle {
            id,
            plate: format!("ABC-{:04}", id),
            model: None,
            driver_name: None,
            driver_phone: None,
            capacity,
            active: true,
        }
    }

    fn point(id: i64, order: Option<i32>) -> BoardingPoint {
        BoardingPoint {
            id,
            route_id: 1,
            name: format!("Stop {}", id),
            address: None,
            latitude: Some(-23.5),
            longitude: Some(-46.6),
            route_order: order,
        }
    }

    fn enrollee(enrollment_id: i64, point: Option<BoardingPoint>) -> EnrolleeView {
        EnrolleeView {
            enrollment_id,
            worker_id: enrollment_id * 100,
            worker_name: format!("Worker {}", enrollment_id),
            boarding_point: point,
        }
    }

    #[test]
    fn five_enrollees_fill_a_three_and_a_two_seater() {
        let vehicles = vec![vehicle(1, 2), vehicle(2, 3)];
        let enrollees: Vec<EnrolleeView> = (1..=5)
            .map(|i| enrollee(i, Some(point(1, Some(1)))))
            .collect();

        let loads = plan_vehicle_loads(&vehicles, &enrollees);

        assert_eq!(loads.len(), 2);
        // Largest vehicle goes first.
        assert_eq!(loads[0].vehicle.id, 2);
        assert_eq!(loads[0].enrollees.len(), 3);
        assert_eq!(loads[1].vehicle.id, 1);
        assert_eq!(loads[1].enrollees.len(), 2);
    }

    #[test]
    fn no_vehicle_exceeds_its_capacity() {
        let vehicles = vec![vehicle(1, 4), vehicle(2, 4)];
        let enrollees: Vec<EnrolleeView> = (1..=7)
            .map(|i| enrollee(i, Some(point(1, Some(1)))))
            .collect();

        let loads = plan_vehicle_loads(&vehicles, &enrollees);

        for load in &loads {
            assert!(load.enrollees.len() <= load.vehicle.capacity as usize);
        }
    }

    #[test]
    fn leftover_enrollees_stay_unallocated_when_vehicles_run_out() {
        let vehicles = vec![vehicle(1, 3)];
        let enrollees: Vec<EnrolleeView> = (1..=5)
            .map(|i| enrollee(i, Some(point(1, Some(1)))))
            .collect();

        let loads = plan_vehicle_loads(&vehicles, &enrollees);

        let placed: usize = loads.iter().map(|l| l.enrollees.len()).sum();
        assert_eq!(placed, 3);
    }

    #[test]
    fn enrollees_are_consumed_in_enrollment_order() {
        let vehicles = vec![vehicle(1, 2), vehicle(2, 2)];
        let enrollees: Vec<EnrolleeView> = (1..=4)
            .map(|i| enrollee(i, Some(point(1, Some(1)))))
            .collect();

        let loads = plan_vehicle_loads(&vehicles, &enrollees);

        let ids: Vec<i64> = loads
            .iter()
            .flat_map(|l| l.enrollees.iter().map(|e| e.enrollment_id))
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn replanning_with_unchanged_inputs_is_deterministic() {
        let vehicles = vec![vehicle(3, 2), vehicle(1, 5), vehicle(2, 5)];
        let enrollees: Vec<EnrolleeView> = (1..=8)
            .map(|i| enrollee(i, Some(point(i % 3 + 1, Some((i % 3) as i32)))))
            .collect();

        let first = plan_vehicle_loads(&vehicles, &enrollees);
        let second = plan_vehicle_loads(&vehicles, &enrollees);

        let shape =
            |loads: &[VehicleLoad]| -> Vec<(i64, Vec<i64>)> {
                loads
                    .iter()
                    .map(|l| {
                        (
                            l.vehicle.id,
                            l.enrollees.iter().map(|e| e.enrollment_id).collect(),
                        )
                    })
                    .collect()
            };
        assert_eq!(shape(&first), shape(&second));
    }

    #[test]
    fn groups_walk_points_in_route_order() {
        let last = point(30, Some(9));
        let first = point(10, Some(1));
        let middle = point(20, Some(4));

        let enrollees = vec![
            enrollee(1, Some(last.clone())),
            enrollee(2, Some(first.clone())),
            enrollee(3, Some(middle.clone())),
            enrollee(4, Some(first.clone())),
        ];

        let groups = group_by_boarding_point(&enrollees);

        let point_ids: Vec<i64> = groups.iter().map(|(p, _)| p.id).collect();
        assert_eq!(point_ids, vec![10, 20, 30]);
        // Both riders of the first point, in stable order.
        let first_members: Vec<i64> =
            groups[0].1.iter().map(|e| e.enrollment_id).collect();
        assert_eq!(first_members, vec![2, 4]);
    }

    #[test]
    fn points_without_order_sort_last() {
        let unordered = point(5, None);
        let ordered = point(9, Some(2));

        let enrollees = vec![
            enrollee(1, Some(unordered.clone())),
            enrollee(2, Some(ordered.clone())),
        ];

        let groups = group_by_boarding_point(&enrollees);

        let point_ids: Vec<i64> = groups.iter().map(|(p, _)| p.id).collect();
        assert_eq!(point_ids, vec![9, 5]);
    }
}
