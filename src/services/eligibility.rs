use chrono::{Duration, NaiveDate, Utc};
use thiserror::Error;

use crate::database::models::{
    Enrollment, EnrollmentStatus, EnrollmentWindow, Shift, ShiftStatus, Worker,
};
use crate::database::repositories::{EnrollmentRepository, ShiftRepository, WorkerRepository};
use crate::error::AppError;

/// Mandatory rest between the end of one shift window and the start of the
/// next for the same worker. The boundary is inclusive: exactly 11 hours of
/// gap is accepted.
pub const REST_INTERVAL_HOURS: i64 = 11;

fn suspension_message(until: &Option<NaiveDate>, reason: &Option<String>) -> String {
    let reason = reason
        .clone()
        .unwrap_or_else(|| "No-show on a previous shift".to_string());
    match until {
        Some(date) => format!(
            "You are suspended until {}. Reason: {}",
            date.format("%d/%m/%Y"),
            reason
        ),
        None => format!("You are suspended. Reason: {}", reason),
    }
}

/// Expected business-rule rejections; surfaced to the caller with a
/// specific reason and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("{}", suspension_message(.until, .reason))]
    WorkerSuspended {
        until: Option<NaiveDate>,
        reason: Option<String>,
    },

    #[error("This shift is not open for enrollment")]
    ShiftNotOpen,

    #[error("This shift has already passed")]
    ShiftPast,

    #[error("You are already enrolled in this shift")]
    AlreadyEnrolled,

    #[error("At least 11 hours of rest required around your enrollment on {}", .conflict_date.format("%d/%m"))]
    RestIntervalViolation { conflict_date: NaiveDate },

    #[error("No seats available for this shift")]
    NoSeatsAvailable,
}

/// Everything the rules need, fully loaded up front.
pub struct EligibilityContext<'a> {
    pub worker: &'a Worker,
    pub shift: &'a Shift,
    /// Latest enrollment record for this (worker, shift) pair, any status.
    pub existing: Option<&'a Enrollment>,
    /// Shift windows of the worker's other active enrollments.
    pub other_windows: &'a [EnrollmentWindow],
    /// Seats currently held by pending/confirmed enrollments of the shift.
    pub active_count: i64,
    pub today: NaiveDate,
}

/// Gate for enrollment creation. Checks run in a fixed order and the first
/// violation wins.
pub fn check_enrollment(ctx: &EligibilityContext<'_>) -> Result<(), EligibilityError> {
    if ctx.worker.is_suspended_on(ctx.today) {
        return Err(EligibilityError::WorkerSuspended {
            until: ctx.worker.suspended_until,
            reason: ctx.worker.suspension_reason.clone(),
        });
    }

    if ctx.shift.status != ShiftStatus::Open {
        return Err(EligibilityError::ShiftNotOpen);
    }

    if ctx.shift.shift_date < ctx.today {
        return Err(EligibilityError::ShiftPast);
    }

    if let Some(existing) = ctx.existing {
        if existing.status.is_active() {
            return Err(EligibilityError::AlreadyEnrolled);
        }
    }

    check_rest_interval(ctx.shift, ctx.other_windows)?;

    if ctx.shift.open_seats(ctx.active_count) <= 0 {
        return Err(EligibilityError::NoSeatsAvailable);
    }

    Ok(())
}

/// The three comparisons close both temporal directions and direct overlap.
/// A gap of exactly REST_INTERVAL_HOURS is accepted.
fn check_rest_interval(
    shift: &Shift,
    other_windows: &[EnrollmentWindow],
) -> Result<(), EligibilityError> {
    let start = shift.start_datetime();
    let end = shift.end_datetime();
    let min_rest = Duration::hours(REST_INTERVAL_HOURS);

    for other in other_windows {
        if other.shift_id == shift.id {
            continue;
        }

        let other_start = other.start_datetime();
        let other_end = other.end_datetime();

        // Candidate starts too soon after the other shift ends.
        if start > other_end && start < other_end + min_rest {
            return Err(EligibilityError::RestIntervalViolation {
                conflict_date: other.shift_date,
            });
        }

        // Candidate ends too close before the other shift starts.
        if end < other_start && end > other_start - min_rest {
            return Err(EligibilityError::RestIntervalViolation {
                conflict_date: other.shift_date,
            });
        }

        // Direct overlap.
        if start < other_end && end > other_start {
            return Err(EligibilityError::RestIntervalViolation {
                conflict_date: other.shift_date,
            });
        }
    }

    Ok(())
}

/// Request-path service gating enrollment creation and cancellation.
#[derive(Clone)]
pub struct EnrollmentService {
    shifts: ShiftRepository,
    enrollments: EnrollmentRepository,
    workers: WorkerRepository,
}

impl EnrollmentService {
    pub fn new(
        shifts: ShiftRepository,
        enrollments: EnrollmentRepository,
        workers: WorkerRepository,
    ) -> Self {
        Self {
            shifts,
            enrollments,
            workers,
        }
    }

    pub async fn request_enrollment(
        &self,
        worker_id: i64,
        shift_id: i64,
    ) -> Result<Enrollment, AppError> {
        let worker = self
            .workers
            .find_by_id(worker_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Worker not found".to_string()))?;

        let shift = self
            .shifts
            .find_by_id(shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

        let existing = self
            .enrollments
            .find_by_worker_and_shift(worker_id, shift_id)
            .await?;
        let other_windows = self.enrollments.active_windows_for_worker(worker_id).await?;
        let active_count = self.enrollments.active_count_for_shift(shift_id).await?;

        let ctx = EligibilityContext {
            worker: &worker,
            shift: &shift,
            existing: existing.as_ref(),
            other_windows: &other_windows,
            active_count,
            today: Utc::now().date_naive(),
        };
        check_enrollment(&ctx)?;

        // A cancelled/rejected record may be superseded by a fresh one.
        if let Some(old) = existing {
            self.enrollments.delete(old.id).await?;
        }

        // The guarded insert re-checks the seat count with the shift row
        // locked, so a concurrent request cannot over-fill the shift.
        let enrollment = self
            .enrollments
            .insert_pending_guarded(worker_id, shift_id)
            .await?
            .ok_or(AppError::Eligibility(EligibilityError::NoSeatsAvailable))?;

        log::info!(
            "Worker {} enrolled in shift {} (enrollment {})",
            worker_id,
            shift_id,
            enrollment.id
        );

        Ok(enrollment)
    }

    /// Workers may cancel their own active enrollment while the shift is
    /// still open.
    pub async fn cancel_enrollment(
        &self,
        worker_id: i64,
        enrollment_id: i64,
    ) -> Result<Enrollment, AppError> {
        let enrollment = self
            .enrollments
            .find_by_id(enrollment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Enrollment not found".to_string()))?;

        if enrollment.worker_id != worker_id {
            return Err(AppError::Forbidden(
                "You cannot cancel another worker's enrollment".to_string(),
            ));
        }

        let shift = self
            .shifts
            .find_by_id(enrollment.shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

        if shift.status != ShiftStatus::Open {
            return Err(AppError::BadRequest(
                "Enrollment can no longer be cancelled after the shift closed".to_string(),
            ));
        }

        if !enrollment.status.is_active() {
            return Err(AppError::BadRequest(
                "This enrollment cannot be cancelled".to_string(),
            ));
        }

        let updated = self
            .enrollments
            .update_status(enrollment.id, EnrollmentStatus::Cancelled, enrollment.version)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("Enrollment was modified concurrently, try again".to_string())
            })?;

        Ok(updated)
    }

    /// Operator override: move an enrollment to any status directly.
    pub async fn override_status(
        &self,
        enrollment_id: i64,
        status: EnrollmentStatus,
    ) -> Result<Enrollment, AppError> {
        let enrollment = self
            .enrollments
            .find_by_id(enrollment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Enrollment not found".to_string()))?;

        let updated = self
            .enrollments
            .update_status(enrollment.id, status, enrollment.version)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("Enrollment was modified concurrently, try again".to_string())
            })?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, NaiveTime};
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn ts() -> NaiveDateTime {
        NaiveDateTime::new(d(2026, 3, 1), t(12, 0))
    }

    fn worker(suspended: bool, until: Option<NaiveDate>) -> Worker {
        Worker {
            id: 1,
            name: "Ana Souza".to_string(),
            suspended,
            suspended_until: until,
            suspension_reason: None,
            boarding_point_id: Some(10),
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn shift(
        id: i64,
        date: NaiveDate,
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
        seats: i32,
        status: ShiftStatus,
    ) -> Shift {
        Shift {
            id,
            title: "Warehouse day".to_string(),
            shift_date: date,
            start_time: start,
            end_time: end,
            seat_count: seats,
            rate: None,
            status,
            company_id: 1,
            supervisor_id: None,
            version: 1,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn window(
        shift_id: i64,
        date: NaiveDate,
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
    ) -> EnrollmentWindow {
        EnrollmentWindow {
            shift_id,
            shift_date: date,
            start_time: start,
            end_time: end,
        }
    }

    fn check(
        worker: &Worker,
        shift: &Shift,
        windows: &[EnrollmentWindow],
        active_count: i64,
        today: NaiveDate,
    ) -> Result<(), EligibilityError> {
        check_enrollment(&EligibilityContext {
            worker,
            shift,
            existing: None,
            other_windows: windows,
            active_count,
            today,
        })
    }

    #[test]
    fn suspended_worker_is_rejected_until_end_date() {
        let today = d(2026, 3, 9);
        let w = worker(true, Some(d(2026, 3, 10)));
        let s = shift(1, d(2026, 3, 15), Some(t(8, 0)), Some(t(16, 0)), 5, ShiftStatus::Open);

        assert!(matches!(
            check(&w, &s, &[], 0, today),
            Err(EligibilityError::WorkerSuspended { .. })
        ));
    }

    #[test]
    fn lapsed_suspension_no_longer_blocks() {
        let today = d(2026, 3, 11);
        let w = worker(true, Some(d(2026, 3, 10)));
        let s = shift(1, d(2026, 3, 15), Some(t(8, 0)), Some(t(16, 0)), 5, ShiftStatus::Open);

        assert_eq!(check(&w, &s, &[], 0, today), Ok(()));
    }

    #[test]
    fn indefinite_suspension_blocks() {
        let today = d(2026, 3, 9);
        let w = worker(true, None);
        let s = shift(1, d(2026, 3, 15), Some(t(8, 0)), Some(t(16, 0)), 5, ShiftStatus::Open);

        assert!(matches!(
            check(&w, &s, &[], 0, today),
            Err(EligibilityError::WorkerSuspended { until: None, .. })
        ));
    }

    #[test]
    fn closed_shift_is_rejected() {
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(1, d(2026, 3, 15), Some(t(8, 0)), Some(t(16, 0)), 5, ShiftStatus::Closed);

        assert_eq!(check(&w, &s, &[], 0, today), Err(EligibilityError::ShiftNotOpen));
    }

    #[test]
    fn past_shift_is_rejected() {
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(1, d(2026, 3, 8), Some(t(8, 0)), Some(t(16, 0)), 5, ShiftStatus::Open);

        assert_eq!(check(&w, &s, &[], 0, today), Err(EligibilityError::ShiftPast));
    }

    #[test]
    fn full_shift_is_rejected() {
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(1, d(2026, 3, 15), Some(t(8, 0)), Some(t(16, 0)), 3, ShiftStatus::Open);

        assert_eq!(
            check(&w, &s, &[], 3, today),
            Err(EligibilityError::NoSeatsAvailable)
        );
    }

    #[test]
    fn active_duplicate_enrollment_is_rejected() {
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(1, d(2026, 3, 15), Some(t(8, 0)), Some(t(16, 0)), 5, ShiftStatus::Open);
        let existing = Enrollment {
            id: 7,
            worker_id: 1,
            shift_id: 1,
            status: EnrollmentStatus::Pending,
            version: 1,
            created_at: ts(),
            updated_at: ts(),
        };

        let result = check_enrollment(&EligibilityContext {
            worker: &w,
            shift: &s,
            existing: Some(&existing),
            other_windows: &[],
            active_count: 1,
            today,
        });

        assert_eq!(result, Err(EligibilityError::AlreadyEnrolled));
    }

    #[test]
    fn cancelled_record_does_not_count_as_enrolled() {
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(1, d(2026, 3, 15), Some(t(8, 0)), Some(t(16, 0)), 5, ShiftStatus::Open);
        let existing = Enrollment {
            id: 7,
            worker_id: 1,
            shift_id: 1,
            status: EnrollmentStatus::Cancelled,
            version: 2,
            created_at: ts(),
            updated_at: ts(),
        };

        let result = check_enrollment(&EligibilityContext {
            worker: &w,
            shift: &s,
            existing: Some(&existing),
            other_windows: &[],
            active_count: 0,
            today,
        });

        assert_eq!(result, Ok(()));
    }

    #[test]
    fn same_evening_after_a_day_shift_violates_rest() {
        // 08:00-16:00 worked, 20:00 start leaves only 4h of rest.
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(2, d(2026, 3, 10), Some(t(20, 0)), Some(t(22, 0)), 5, ShiftStatus::Open);
        let other = window(1, d(2026, 3, 10), Some(t(8, 0)), Some(t(16, 0)));

        assert_eq!(
            check(&w, &s, &[other], 0, today),
            Err(EligibilityError::RestIntervalViolation {
                conflict_date: d(2026, 3, 10)
            })
        );
    }

    #[test]
    fn exactly_eleven_hours_of_rest_is_accepted() {
        // Ends 16:00, next starts 03:00 the day after: exactly 11h.
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(2, d(2026, 3, 11), Some(t(3, 0)), Some(t(7, 0)), 5, ShiftStatus::Open);
        let other = window(1, d(2026, 3, 10), Some(t(8, 0)), Some(t(16, 0)));

        assert_eq!(check(&w, &s, &[other], 0, today), Ok(()));
    }

    #[test]
    fn one_minute_short_of_eleven_hours_is_rejected() {
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(2, d(2026, 3, 11), Some(t(2, 59)), Some(t(7, 0)), 5, ShiftStatus::Open);
        let other = window(1, d(2026, 3, 10), Some(t(8, 0)), Some(t(16, 0)));

        assert_eq!(
            check(&w, &s, &[other], 0, today),
            Err(EligibilityError::RestIntervalViolation {
                conflict_date: d(2026, 3, 10)
            })
        );
    }

    #[test]
    fn ending_too_close_before_another_shift_is_rejected() {
        // Candidate ends 23:00, the other starts 08:00 next day: 9h gap.
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(2, d(2026, 3, 10), Some(t(19, 0)), Some(t(23, 0)), 5, ShiftStatus::Open);
        let other = window(1, d(2026, 3, 11), Some(t(8, 0)), Some(t(16, 0)));

        assert_eq!(
            check(&w, &s, &[other], 0, today),
            Err(EligibilityError::RestIntervalViolation {
                conflict_date: d(2026, 3, 11)
            })
        );
    }

    #[test]
    fn overlapping_windows_are_rejected() {
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(2, d(2026, 3, 10), Some(t(12, 0)), Some(t(20, 0)), 5, ShiftStatus::Open);
        let other = window(1, d(2026, 3, 10), Some(t(8, 0)), Some(t(16, 0)));

        assert_eq!(
            check(&w, &s, &[other], 0, today),
            Err(EligibilityError::RestIntervalViolation {
                conflict_date: d(2026, 3, 10)
            })
        );
    }

    #[test]
    fn missing_times_default_to_full_day_window() {
        // The other enrollment has no times: its window covers the whole
        // day, so a same-day candidate overlaps.
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(2, d(2026, 3, 10), Some(t(12, 0)), Some(t(20, 0)), 5, ShiftStatus::Open);
        let other = window(1, d(2026, 3, 10), None, None);

        assert_eq!(
            check(&w, &s, &[other], 0, today),
            Err(EligibilityError::RestIntervalViolation {
                conflict_date: d(2026, 3, 10)
            })
        );
    }

    #[test]
    fn distant_enrollments_do_not_conflict() {
        let today = d(2026, 3, 9);
        let w = worker(false, None);
        let s = shift(2, d(2026, 3, 20), Some(t(8, 0)), Some(t(16, 0)), 5, ShiftStatus::Open);
        let other = window(1, d(2026, 3, 10), Some(t(8, 0)), Some(t(16, 0)));

        assert_eq!(check(&w, &s, &[other], 0, today), Ok(()));
    }

    #[test]
    fn open_seats_clamp_to_zero() {
        let s = shift(1, d(2026, 3, 15), None, None, 3, ShiftStatus::Open);
        assert_eq!(s.open_seats(5), 0);
        assert_eq!(s.open_seats(1), 2);
    }
}
