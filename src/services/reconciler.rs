use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::database::models::{EnrollmentStatus, Shift, ShiftStatus};
use crate::database::repositories::{
    AttendanceRepository, EnrollmentRepository, ShiftRepository, WorkerRepository,
};

pub const DEFAULT_SUSPENSION_REASON: &str = "No-show on a shift without justification";

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub interval: std::time::Duration,
    pub close_lookahead_hours: i64,
    pub suspension_days: i64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoShowStats {
    pub shifts_processed: usize,
    pub no_shows: usize,
    pub suspensions: usize,
}

/// True when the shift's start datetime falls inside the auto-close
/// lookahead window.
pub fn starts_within_lookahead(shift: &Shift, now: NaiveDateTime, lookahead_hours: i64) -> bool {
    shift.start_datetime() <= now + Duration::hours(lookahead_hours)
}

/// True once the shift's effective end has passed: any prior date, or an
/// end time already behind the clock today.
pub fn shift_has_ended(shift: &Shift, now: NaiveDateTime) -> bool {
    if shift.shift_date < now.date() {
        return true;
    }
    if shift.shift_date == now.date() {
        if let Some(end) = shift.end_time {
            return now.time() > end;
        }
    }
    false
}

/// Suspensions stack: a live future end-date is extended, anything else
/// restarts from today.
pub fn next_suspension_end(
    current_until: Option<NaiveDate>,
    today: NaiveDate,
    days: i64,
) -> NaiveDate {
    match current_until {
        Some(until) if until > today => until + Duration::days(days),
        _ => today + Duration::days(days),
    }
}

/// The recurring background task: closes shifts approaching start time
/// every cycle, and every other cycle converts un-attested confirmed
/// enrollments of ended shifts into no-shows with a stacking suspension.
pub struct ReconciliationService {
    shifts: ShiftRepository,
    enrollments: EnrollmentRepository,
    workers: WorkerRepository,
    attendance: AttendanceRepository,
    config: ReconcilerConfig,
}

/// Owns the spawned loop; dropping without `shutdown` leaves it running.
pub struct ReconcilerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            log::error!("Reconciliation task did not shut down cleanly: {}", e);
        }
    }
}

impl ReconciliationService {
    pub fn new(
        shifts: ShiftRepository,
        enrollments: EnrollmentRepository,
        workers: WorkerRepository,
        attendance: AttendanceRepository,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            shifts,
            enrollments,
            workers,
            attendance,
            config,
        }
    }

    /// Starts the loop. Errors inside a cycle are caught and logged; the
    /// next cycle proceeds independently.
    pub fn spawn(self) -> ReconcilerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            log::info!(
                "Reconciliation loop started (interval {:?})",
                self.config.interval
            );
            let mut interval = tokio::time::interval(self.config.interval);
            let mut cycle: u64 = 0;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        cycle += 1;
                        if let Err(e) = self.run_cycle(cycle).await {
                            log::error!("Reconciliation cycle {} failed: {}", cycle, e);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        log::info!("Reconciliation loop stopping");
                        break;
                    }
                }
            }
        });

        ReconcilerHandle { shutdown_tx, task }
    }

    pub async fn run_cycle(&self, cycle: u64) -> anyhow::Result<()> {
        let now = Utc::now().naive_utc();

        let closed = self.close_imminent_shifts(now).await?;
        if !closed.is_empty() {
            log::info!("Auto-closed {} shift(s): {:?}", closed.len(), closed);
        }

        // No-show detection runs at half the closing cadence.
        if cycle % 2 == 0 {
            let stats = self.mark_no_shows(now).await?;
            if stats.no_shows > 0 {
                log::info!(
                    "No-show pass: {} shift(s) examined, {} no-show(s), {} suspension(s)",
                    stats.shifts_processed,
                    stats.no_shows,
                    stats.suspensions
                );
            }
        }

        Ok(())
    }

    /// Closes every open shift whose start datetime falls within the
    /// lookahead window, so no new enrollments land on an imminent shift.
    pub async fn close_imminent_shifts(&self, now: NaiveDateTime) -> anyhow::Result<Vec<i64>> {
        let cutoff = now + Duration::hours(self.config.close_lookahead_hours);
        let candidates = self.shifts.find_open_through(cutoff.date()).await?;

        let mut closed = Vec::new();
        for shift in candidates {
            if !starts_within_lookahead(&shift, now, self.config.close_lookahead_hours) {
                continue;
            }
            match self
                .shifts
                .update_status(shift.id, ShiftStatus::Closed, shift.version)
                .await?
            {
                Some(_) => {
                    log::info!("Shift {} '{}' closed automatically", shift.id, shift.title);
                    closed.push(shift.id);
                }
                None => {
                    // Another writer got there first; the next cycle retries.
                    log::warn!("Shift {} changed concurrently, skipping auto-close", shift.id);
                }
            }
        }

        Ok(closed)
    }

    /// Confirmed enrollments without an attendance record on ended shifts
    /// become no-shows, and the worker is suspended.
    pub async fn mark_no_shows(&self, now: NaiveDateTime) -> anyhow::Result<NoShowStats> {
        let candidates = self.shifts.find_ended_candidates().await?;
        let mut stats = NoShowStats::default();

        for shift in candidates {
            if !shift_has_ended(&shift, now) {
                continue;
            }
            stats.shifts_processed += 1;

            for enrollment in self.enrollments.confirmed_for_shift(shift.id).await? {
                if self
                    .attendance
                    .find_by_enrollment(enrollment.id)
                    .await?
                    .is_some()
                {
                    continue;
                }

                match self
                    .enrollments
                    .update_status(enrollment.id, EnrollmentStatus::NoShow, enrollment.version)
                    .await?
                {
                    Some(_) => {
                        stats.no_shows += 1;
                        if self
                            .suspend_for_no_show(enrollment.worker_id, now.date())
                            .await?
                        {
                            stats.suspensions += 1;
                        }
                    }
                    None => {
                        log::warn!(
                            "Enrollment {} changed concurrently, skipping no-show",
                            enrollment.id
                        );
                    }
                }
            }
        }

        Ok(stats)
    }

    async fn suspend_for_no_show(&self, worker_id: i64, today: NaiveDate) -> anyhow::Result<bool> {
        let Some(worker) = self.workers.find_by_id(worker_id).await? else {
            log::warn!("Worker {} not found while applying no-show penalty", worker_id);
            return Ok(false);
        };

        // An indefinite administrative hold already outranks the penalty.
        if worker.suspended && worker.suspended_until.is_none() {
            return Ok(false);
        }

        let current = if worker.suspended {
            worker.suspended_until
        } else {
            None
        };
        let until = next_suspension_end(current, today, self.config.suspension_days);
        let reason = worker
            .suspension_reason
            .unwrap_or_else(|| DEFAULT_SUSPENSION_REASON.to_string());

        self.workers
            .set_suspension(worker_id, until, &reason)
            .await?;
        log::info!("Worker {} suspended until {}", worker_id, until);

        Ok(true)
    }
}
