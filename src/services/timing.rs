use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::database::models::BoardingPoint;
use crate::services::directions::DirectionsProvider;

/// Estimated pickup time at one boarding point.
#[derive(Debug, Clone, PartialEq)]
pub struct StopEstimate {
    pub boarding_point_id: i64,
    pub arrival: NaiveTime,
}

/// Converts a route-ordered sequence of occupied boarding points into
/// per-stop arrival estimates. The vehicle is at the first point at
/// departure time; every later hop asks the directions provider for the
/// leg duration and falls back to a fixed constant when the provider
/// fails or a point has no coordinates.
pub struct RouteTimingEstimator {
    provider: Arc<dyn DirectionsProvider>,
    fallback_leg_minutes: i64,
    dwell_minutes: i64,
}

impl RouteTimingEstimator {
    pub fn new(
        provider: Arc<dyn DirectionsProvider>,
        fallback_leg_minutes: i64,
        dwell_minutes: i64,
    ) -> Self {
        Self {
            provider,
            fallback_leg_minutes,
            dwell_minutes,
        }
    }

    pub async fn stop_times(
        &self,
        date: NaiveDate,
        departure: NaiveTime,
        points: &[BoardingPoint],
    ) -> Vec<StopEstimate> {
        let mut clock = NaiveDateTime::new(date, departure);
        let mut estimates = Vec::with_capacity(points.len());
        let mut previous: Option<&BoardingPoint> = None;

        for point in points {
            if let Some(prev) = previous {
                clock += self.leg_duration(prev, point).await;
            }

            estimates.push(StopEstimate {
                boarding_point_id: point.id,
                arrival: clock.time(),
            });

            clock += Duration::minutes(self.dwell_minutes);
            previous = Some(point);
        }

        estimates
    }

    async fn leg_duration(&self, from: &BoardingPoint, to: &BoardingPoint) -> Duration {
        let (Some(origin), Some(destination)) = (from.coordinates(), to.coordinates()) else {
            return Duration::minutes(self.fallback_leg_minutes);
        };

        match self.provider.travel_duration(origin, destination).await {
            Ok(minutes) => Duration::seconds((minutes * 60.0).round() as i64),
            Err(e) => {
                log::warn!(
                    "Directions lookup failed for leg {} -> {}: {}, using {}min fallback",
                    from.id,
                    to.id,
                    e,
                    self.fallback_leg_minutes
                );
                Duration::minutes(self.fallback_leg_minutes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::directions::DirectionsError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct StubProvider {
        minutes: f64,
        fail: bool,
    }

    #[async_trait]
    impl DirectionsProvider for StubProvider {
        async fn travel_duration(
            &self,
            _origin: (f64, f64),
            _destination: (f64, f64),
        ) -> Result<f64, DirectionsError> {
            if self.fail {
                Err(DirectionsError::Provider("UNKNOWN_ERROR".to_string()))
            } else {
                Ok(self.minutes)
            }
        }
    }

    fn point(id: i64, order: i32, coords: Option<(f64, f64)>) -> BoardingPoint {
        BoardingPoint {
            id,
            route_id: 1,
            name: format!("Stop {}", id),
            address: None,
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            route_order: Some(order),
        }
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    #[tokio::test]
    async fn first_stop_matches_departure_time() {
        let estimator = RouteTimingEstimator::new(
            Arc::new(StubProvider {
                minutes: 7.0,
                fail: false,
            }),
            10,
            0,
        );

        let points = vec![point(1, 1, Some((-23.5, -46.6)))];
        let estimates = estimator.stop_times(date(), t(6, 30), &points).await;

        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].arrival, t(6, 30));
    }

    #[tokio::test]
    async fn provider_estimate_advances_the_clock() {
        let estimator = RouteTimingEstimator::new(
            Arc::new(StubProvider {
                minutes: 7.0,
                fail: false,
            }),
            10,
            0,
        );

        let points = vec![
            point(1, 1, Some((-23.50, -46.60))),
            point(2, 2, Some((-23.51, -46.61))),
            point(3, 3, Some((-23.52, -46.62))),
        ];
        let estimates = estimator.stop_times(date(), t(6, 0), &points).await;

        assert_eq!(estimates[0].arrival, t(6, 0));
        assert_eq!(estimates[1].arrival, t(6, 7));
        assert_eq!(estimates[2].arrival, t(6, 14));
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_fixed_duration() {
        let estimator = RouteTimingEstimator::new(
            Arc::new(StubProvider {
                minutes: 7.0,
                fail: true,
            }),
            10,
            0,
        );

        let points = vec![
            point(1, 1, Some((-23.50, -46.60))),
            point(2, 2, Some((-23.51, -46.61))),
        ];
        let estimates = estimator.stop_times(date(), t(6, 0), &points).await;

        assert_eq!(estimates[1].arrival, t(6, 10));
    }

    #[tokio::test]
    async fn missing_coordinates_skip_the_provider() {
        let estimator = RouteTimingEstimator::new(
            Arc::new(StubProvider {
                minutes: 7.0,
                fail: false,
            }),
            10,
            0,
        );

        let points = vec![point(1, 1, Some((-23.50, -46.60))), point(2, 2, None)];
        let estimates = estimator.stop_times(date(), t(6, 0), &points).await;

        assert_eq!(estimates[1].arrival, t(6, 10));
    }

    #[tokio::test]
    async fn dwell_minutes_accumulate_per_stop() {
        let estimator = RouteTimingEstimator::new(
            Arc::new(StubProvider {
                minutes: 5.0,
                fail: false,
            }),
            10,
            2,
        );

        let points = vec![
            point(1, 1, Some((-23.50, -46.60))),
            point(2, 2, Some((-23.51, -46.61))),
            point(3, 3, Some((-23.52, -46.62))),
        ];
        let estimates = estimator.stop_times(date(), t(6, 0), &points).await;

        assert_eq!(estimates[0].arrival, t(6, 0));
        // 2min dwell at the first stop plus the 5min leg
        assert_eq!(estimates[1].arrival, t(6, 7));
        assert_eq!(estimates[2].arrival, t(6, 14));
    }
}
