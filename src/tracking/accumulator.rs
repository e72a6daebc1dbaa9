use log::debug;
use serde::{Deserialize, Serialize};

use super::{GeoSample, pace::estimate_current_speed};

/// Fraction of the reported accuracy radius a move must exceed to count
const ACCURACY_THRESHOLD_FACTOR: f64 = 0.3;
/// Smallest move accepted regardless of how accurate the fix claims to be
const MIN_ACCEPTED_MOVE_M: f64 = 2.0;

/// Minimum distance a candidate must move away from the last accepted sample.
pub fn acceptance_threshold_m(accuracy_m: f64) -> f64 {
    (accuracy_m * ACCURACY_THRESHOLD_FACTOR).max(MIN_ACCEPTED_MOVE_M)
}

/// Whether a move of `distance_m` is genuine movement rather than GPS jitter.
pub fn exceeds_jitter_threshold(distance_m: f64, accuracy_m: f64) -> bool {
    distance_m > acceptance_threshold_m(accuracy_m)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SampleOutcome {
    /// The sample was appended to the route and `distance_m` added to the total
    Accepted { distance_m: f64 },
    Rejected(RejectReason),
}

impl SampleOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SampleOutcome::Accepted { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RejectReason {
    /// Coordinates are not finite or outside the globe
    Malformed,
    /// Timestamp is not newer than the last accepted sample
    Stale,
    /// Movement within the accuracy-scaled noise threshold
    Jitter { distance_m: f64, threshold_m: f64 },
}

/// Accepted route history and the distance/speed derived from it.
///
/// History is append-only and the cumulative distance never decreases while
/// a session is running. Only [`RouteState::clear`] starts over.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RouteState {
    samples: Vec<GeoSample>,
    cumulative_distance_m: f64,
    current_speed_mps: f64,
    average_speed_mps: f64,
}

impl RouteState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a sample to the route.
    pub fn accept(&mut self, sample: GeoSample) -> SampleOutcome {
        if !sample.has_valid_coordinates() {
            debug!(
                "Rejecting malformed sample ({}, {})",
                sample.latitude, sample.longitude
            );
            return SampleOutcome::Rejected(RejectReason::Malformed);
        }

        let Some(last) = self.samples.last().copied() else {
            // first fix of the session
            if let Some(speed) = sample.speed_mps.filter(|s| *s >= 0.0) {
                self.current_speed_mps = speed;
            }
            self.samples.push(sample);
            return SampleOutcome::Accepted { distance_m: 0.0 };
        };

        if sample.timestamp_ms <= last.timestamp_ms {
            debug!(
                "Rejecting stale sample at {} (last accepted {})",
                sample.timestamp_ms, last.timestamp_ms
            );
            return SampleOutcome::Rejected(RejectReason::Stale);
        }

        let distance_m = last.distance_to(&sample);
        if !exceeds_jitter_threshold(distance_m, sample.accuracy_m) {
            let threshold_m = acceptance_threshold_m(sample.accuracy_m);
            debug!(
                "Rejecting jitter: moved {:.2} m, threshold {:.2} m",
                distance_m, threshold_m
            );
            return SampleOutcome::Rejected(RejectReason::Jitter {
                distance_m,
                threshold_m,
            });
        }

        self.current_speed_mps =
            estimate_current_speed(&last, &sample, distance_m, self.current_speed_mps);
        self.cumulative_distance_m += distance_m;
        self.samples.push(sample);

        SampleOutcome::Accepted { distance_m }
    }

    /// Recompute the average speed against the session clock.
    pub fn update_average_speed(&mut self, elapsed_seconds: u32) {
        if elapsed_seconds > 0 {
            self.average_speed_mps = self.cumulative_distance_m / f64::from(elapsed_seconds);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn samples(&self) -> &[GeoSample] {
        &self.samples
    }

    pub fn cumulative_distance_m(&self) -> f64 {
        self.cumulative_distance_m
    }

    pub fn current_speed_mps(&self) -> f64 {
        self.current_speed_mps
    }

    pub fn average_speed_mps(&self) -> f64 {
        self.average_speed_mps
    }

    /// Route as `(latitude, longitude)` pairs in the order they were accepted.
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .map(|s| (s.latitude, s.longitude))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Meters per degree of latitude on the engine's sphere
    const M_PER_DEG_LAT: f64 = super::super::EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

    fn sample_north_of(origin: &GeoSample, meters: f64, timestamp_ms: u64, accuracy_m: f64) -> GeoSample {
        GeoSample::new(
            origin.latitude + meters / M_PER_DEG_LAT,
            origin.longitude,
            timestamp_ms,
            accuracy_m,
            None,
        )
    }

    #[test]
    fn test_first_sample_is_always_accepted() {
        let mut route = RouteState::new();
        let outcome = route.accept(GeoSample::new(51.5, -0.12, 1_000, 250.0, None));

        assert_eq!(outcome, SampleOutcome::Accepted { distance_m: 0.0 });
        assert_eq!(route.samples().len(), 1);
        assert_eq!(route.cumulative_distance_m(), 0.0);
    }

    #[test]
    fn test_jitter_is_rejected() {
        let mut route = RouteState::new();
        let origin = GeoSample::new(51.5, -0.12, 1_000, 50.0, None);
        route.accept(origin);

        // 1 m with 50 m accuracy: threshold is 15 m
        let outcome = route.accept(sample_north_of(&origin, 1.0, 2_000, 50.0));
        assert!(matches!(
            outcome,
            SampleOutcome::Rejected(RejectReason::Jitter { .. })
        ));
        assert_eq!(route.samples().len(), 1);
        assert_eq!(route.cumulative_distance_m(), 0.0);
    }

    #[test]
    fn test_threshold_boundary_is_rejected() {
        assert_eq!(acceptance_threshold_m(5.0), 2.0);
        assert!(!exceeds_jitter_threshold(2.0, 5.0));
        assert!(exceeds_jitter_threshold(2.0 + 1e-9, 5.0));

        let threshold = acceptance_threshold_m(40.0);
        assert!(threshold > 2.0);
        assert!(!exceeds_jitter_threshold(threshold, 40.0));
    }

    #[test]
    fn test_genuine_movement_is_accumulated() {
        let mut route = RouteState::new();
        let origin = GeoSample::new(51.5, -0.12, 1_000, 5.0, None);
        route.accept(origin);

        let outcome = route.accept(sample_north_of(&origin, 10.0, 5_000, 5.0));
        match outcome {
            SampleOutcome::Accepted { distance_m } => assert!((distance_m - 10.0).abs() < 1e-3),
            _ => panic!("Expected accepted sample"),
        }
        assert!((route.cumulative_distance_m() - 10.0).abs() < 1e-3);
        // 10 m in 4 s
        assert!((route.current_speed_mps() - 2.5).abs() < 1e-3);
    }

    #[test]
    fn test_device_speed_is_preferred() {
        let mut route = RouteState::new();
        let origin = GeoSample::new(51.5, -0.12, 1_000, 5.0, None);
        route.accept(origin);

        let mut next = sample_north_of(&origin, 10.0, 5_000, 5.0);
        next.speed_mps = Some(3.1);
        route.accept(next);
        assert_eq!(route.current_speed_mps(), 3.1);
    }

    #[test]
    fn test_duplicate_sample_is_noop() {
        let mut route = RouteState::new();
        let origin = GeoSample::new(51.5, -0.12, 1_000, 5.0, None);
        route.accept(origin);

        let identical = GeoSample { timestamp_ms: 2_000, ..origin };
        assert!(!route.accept(identical).is_accepted());

        let same_time = sample_north_of(&origin, 100.0, 1_000, 5.0);
        assert_eq!(
            route.accept(same_time),
            SampleOutcome::Rejected(RejectReason::Stale)
        );
        assert_eq!(route.samples().len(), 1);
        assert_eq!(route.cumulative_distance_m(), 0.0);
    }

    #[test]
    fn test_malformed_sample_is_noop() {
        let mut route = RouteState::new();
        assert_eq!(
            route.accept(GeoSample::new(f64::NAN, 0.0, 1_000, 5.0, None)),
            SampleOutcome::Rejected(RejectReason::Malformed)
        );
        assert!(route.samples().is_empty());
    }

    #[test]
    fn test_average_speed_guarded_against_zero_elapsed() {
        let mut route = RouteState::new();
        let origin = GeoSample::new(51.5, -0.12, 1_000, 5.0, None);
        route.accept(origin);
        route.accept(sample_north_of(&origin, 100.0, 21_000, 5.0));

        route.update_average_speed(0);
        assert_eq!(route.average_speed_mps(), 0.0);

        route.update_average_speed(20);
        assert!((route.average_speed_mps() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_clear_starts_over() {
        let mut route = RouteState::new();
        let origin = GeoSample::new(51.5, -0.12, 1_000, 5.0, None);
        route.accept(origin);
        route.accept(sample_north_of(&origin, 100.0, 21_000, 5.0));
        route.clear();

        assert!(route.samples().is_empty());
        assert_eq!(route.cumulative_distance_m(), 0.0);
        assert_eq!(route.current_speed_mps(), 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_cumulative_distance_is_monotonic(
            steps in prop::collection::vec((-30.0f64..30.0, -30.0f64..30.0, 1.0f64..60.0, 0u64..3), 1..60),
        ) {
            let mut route = RouteState::new();
            let mut lat = 48.0;
            let mut lon = 11.0;
            let mut timestamp_ms = 0u64;
            let mut previous_total = 0.0;

            for (d_north, d_east, accuracy, dt_s) in steps {
                lat += d_north / M_PER_DEG_LAT;
                lon += d_east / M_PER_DEG_LAT;
                timestamp_ms += dt_s * 1_000;
                let accepted_before = route.samples().len();

                let outcome = route.accept(GeoSample::new(lat, lon, timestamp_ms, accuracy, None));
                let total = route.cumulative_distance_m();

                prop_assert!(total >= previous_total);
                match outcome {
                    SampleOutcome::Accepted { distance_m } => {
                        prop_assert!((total - previous_total - distance_m).abs() < 1e-9);
                        prop_assert_eq!(route.samples().len(), accepted_before + 1);
                    }
                    SampleOutcome::Rejected(_) => {
                        prop_assert_eq!(total, previous_total);
                        prop_assert_eq!(route.samples().len(), accepted_before);
                    }
                }
                previous_total = total;
            }
        }
    }
}
