// Milestone detection. The detectors only observe: they return what crossed
// and the session applies counters and markers.

use log::debug;

use crate::tracking::{GeoSample, GoalPin, pace};

/// Distance to the pin under which the goal counts as reached
pub const GOAL_REACHED_RADIUS_M: f64 = 50.0;
/// Width of a goal progress bucket in percent
pub const GOAL_PROGRESS_BUCKET_PCT: u32 = 25;

#[derive(Clone, Debug, PartialEq)]
pub struct DistanceMilestone {
    pub index: u32,
    pub boundary_m: u64,
    pub label: String,
}

/// Check whether the route crossed a new distance interval.
///
/// Crossing several boundaries with one sample still yields a single
/// milestone for the highest boundary.
pub fn distance_milestone(
    cumulative_distance_m: f64,
    interval_m: u32,
    last_index: u32,
) -> Option<DistanceMilestone> {
    if interval_m == 0 || cumulative_distance_m <= 0.0 {
        return None;
    }

    let index = (cumulative_distance_m / f64::from(interval_m)).floor() as u32;
    if index <= last_index {
        return None;
    }

    let boundary_m = u64::from(index) * u64::from(interval_m);
    Some(DistanceMilestone {
        index,
        boundary_m,
        label: pace::format_milestone_distance(boundary_m),
    })
}

/// Whether a time based auto milestone is due.
pub fn auto_milestone_due(elapsed_seconds: u32, last_at_seconds: u32, interval_seconds: u32) -> bool {
    interval_seconds > 0 && elapsed_seconds.saturating_sub(last_at_seconds) >= interval_seconds
}

/// Whole percent of the way from the starting distance to the goal.
pub fn goal_progress_percent(initial_distance_m: f64, distance_to_goal_m: f64) -> u32 {
    if initial_distance_m <= 0.0 {
        // started on top of the goal
        return 100;
    }
    let progress = ((initial_distance_m - distance_to_goal_m) / initial_distance_m).max(0.0);
    (progress * 100.0).floor() as u32
}

/// The new quartile if `percent` moved into a higher bucket than `last_quartile`.
pub fn goal_quartile_crossing(percent: u32, last_quartile: u32) -> Option<u32> {
    let quartile = percent / GOAL_PROGRESS_BUCKET_PCT;
    (percent > 0 && quartile > last_quartile).then_some(quartile)
}

#[derive(Clone, Debug, PartialEq)]
pub struct GoalProgress {
    pub percent: u32,
    pub quartile: u32,
    pub remaining_m: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GoalObservation {
    pub progress: Option<GoalProgress>,
    /// Set once per pin, the first time the athlete gets within reach
    pub reached: bool,
}

/// Tracks progress towards a [`GoalPin`].
#[derive(Clone, Debug, PartialEq)]
pub struct GoalTracker {
    pin: GoalPin,
    initial_distance_m: Option<f64>,
    last_distance_m: Option<f64>,
    reached: bool,
}

impl GoalTracker {
    pub fn new(pin: GoalPin) -> Self {
        Self {
            pin,
            initial_distance_m: None,
            last_distance_m: None,
            reached: false,
        }
    }

    pub fn pin(&self) -> &GoalPin {
        &self.pin
    }

    pub fn initial_distance_m(&self) -> Option<f64> {
        self.initial_distance_m
    }

    /// Distance to the pin at the latest observed sample.
    pub fn distance_to_goal_m(&self) -> Option<f64> {
        self.last_distance_m
    }

    pub fn is_reached(&self) -> bool {
        self.reached
    }

    /// Forget the starting point, the next sample becomes the new baseline.
    pub fn restart(&mut self) {
        self.initial_distance_m = None;
        self.last_distance_m = None;
        self.reached = false;
    }

    pub fn observe(&mut self, sample: &GeoSample, last_quartile: u32) -> GoalObservation {
        let distance_m = self.pin.distance_from(sample);
        self.last_distance_m = Some(distance_m);

        let initial_m = *self.initial_distance_m.get_or_insert_with(|| {
            debug!("Goal baseline set at {:.0} m from the pin", distance_m);
            distance_m
        });

        let percent = goal_progress_percent(initial_m, distance_m);
        let progress = goal_quartile_crossing(percent, last_quartile).map(|quartile| GoalProgress {
            percent,
            quartile,
            remaining_m: distance_m,
        });

        let reached = !self.reached && distance_m < GOAL_REACHED_RADIUS_M;
        if reached {
            self.reached = true;
        }

        GoalObservation { progress, reached }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::EARTH_RADIUS_M;
    use proptest::prelude::*;

    const M_PER_DEG_LAT: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

    #[test]
    fn test_first_interval_fires_once() {
        assert_eq!(distance_milestone(999.0, 1000, 0), None);

        let milestone = distance_milestone(1000.5, 1000, 0).unwrap();
        assert_eq!(milestone.index, 1);
        assert_eq!(milestone.label, "1 km");

        assert_eq!(distance_milestone(1500.0, 1000, 1), None);
    }

    #[test]
    fn test_jumping_several_intervals_fires_one_milestone() {
        let milestone = distance_milestone(780.0, 250, 0).unwrap();
        assert_eq!(milestone.index, 3);
        assert_eq!(milestone.boundary_m, 750);
        assert_eq!(milestone.label, "750 m");
    }

    #[test]
    fn test_no_milestone_without_distance() {
        assert_eq!(distance_milestone(0.0, 250, 0), None);
        assert_eq!(distance_milestone(100.0, 0, 0), None);
    }

    #[test]
    fn test_auto_milestone_due() {
        assert!(!auto_milestone_due(59, 0, 60));
        assert!(auto_milestone_due(60, 0, 60));
        assert!(!auto_milestone_due(100, 60, 60));
        assert!(auto_milestone_due(120, 60, 60));
        assert!(!auto_milestone_due(120, 60, 0));
    }

    #[test]
    fn test_goal_quartile_sequence() {
        let mut last_quartile = 0;
        let mut fired = Vec::new();

        for percent in [10, 26, 51, 76, 100] {
            if let Some(quartile) = goal_quartile_crossing(percent, last_quartile) {
                last_quartile = quartile;
                fired.push(percent);
            }
        }

        assert_eq!(fired, vec![26, 51, 76, 100]);
    }

    #[test]
    fn test_goal_progress_never_negative() {
        assert_eq!(goal_progress_percent(1000.0, 1200.0), 0);
        assert_eq!(goal_progress_percent(1000.0, 490.0), 51);
        assert_eq!(goal_progress_percent(1000.0, 0.0), 100);
        assert_eq!(goal_progress_percent(0.0, 0.0), 100);
    }

    #[test]
    fn test_goal_tracker_walks_to_pin() {
        let pin = GoalPin::new(40.0, -3.0, Some("Fountain".to_string()));
        let mut tracker = GoalTracker::new(pin);
        let at = |meters_south: f64, t: u64| {
            GeoSample::new(40.0 - meters_south / M_PER_DEG_LAT, -3.0, t, 5.0, None)
        };

        // baseline 1000 m away, then 90%, 74%, 49%, 24%, 0% remaining
        let mut last_quartile = 0;
        let mut progress_events = 0;
        let mut reached_events = 0;
        for (i, meters) in [1000.0, 900.0, 740.0, 490.0, 240.0, 0.0].into_iter().enumerate() {
            let observation = tracker.observe(&at(meters, i as u64 * 1000), last_quartile);
            if let Some(progress) = observation.progress {
                last_quartile = progress.quartile;
                progress_events += 1;
            }
            if observation.reached {
                reached_events += 1;
            }
        }

        assert_eq!(progress_events, 4);
        assert_eq!(reached_events, 1);
        assert!(tracker.is_reached());
        assert!((tracker.initial_distance_m().unwrap() - 1000.0).abs() < 1e-6);

        // hanging around the pin does not fire again
        let observation = tracker.observe(&at(10.0, 10_000), last_quartile);
        assert!(!observation.reached);
        assert!(observation.progress.is_none());
    }

    #[test]
    fn test_goal_tracker_restart_takes_new_baseline() {
        let pin = GoalPin::new(40.0, -3.0, None);
        let mut tracker = GoalTracker::new(pin);
        tracker.observe(&GeoSample::new(39.99, -3.0, 0, 5.0, None), 0);
        tracker.restart();

        assert_eq!(tracker.initial_distance_m(), None);
        tracker.observe(&GeoSample::new(39.98, -3.0, 1_000, 5.0, None), 0);
        assert!(tracker.initial_distance_m().unwrap() > 2000.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_one_milestone_per_boundary(
            increments in prop::collection::vec(0.0f64..40.0, 1..200),
            interval in prop::sample::select(vec![250u32, 500, 1000, 2000]),
        ) {
            let mut distance = 0.0;
            let mut last_index = 0;
            let mut fired = 0u32;

            for increment in increments {
                distance += increment;
                if let Some(milestone) = distance_milestone(distance, interval, last_index) {
                    prop_assert!(milestone.index > last_index);
                    last_index = milestone.index;
                    fired += 1;
                }
            }

            // steps are shorter than any interval, so every boundary fires exactly once
            let expected = (distance / f64::from(interval)).floor() as u32;
            prop_assert_eq!(fired, expected);
            prop_assert_eq!(last_index, expected);
        }
    }
}
