// Speed, pace and distance derivations. Everything here is a pure function of
// its inputs so the session can compute display values on read.

use uom::si::f64::Velocity;
use uom::si::velocity::{kilometer_per_hour, meter_per_second};

use super::GeoSample;

/// Display used when there is no meaningful pace to show
pub const NO_PACE: &str = "--:--";

/// Current speed for a newly accepted sample.
///
/// The device reported speed wins when present and non-negative, otherwise the
/// speed is derived from the distance covered since the previous accepted
/// sample. Without a positive time delta the previous estimate is kept.
pub fn estimate_current_speed(
    previous: &GeoSample,
    candidate: &GeoSample,
    distance_m: f64,
    previous_speed_mps: f64,
) -> f64 {
    if let Some(speed) = candidate.speed_mps.filter(|s| *s >= 0.0) {
        return speed;
    }

    let dt_s = (candidate.timestamp_ms as f64 - previous.timestamp_ms as f64) / 1000.0;
    if dt_s <= 0.0 {
        return previous_speed_mps;
    }
    distance_m / dt_s
}

pub fn speed_kmh(speed_mps: f64) -> f64 {
    Velocity::new::<meter_per_second>(speed_mps).get::<kilometer_per_hour>()
}

/// Speed in km/h with one decimal, e.g. `10.0`.
pub fn format_speed_kmh(speed_mps: f64) -> String {
    format!("{:.1}", speed_kmh(speed_mps.max(0.0)))
}

/// Seconds needed per kilometer, `None` when not moving.
pub fn seconds_per_km(speed_mps: f64) -> Option<f64> {
    if speed_mps.is_finite() && speed_mps > 0.0 {
        Some(1000.0 / speed_mps)
    } else {
        None
    }
}

/// Pace per kilometer as `m:ss`, or [`NO_PACE`] when not moving.
pub fn format_pace(speed_mps: f64) -> String {
    match seconds_per_km(speed_mps) {
        Some(seconds) => {
            let total = seconds.round() as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
        None => NO_PACE.to_string(),
    }
}

/// Whole meters below one kilometer, kilometers with two decimals above.
pub fn format_distance(distance_m: f64) -> String {
    let distance_m = distance_m.max(0.0);
    if distance_m < 1000.0 {
        format!("{} m", distance_m.floor() as u64)
    } else {
        format!("{:.2} km", distance_m / 1000.0)
    }
}

/// Label for a milestone boundary, e.g. `500 m`, `1 km` or `2.5 km`.
pub fn format_milestone_distance(boundary_m: u64) -> String {
    if boundary_m >= 1000 {
        let km = format!("{:.2}", boundary_m as f64 / 1000.0);
        let km = km.trim_end_matches('0').trim_end_matches('.');
        format!("{km} km")
    } else {
        format!("{boundary_m} m")
    }
}

/// Elapsed time as `mm:ss`, switching to `h:mm:ss` past the hour.
pub fn format_elapsed(elapsed_seconds: u32) -> String {
    let hours = elapsed_seconds / 3600;
    let minutes = (elapsed_seconds % 3600) / 60;
    let seconds = elapsed_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_kmh_pace_and_speed() {
        let speed = 10.0 / 3.6;
        assert_eq!(format_pace(speed), "6:00");
        assert_eq!(format_speed_kmh(speed), "10.0");
    }

    #[test]
    fn test_pace_no_data() {
        assert_eq!(format_pace(0.0), NO_PACE);
        assert_eq!(format_pace(-1.0), NO_PACE);
        assert_eq!(format_pace(f64::NAN), NO_PACE);
    }

    #[test]
    fn test_pace_zero_padding() {
        // 1000 / 3.0 = 333.3 s = 5:33
        assert_eq!(format_pace(3.0), "5:33");
        // 1000 / 4.0 = 250 s = 4:10
        assert_eq!(format_pace(4.0), "4:10");
        // 1000 / 1.6 = 625 s = 10:25
        assert_eq!(format_pace(1.6), "10:25");
    }

    #[test]
    fn test_distance_display() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(999.9), "999 m");
        assert_eq!(format_distance(1000.0), "1.00 km");
        assert_eq!(format_distance(12_346.0), "12.35 km");
    }

    #[test]
    fn test_milestone_labels() {
        assert_eq!(format_milestone_distance(250), "250 m");
        assert_eq!(format_milestone_distance(1000), "1 km");
        assert_eq!(format_milestone_distance(2500), "2.5 km");
        assert_eq!(format_milestone_distance(1250), "1.25 km");
    }

    #[test]
    fn test_elapsed_display() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(75), "01:15");
        assert_eq!(format_elapsed(3_725), "1:02:05");
    }

    #[test]
    fn test_estimate_from_distance_and_time() {
        let previous = GeoSample::new(0.0, 0.0, 10_000, 5.0, None);
        let candidate = GeoSample::new(0.0, 0.001, 14_000, 5.0, None);
        assert_eq!(estimate_current_speed(&previous, &candidate, 20.0, 1.0), 5.0);
    }

    #[test]
    fn test_estimate_keeps_previous_without_time_delta() {
        let previous = GeoSample::new(0.0, 0.0, 10_000, 5.0, None);
        let candidate = GeoSample::new(0.0, 0.001, 10_000, 5.0, None);
        assert_eq!(estimate_current_speed(&previous, &candidate, 20.0, 1.7), 1.7);
    }

    #[test]
    fn test_negative_device_speed_is_ignored() {
        let previous = GeoSample::new(0.0, 0.0, 10_000, 5.0, None);
        let candidate = GeoSample::new(0.0, 0.001, 12_000, 5.0, Some(-1.0));
        assert_eq!(estimate_current_speed(&previous, &candidate, 20.0, 0.0), 10.0);
    }
}
