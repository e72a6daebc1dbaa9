pub mod accumulator;
pub mod pace;
pub mod producer;

use serde::{Deserialize, Serialize};

pub use accumulator::{RejectReason, RouteState, SampleOutcome};
pub use producer::{MockPositionProducer, PermissionState, PositionProducer};

/// Mean Earth radius used for all great-circle distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A position update as delivered by the platform location service.
///
/// Field names follow what location services report. Everything except the
/// coordinates and the timestamp may be missing on some devices.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RawPosition {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Horizontal accuracy radius in meters
    pub accuracy: f64,
    /// Altitude in meters above the WGS84 ellipsoid
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Heading in degrees clockwise from true north
    #[serde(default)]
    pub heading: Option<f64>,
    /// Instantaneous ground speed in m/s
    #[serde(default)]
    pub speed: Option<f64>,
    /// Milliseconds since the unix epoch
    pub timestamp: u64,
}

/// Canonical coordinate record consumed by the tracking engine.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GeoSample {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Milliseconds since the unix epoch
    pub timestamp_ms: u64,
    /// Horizontal accuracy radius in meters
    pub accuracy_m: f64,
    /// Device reported ground speed in m/s
    #[serde(default)]
    pub speed_mps: Option<f64>,
}

impl GeoSample {
    pub fn new(
        latitude: f64,
        longitude: f64,
        timestamp_ms: u64,
        accuracy_m: f64,
        speed_mps: Option<f64>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
            accuracy_m,
            speed_mps,
        }
    }

    /// Great-circle distance to another sample in meters.
    pub fn distance_to(&self, other: &GeoSample) -> f64 {
        haversine_distance_m(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Whether the coordinates describe a point on the globe.
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<&RawPosition> for GeoSample {
    fn from(raw: &RawPosition) -> Self {
        GeoSample {
            latitude: raw.latitude,
            longitude: raw.longitude,
            timestamp_ms: raw.timestamp,
            accuracy_m: raw.accuracy,
            speed_mps: raw.speed,
        }
    }
}

impl From<RawPosition> for GeoSample {
    fn from(raw: RawPosition) -> Self {
        GeoSample::from(&raw)
    }
}

/// A user chosen destination. While one is set, milestones track progress
/// towards it instead of distance intervals.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GoalPin {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub label: Option<String>,
}

impl GoalPin {
    pub fn new(latitude: f64, longitude: f64, label: Option<String>) -> Self {
        Self {
            latitude,
            longitude,
            label,
        }
    }

    pub fn distance_from(&self, sample: &GeoSample) -> f64 {
        haversine_distance_m(sample.latitude, sample.longitude, self.latitude, self.longitude)
    }
}

/// Haversine distance between two points given in decimal degrees, in meters.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push `a` a hair above 1 for antipodal points
    let a = a.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}
