use std::collections::HashSet;
use std::path::Path;

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::PacekeeperError;

use super::{GeoSample, RawPosition};

/// Location permission as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    /// The user has not decided yet; subscribing triggers the platform prompt
    Prompt,
}

/// A source of position fixes.
///
/// This trait abstracts the platform location service so a session can be fed
/// from a live device, a recording or programmatically generated samples.
///
/// # Lifecycle
///
/// 1. Read `permission()` before subscribing; a denied permission means the
///    session runs without positional tracking
/// 2. Call `subscribe()` to start receiving fixes (at most one subscription)
/// 3. Call `next_position()` repeatedly; `Ok(None)` means no new fix yet
/// 4. Call `unsubscribe()` on pause or when the session ends
pub trait PositionProducer {
    fn permission(&self) -> PermissionState;

    /// Start delivering fixes.
    ///
    /// # Errors
    ///
    /// Returns an error if permission is denied or the location service is unavailable.
    fn subscribe(&mut self) -> Result<(), PacekeeperError>;

    /// Stop delivering fixes. Calling this while unsubscribed is a no-op.
    fn unsubscribe(&mut self);

    fn is_subscribed(&self) -> bool;

    /// Get the next fix, in the order the device produced them.
    ///
    /// # Errors
    ///
    /// Returns `PositionTimeout` when the device failed to produce a fix in
    /// time (transient), `PositionUnavailable` when the source is gone for good
    /// and `PositionNotSubscribed` when called before `subscribe()`.
    fn next_position(&mut self) -> Result<Option<GeoSample>, PacekeeperError>;
}

/// A position producer replaying recorded or generated samples.
///
/// Every call to `next_position` while subscribed yields the next sample, and
/// `Ok(None)` once the recording is exhausted. Timeouts can be scripted at
/// given positions of the recording to exercise recovery.
pub struct MockPositionProducer {
    cursor: usize,
    samples: Vec<GeoSample>,
    subscribed: bool,
    timeouts_at: HashSet<usize>,
    outage_at: Option<usize>,
    pub permission: PermissionState,
    /// Number of successful `subscribe()` calls
    pub subscribe_count: usize,
}

impl Default for MockPositionProducer {
    fn default() -> Self {
        Self {
            cursor: 0,
            samples: Vec::new(),
            subscribed: false,
            timeouts_at: HashSet::new(),
            outage_at: None,
            permission: PermissionState::Granted,
            subscribe_count: 0,
        }
    }
}

impl MockPositionProducer {
    pub fn from_samples(samples: Vec<GeoSample>) -> Self {
        Self {
            samples,
            ..Self::default()
        }
    }

    /// Load raw device positions from a JSON Lines file, one `RawPosition` per line.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or a line is not a valid position.
    pub fn from_file(file: impl AsRef<Path>) -> Result<Self, PacekeeperError> {
        Ok(Self::from_samples(read_positions(file)?))
    }

    /// Make the fetch at recording position `index` time out once.
    pub fn with_timeout_at(mut self, index: usize) -> Self {
        self.timeouts_at.insert(index);
        self
    }

    /// Make the source disappear for good once recording position `index` is reached.
    pub fn with_outage_at(mut self, index: usize) -> Self {
        self.outage_at = Some(index);
        self
    }

    pub fn with_permission(mut self, permission: PermissionState) -> Self {
        self.permission = permission;
        self
    }

    pub fn remaining(&self) -> usize {
        self.samples.len().saturating_sub(self.cursor)
    }
}

impl PositionProducer for MockPositionProducer {
    fn permission(&self) -> PermissionState {
        self.permission
    }

    fn subscribe(&mut self) -> Result<(), PacekeeperError> {
        if self.permission == PermissionState::Denied {
            return Err(PacekeeperError::PositionPermissionDenied);
        }
        // answering the prompt is simulated as a grant
        self.permission = PermissionState::Granted;
        self.subscribed = true;
        self.subscribe_count += 1;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    fn next_position(&mut self) -> Result<Option<GeoSample>, PacekeeperError> {
        if !self.subscribed {
            return Err(PacekeeperError::PositionNotSubscribed);
        }
        if self.outage_at.is_some_and(|index| self.cursor >= index) {
            return Err(PacekeeperError::PositionUnavailable {
                description: "location service stopped".to_string(),
            });
        }
        if self.timeouts_at.remove(&self.cursor) {
            debug!("Mock producer timing out at sample #{}", self.cursor);
            return Err(PacekeeperError::PositionTimeout);
        }

        let sample = self.samples.get(self.cursor).copied();
        if sample.is_some() {
            self.cursor += 1;
        }
        Ok(sample)
    }
}

/// Read a recording of raw device positions and normalize every line.
pub fn read_positions(file: impl AsRef<Path>) -> Result<Vec<GeoSample>, PacekeeperError> {
    let path = file.as_ref();
    let lines = serde_jsonlines::json_lines::<RawPosition, _>(path).map_err(|e| {
        PacekeeperError::SampleFileError {
            path: path.display().to_string(),
            source: e,
        }
    })?;

    let mut samples = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let raw = line.map_err(|e| {
            error!("Could not parse position on line {}: {}", line_no + 1, e);
            PacekeeperError::SampleParseError {
                description: format!("line {}: {}", line_no + 1, e),
            }
        })?;
        samples.push(GeoSample::from(&raw));
    }
    Ok(samples)
}

/// Write samples as raw device positions, the format `read_positions` loads.
pub fn write_positions(
    file: impl AsRef<Path>,
    samples: &[GeoSample],
) -> Result<(), PacekeeperError> {
    let path = file.as_ref();
    let raw = samples.iter().map(|s| RawPosition {
        latitude: s.latitude,
        longitude: s.longitude,
        accuracy: s.accuracy_m,
        speed: s.speed_mps,
        timestamp: s.timestamp_ms,
        ..RawPosition::default()
    });
    serde_jsonlines::write_json_lines(path, raw)
        .map_err(|e| PacekeeperError::WriterError { source: e })
}
