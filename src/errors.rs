// Error types for pacekeeper

use snafu::Snafu;
use std::io;

use crate::workout::Phase;

#[derive(Debug, Snafu)]
pub enum PacekeeperError {
    // Session state machine errors
    #[snafu(display("Cannot {action} a session that is {phase}"))]
    InvalidTransition { action: String, phase: Phase },
    #[snafu(display("Invalid session configuration: {field} - {reason}"))]
    InvalidSessionConfig { field: String, reason: String },

    // Errors for the position source
    #[snafu(display("Location permission denied"))]
    PositionPermissionDenied,
    #[snafu(display("Position source unavailable: {description}"))]
    PositionUnavailable { description: String },
    #[snafu(display("Timeout waiting for a position fix"))]
    PositionTimeout,
    #[snafu(display("Position source is not subscribed, call subscribe() first"))]
    PositionNotSubscribed,

    // Errors while reading recorded samples
    #[snafu(display("Unable to read sample file: {path}"))]
    SampleFileError { path: String, source: io::Error },
    #[snafu(display("Invalid sample record: {description}"))]
    SampleParseError { description: String },

    // Errors for the summary writer
    #[snafu(display("Error writing workout summary"))]
    WriterError { source: io::Error },
    #[snafu(display("Workout summary rejected: {reason}"))]
    SummaryRejected { reason: String },

    // Runtime errors
    #[snafu(display("Unable to start the session runtime"))]
    RuntimeError { source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Preset store errors
    #[snafu(display("Preset storage error: {reason}"))]
    PresetStorageError { reason: String },
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },
}
