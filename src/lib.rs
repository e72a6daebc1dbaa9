// Library interface for pacekeeper
// The binary and the integration tests both go through these modules

pub mod coaching;
pub mod errors;
pub mod live;
pub mod presets;
pub mod tracking;
pub mod workout;
pub mod writer;

// Re-export commonly used types
pub use coaching::{CoachingCategory, CoachingDispatcher};
pub use errors::PacekeeperError;
pub use tracking::{GeoSample, GoalPin, RouteState};
pub use workout::{SessionConfig, WorkoutEvent, WorkoutSession, WorkoutSummary};
