pub mod clock;
pub mod milestones;
pub mod replay;
pub mod session;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PacekeeperError;
use crate::coaching::CoachingCategory;
use crate::tracking::pace;

pub use replay::replay_samples;
pub use session::{TrackingStatus, WorkoutSession};

/// Kind of workout being tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Running,
    Walking,
    Cycling,
    Hiking,
    Swimming,
    Yoga,
    Strength,
    Hiit,
    Other,
}

impl ActivityType {
    /// Calories burned per minute at moderate intensity.
    pub fn calories_per_minute(&self) -> f64 {
        match self {
            ActivityType::Running => 11.0,
            ActivityType::Walking => 4.5,
            ActivityType::Cycling => 8.5,
            ActivityType::Hiking => 7.0,
            ActivityType::Swimming => 9.5,
            ActivityType::Yoga => 3.5,
            ActivityType::Strength => 6.0,
            ActivityType::Hiit => 12.5,
            ActivityType::Other => 5.0,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityType::Running => write!(f, "Running"),
            ActivityType::Walking => write!(f, "Walking"),
            ActivityType::Cycling => write!(f, "Cycling"),
            ActivityType::Hiking => write!(f, "Hiking"),
            ActivityType::Swimming => write!(f, "Swimming"),
            ActivityType::Yoga => write!(f, "Yoga"),
            ActivityType::Strength => write!(f, "Strength"),
            ActivityType::Hiit => write!(f, "HIIT"),
            ActivityType::Other => write!(f, "Other"),
        }
    }
}

impl FromStr for ActivityType {
    type Err = PacekeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "running" | "run" => Ok(ActivityType::Running),
            "walking" | "walk" => Ok(ActivityType::Walking),
            "cycling" | "bike" | "ride" => Ok(ActivityType::Cycling),
            "hiking" | "hike" => Ok(ActivityType::Hiking),
            "swimming" | "swim" => Ok(ActivityType::Swimming),
            "yoga" => Ok(ActivityType::Yoga),
            "strength" => Ok(ActivityType::Strength),
            "hiit" => Ok(ActivityType::Hiit),
            "other" => Ok(ActivityType::Other),
            _ => Err(PacekeeperError::InvalidUserInput {
                field: "activity".to_string(),
                reason: format!("unknown activity '{s}'"),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intensity {
    Easy,
    Moderate,
    Intense,
}

impl Intensity {
    pub fn calorie_multiplier(&self) -> f64 {
        match self {
            Intensity::Easy => 0.8,
            Intensity::Moderate => 1.0,
            Intensity::Intense => 1.2,
        }
    }
}

impl FromStr for Intensity {
    type Err = PacekeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Intensity::Easy),
            "moderate" => Ok(Intensity::Moderate),
            "intense" => Ok(Intensity::Intense),
            _ => Err(PacekeeperError::InvalidUserInput {
                field: "intensity".to_string(),
                reason: format!("unknown intensity '{s}'"),
            }),
        }
    }
}

/// When a session completes on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalType {
    /// Runs until the athlete stops it
    Free,
    TimeBound { target_seconds: u32 },
    MilestoneBound { target_count: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MilestoneMode {
    /// Only checkpoints and position based milestones
    Manual,
    /// Additionally a milestone every `interval_seconds` of active time
    Auto { interval_seconds: u32 },
}

/// Distance milestone intervals offered to the athlete
pub const DISTANCE_MILESTONE_INTERVALS_M: [u32; 4] = [250, 500, 1000, 2000];
pub const DEFAULT_DISTANCE_MILESTONE_INTERVAL_M: u32 = 1000;

/// Settings chosen before a session starts. Fixed once the session is active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub activity: ActivityType,
    pub goal: GoalType,
    pub milestone_mode: MilestoneMode,
    pub intensity: Intensity,
    pub distance_milestone_interval_m: u32,
    /// Whether the position source is used at all
    pub track_position: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            activity: ActivityType::Running,
            goal: GoalType::Free,
            milestone_mode: MilestoneMode::Manual,
            intensity: Intensity::Moderate,
            distance_milestone_interval_m: DEFAULT_DISTANCE_MILESTONE_INTERVAL_M,
            track_position: true,
        }
    }
}

impl SessionConfig {
    /// # Errors
    ///
    /// Returns `InvalidSessionConfig` for zero targets or intervals.
    pub fn validate(&self) -> Result<(), PacekeeperError> {
        let invalid = |field: &str, reason: &str| PacekeeperError::InvalidSessionConfig {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.distance_milestone_interval_m == 0 {
            return Err(invalid(
                "distance_milestone_interval_m",
                "interval must be greater than zero",
            ));
        }
        match self.goal {
            GoalType::TimeBound { target_seconds: 0 } => {
                return Err(invalid("goal", "time goal must be at least one second"));
            }
            GoalType::MilestoneBound { target_count: 0 } => {
                return Err(invalid("goal", "milestone goal must be at least one"));
            }
            _ => {}
        }
        if let MilestoneMode::Auto { interval_seconds: 0 } = self.milestone_mode {
            return Err(invalid(
                "milestone_mode",
                "auto milestone interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Configuring,
    Active,
    Paused,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Configuring => write!(f, "configuring"),
            Phase::Active => write!(f, "active"),
            Phase::Paused => write!(f, "paused"),
            Phase::Completed => write!(f, "completed"),
        }
    }
}

/// Mutable session counters, owned by [`WorkoutSession`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: Phase,
    pub elapsed_seconds: u32,
    pub milestone_count: u32,
    pub calories: f64,
    pub streak_count: u32,
    pub last_coaching_at_seconds: u32,
    pub last_auto_milestone_at_seconds: u32,
    pub last_distance_milestone_index: u32,
    pub last_goal_progress_quartile: u32,
    pub halfway_announced: bool,
    pub almost_done_announced: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Configuring,
            elapsed_seconds: 0,
            milestone_count: 0,
            calories: 0.,
            streak_count: 0,
            last_coaching_at_seconds: 0,
            last_auto_milestone_at_seconds: 0,
            last_distance_milestone_index: 0,
            last_goal_progress_quartile: 0,
            halfway_announced: false,
            almost_done_announced: false,
        }
    }
}

impl SessionState {
    /// Zero every counter while keeping the phase.
    pub fn clear_counters(&mut self) {
        *self = Self {
            phase: self.phase,
            ..Self::default()
        };
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionReason {
    TimeGoal,
    MilestoneGoal,
    Stopped,
    Finished,
}

/// Something notable that happened while handling a tick, sample or command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WorkoutEvent {
    Started,
    DistanceMilestone { index: u32, label: String },
    GoalProgress { percent: u32, remaining_m: f64 },
    GoalReached { label: Option<String> },
    AutoMilestone { elapsed_seconds: u32 },
    ManualMilestone { count: u32 },
    Halfway,
    AlmostDone,
    Encouragement,
    TrackingDegraded { reason: String },
    Completed { reason: CompletionReason },
    /// Stopped too early to count, nothing was reported
    Discarded { elapsed_seconds: u32 },
}

impl WorkoutEvent {
    /// Coaching rendered for this event, if any.
    pub fn coaching_category(&self) -> Option<CoachingCategory> {
        match self {
            WorkoutEvent::Started => Some(CoachingCategory::Start),
            WorkoutEvent::DistanceMilestone { .. }
            | WorkoutEvent::GoalProgress { .. }
            | WorkoutEvent::ManualMilestone { .. } => Some(CoachingCategory::Milestone),
            WorkoutEvent::GoalReached { .. } => Some(CoachingCategory::GoalReached),
            WorkoutEvent::AutoMilestone { .. } => Some(CoachingCategory::AutoMilestone),
            WorkoutEvent::Halfway => Some(CoachingCategory::Halfway),
            WorkoutEvent::AlmostDone => Some(CoachingCategory::AlmostDone),
            WorkoutEvent::Encouragement => Some(CoachingCategory::Encouragement),
            WorkoutEvent::TrackingDegraded { .. } => Some(CoachingCategory::Advisory),
            WorkoutEvent::Completed { .. } => Some(CoachingCategory::Complete),
            WorkoutEvent::Discarded { .. } => None,
        }
    }

    /// Whether the event increments the milestone and streak counters.
    pub fn is_milestone(&self) -> bool {
        matches!(
            self,
            WorkoutEvent::DistanceMilestone { .. }
                | WorkoutEvent::GoalProgress { .. }
                | WorkoutEvent::AutoMilestone { .. }
                | WorkoutEvent::ManualMilestone { .. }
        )
    }

    /// Text shown in front of the coaching message.
    pub fn coaching_detail(&self) -> Option<String> {
        match self {
            WorkoutEvent::DistanceMilestone { label, .. } => Some(label.clone()),
            WorkoutEvent::GoalProgress {
                percent,
                remaining_m,
            } => Some(format!(
                "{percent}% of the way, {} to go",
                pace::format_distance(*remaining_m)
            )),
            WorkoutEvent::GoalReached { label: Some(label) } => Some(label.clone()),
            WorkoutEvent::ManualMilestone { count } => Some(format!("Checkpoint {count}")),
            _ => None,
        }
    }
}

/// Route related part of a summary, present when position tracking was on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub total_distance_m: f64,
    pub average_speed_mps: f64,
    /// Seconds per kilometer, `None` when no distance was covered
    pub average_pace_s_per_km: Option<f64>,
    /// `(latitude, longitude)` pairs in the order they were recorded
    pub route: Vec<(f64, f64)>,
}

/// Final record of a completed session. Created once, never modified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub activity: ActivityType,
    pub intensity: Intensity,
    pub duration_seconds: u32,
    pub milestone_count: u32,
    pub calories: f64,
    pub completion: CompletionReason,
    pub route: Option<RouteSummary>,
}

/// Receives the summary of every completed session.
pub trait SummarySink: Send {
    /// # Errors
    ///
    /// Failures are reported back but never retried by the session.
    fn submit(&mut self, summary: &WorkoutSummary) -> Result<(), PacekeeperError>;
}

/// Display-ready view of a session, derived on every read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub elapsed_seconds: u32,
    pub elapsed_display: String,
    pub distance_m: f64,
    pub distance_display: String,
    pub current_speed_kmh: String,
    pub average_speed_kmh: String,
    pub current_pace: String,
    pub average_pace: String,
    pub calories: f64,
    pub milestone_count: u32,
    pub streak_count: u32,
    /// Progress towards a time or milestone goal, 0 to 100
    pub goal_progress_percent: Option<u32>,
    pub distance_to_goal_m: Option<f64>,
    /// Text of the last coaching message, for the banner area
    pub coaching_text: Option<String>,
}
