// Session clock arithmetic. The session calls these from its one-second tick.

use super::{ActivityType, Intensity};

pub const HALFWAY_PCT: u32 = 50;
pub const ALMOST_DONE_PCT: u32 = 85;

/// Calories accrued over one second of activity.
pub fn calories_per_tick(activity: ActivityType, intensity: Intensity) -> f64 {
    activity.calories_per_minute() / 60.0 * intensity.calorie_multiplier()
}

/// Whether moving the clock from `previous_s` to `elapsed_s` crossed `pct`
/// percent of `target_s`.
///
/// Edge triggered: a jump over the threshold still counts, and the check is
/// exact integer arithmetic so it cannot miss because of rounding.
pub fn crossed_threshold(previous_s: u32, elapsed_s: u32, target_s: u32, pct: u32) -> bool {
    let threshold = u64::from(target_s) * u64::from(pct);
    u64::from(previous_s) * 100 < threshold && u64::from(elapsed_s) * 100 >= threshold
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeGoalSignal {
    Halfway,
    AlmostDone,
    Reached,
}

/// Signals produced by a time goal for one clock step.
///
/// Reaching the target supersedes the intermediate announcements.
pub fn evaluate_time_goal(
    previous_s: u32,
    elapsed_s: u32,
    target_s: u32,
    halfway_announced: bool,
    almost_done_announced: bool,
) -> Option<TimeGoalSignal> {
    if elapsed_s >= target_s {
        return Some(TimeGoalSignal::Reached);
    }
    if !almost_done_announced && crossed_threshold(previous_s, elapsed_s, target_s, ALMOST_DONE_PCT) {
        return Some(TimeGoalSignal::AlmostDone);
    }
    if !halfway_announced && crossed_threshold(previous_s, elapsed_s, target_s, HALFWAY_PCT) {
        return Some(TimeGoalSignal::Halfway);
    }
    None
}

/// Percent of a goal done, capped at 100.
pub fn progress_percent(done: u32, target: u32) -> u32 {
    if target == 0 {
        return 100;
    }
    ((u64::from(done) * 100 / u64::from(target)).min(100)) as u32
}
