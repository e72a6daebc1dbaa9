use log::{debug, error, info, warn};

use crate::PacekeeperError;
use crate::coaching::{CoachingCue, CoachingDispatcher, encouragement_due};
use crate::tracking::{GeoSample, GoalPin, RouteState, SampleOutcome, pace};

use super::clock::{self, TimeGoalSignal};
use super::milestones::{self, GoalTracker};
use super::{
    CompletionReason, GoalType, MilestoneMode, Phase, RouteSummary, SessionConfig,
    SessionSnapshot, SessionState, SummarySink, WorkoutEvent, WorkoutSummary,
};

/// Sessions stopped before this many seconds are discarded without a summary
pub const MIN_REPORTED_SECONDS: u32 = 30;

/// Whether positions feed the session.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackingStatus {
    /// The athlete chose not to track position
    Disabled,
    Enabled,
    /// Position was wanted but the source is unusable
    Degraded { reason: String },
}

/// The workout session controller.
///
/// Owns the session and route state and is the only place either is mutated.
/// Input arrives through discrete handlers: [`WorkoutSession::on_tick`] once
/// per second of active time, [`WorkoutSession::on_sample`] for every position
/// fix and the lifecycle commands. Each handler returns the events it caused,
/// after rendering their coaching.
///
/// ```text
/// Configuring --start--> Active <--pause/resume--> Paused
///      ^                   |                          |
///      +---stop (<30 s)----+----goal / stop / finish--+--> Completed
/// ```
pub struct WorkoutSession {
    config: SessionConfig,
    state: SessionState,
    route: RouteState,
    goal: Option<GoalTracker>,
    tracking: TrackingStatus,
    dispatcher: CoachingDispatcher,
    summary_sink: Box<dyn SummarySink>,
    summary: Option<WorkoutSummary>,
    last_cue: Option<CoachingCue>,
}

impl WorkoutSession {
    pub fn new(dispatcher: CoachingDispatcher, summary_sink: Box<dyn SummarySink>) -> Self {
        Self {
            config: SessionConfig::default(),
            state: SessionState::default(),
            route: RouteState::new(),
            goal: None,
            tracking: TrackingStatus::Disabled,
            dispatcher,
            summary_sink,
            summary: None,
            last_cue: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn route(&self) -> &RouteState {
        &self.route
    }

    pub fn goal_pin(&self) -> Option<&GoalPin> {
        self.goal.as_ref().map(GoalTracker::pin)
    }

    pub fn tracking(&self) -> &TrackingStatus {
        &self.tracking
    }

    /// The most recent coaching message rendered.
    pub fn last_cue(&self) -> Option<&CoachingCue> {
        self.last_cue.as_ref()
    }

    /// The summary handed to the sink, once the session completed.
    pub fn summary(&self) -> Option<&WorkoutSummary> {
        self.summary.as_ref()
    }

    /// Whether the position source should currently be subscribed.
    pub fn wants_positions(&self) -> bool {
        self.state.phase == Phase::Active && self.tracking == TrackingStatus::Enabled
    }

    pub fn audio_enabled(&self) -> bool {
        self.dispatcher.audio_enabled()
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.dispatcher.set_audio_enabled(enabled);
    }

    /// Fix the configuration and begin a fresh session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless configuring and
    /// `InvalidSessionConfig` when the configuration is unusable.
    pub fn start(&mut self, config: SessionConfig) -> Result<Vec<WorkoutEvent>, PacekeeperError> {
        self.ensure_phase("start", &[Phase::Configuring])?;
        config.validate()?;

        info!(
            "Starting {} session: {:?}, {:?}, {:?}",
            config.activity, config.goal, config.milestone_mode, config.intensity
        );
        self.tracking = if config.track_position {
            TrackingStatus::Enabled
        } else {
            TrackingStatus::Disabled
        };
        self.config = config;
        self.state = SessionState {
            phase: Phase::Active,
            ..SessionState::default()
        };
        self.route.clear();
        if let Some(goal) = self.goal.as_mut() {
            goal.restart();
        }

        let mut events = Vec::new();
        self.emit(WorkoutEvent::Started, &mut events);
        Ok(events)
    }

    /// # Errors
    ///
    /// Returns `InvalidTransition` unless active.
    pub fn pause(&mut self) -> Result<(), PacekeeperError> {
        self.ensure_phase("pause", &[Phase::Active])?;
        info!("Session paused at {}s", self.state.elapsed_seconds);
        self.state.phase = Phase::Paused;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InvalidTransition` unless paused.
    pub fn resume(&mut self) -> Result<(), PacekeeperError> {
        self.ensure_phase("resume", &[Phase::Paused])?;
        info!("Session resumed at {}s", self.state.elapsed_seconds);
        self.state.phase = Phase::Active;
        Ok(())
    }

    /// Stop the session. Short sessions go back to configuring unreported,
    /// anything longer completes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless active or paused.
    pub fn stop(&mut self) -> Result<Vec<WorkoutEvent>, PacekeeperError> {
        self.ensure_phase("stop", &[Phase::Active, Phase::Paused])?;

        let mut events = Vec::new();
        let elapsed_seconds = self.state.elapsed_seconds;
        if elapsed_seconds < MIN_REPORTED_SECONDS {
            info!("Discarding session stopped after {}s", elapsed_seconds);
            self.state = SessionState::default();
            self.route.clear();
            if let Some(goal) = self.goal.as_mut() {
                goal.restart();
            }
            self.dispatcher.silence();
            events.push(WorkoutEvent::Discarded { elapsed_seconds });
        } else {
            self.complete(CompletionReason::Stopped, &mut events);
        }
        Ok(events)
    }

    /// Complete the session now, whatever its length.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless active or paused.
    pub fn finish(&mut self) -> Result<Vec<WorkoutEvent>, PacekeeperError> {
        self.ensure_phase("finish", &[Phase::Active, Phase::Paused])?;
        let mut events = Vec::new();
        self.complete(CompletionReason::Finished, &mut events);
        Ok(events)
    }

    /// Clear every counter and the route while staying in the current phase.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless active or paused.
    pub fn reset(&mut self) -> Result<(), PacekeeperError> {
        self.ensure_phase("reset", &[Phase::Active, Phase::Paused])?;
        info!("Session counters reset");
        self.state.clear_counters();
        self.route.clear();
        if let Some(goal) = self.goal.as_mut() {
            goal.restart();
        }
        Ok(())
    }

    /// Set or clear the goal pin. Progress is measured from the next accepted sample.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` once completed.
    pub fn set_goal_pin(&mut self, pin: Option<GoalPin>) -> Result<(), PacekeeperError> {
        self.ensure_phase(
            "set a goal pin on",
            &[Phase::Configuring, Phase::Active, Phase::Paused],
        )?;

        match pin {
            Some(pin) => {
                info!(
                    "Goal pin set at ({:.5}, {:.5}) {}",
                    pin.latitude,
                    pin.longitude,
                    pin.label.as_deref().unwrap_or("")
                );
                self.goal = Some(GoalTracker::new(pin));
                self.state.last_goal_progress_quartile = 0;
            }
            None => {
                info!("Goal pin cleared");
                self.goal = None;
                // distance covered meanwhile does not fire a burst of milestones
                self.state.last_distance_milestone_index = (self.route.cumulative_distance_m()
                    / f64::from(self.config.distance_milestone_interval_m))
                .floor() as u32;
            }
        }
        Ok(())
    }

    /// Record a checkpoint. Never throttled.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless active.
    pub fn manual_milestone(&mut self) -> Result<Vec<WorkoutEvent>, PacekeeperError> {
        self.ensure_phase("checkpoint", &[Phase::Active])?;
        let mut events = Vec::new();
        self.emit(
            WorkoutEvent::ManualMilestone {
                count: self.state.milestone_count + 1,
            },
            &mut events,
        );
        self.check_milestone_goal(&mut events);
        Ok(events)
    }

    /// Switch to time-only tracking because the position source is unusable.
    /// The athlete is told once.
    pub fn tracking_unavailable(&mut self, reason: &str) -> Vec<WorkoutEvent> {
        let mut events = Vec::new();
        if self.tracking != TrackingStatus::Enabled
            || !matches!(self.state.phase, Phase::Active | Phase::Paused)
        {
            return events;
        }

        warn!("Position tracking unavailable, continuing without it: {}", reason);
        self.tracking = TrackingStatus::Degraded {
            reason: reason.to_string(),
        };
        self.emit(
            WorkoutEvent::TrackingDegraded {
                reason: reason.to_string(),
            },
            &mut events,
        );
        events
    }

    /// One second of active time.
    pub fn on_tick(&mut self) -> Vec<WorkoutEvent> {
        let mut events = Vec::new();
        if self.state.phase != Phase::Active {
            return events;
        }

        let previous_s = self.state.elapsed_seconds;
        self.state.elapsed_seconds += 1;
        let elapsed_s = self.state.elapsed_seconds;

        self.state.calories += clock::calories_per_tick(self.config.activity, self.config.intensity);
        self.route.update_average_speed(elapsed_s);

        if let MilestoneMode::Auto { interval_seconds } = self.config.milestone_mode {
            if milestones::auto_milestone_due(
                elapsed_s,
                self.state.last_auto_milestone_at_seconds,
                interval_seconds,
            ) {
                self.state.last_auto_milestone_at_seconds = elapsed_s;
                self.emit(
                    WorkoutEvent::AutoMilestone {
                        elapsed_seconds: elapsed_s,
                    },
                    &mut events,
                );
                self.check_milestone_goal(&mut events);
            }
        }

        if self.state.phase != Phase::Active {
            return events;
        }

        if let GoalType::TimeBound { target_seconds } = self.config.goal {
            match clock::evaluate_time_goal(
                previous_s,
                elapsed_s,
                target_seconds,
                self.state.halfway_announced,
                self.state.almost_done_announced,
            ) {
                Some(TimeGoalSignal::Reached) => {
                    self.complete(CompletionReason::TimeGoal, &mut events);
                    return events;
                }
                Some(TimeGoalSignal::Halfway) => {
                    self.state.halfway_announced = true;
                    self.emit(WorkoutEvent::Halfway, &mut events);
                }
                Some(TimeGoalSignal::AlmostDone) => {
                    self.state.almost_done_announced = true;
                    self.emit(WorkoutEvent::AlmostDone, &mut events);
                }
                None => {}
            }
        }

        // dropped by the throttle unless nothing was said for a while
        self.emit(WorkoutEvent::Encouragement, &mut events);

        events
    }

    /// A position fix from the location source, in arrival order.
    pub fn on_sample(&mut self, sample: GeoSample) -> Vec<WorkoutEvent> {
        let mut events = Vec::new();
        if !self.wants_positions() {
            debug!("Ignoring sample while {} ({:?})", self.state.phase, self.tracking);
            return events;
        }

        let outcome = self.route.accept(sample);
        let SampleOutcome::Accepted { .. } = outcome else {
            return events;
        };
        self.route.update_average_speed(self.state.elapsed_seconds);

        if let Some(goal) = self.goal.as_mut() {
            let observation = goal.observe(&sample, self.state.last_goal_progress_quartile);
            let label = goal.pin().label.clone();

            if let Some(progress) = observation.progress {
                self.state.last_goal_progress_quartile = progress.quartile;
                self.emit(
                    WorkoutEvent::GoalProgress {
                        percent: progress.percent,
                        remaining_m: progress.remaining_m,
                    },
                    &mut events,
                );
            }
            if observation.reached {
                self.emit(WorkoutEvent::GoalReached { label }, &mut events);
            }
            // arriving at the pin is announced before a milestone goal completes
            self.check_milestone_goal(&mut events);
        } else if let Some(milestone) = milestones::distance_milestone(
            self.route.cumulative_distance_m(),
            self.config.distance_milestone_interval_m,
            self.state.last_distance_milestone_index,
        ) {
            self.state.last_distance_milestone_index = milestone.index;
            self.emit(
                WorkoutEvent::DistanceMilestone {
                    index: milestone.index,
                    label: milestone.label,
                },
                &mut events,
            );
            self.check_milestone_goal(&mut events);
        }

        events
    }

    /// Display values computed from the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let goal_progress_percent = match self.config.goal {
            GoalType::Free => None,
            GoalType::TimeBound { target_seconds } => Some(clock::progress_percent(
                self.state.elapsed_seconds,
                target_seconds,
            )),
            GoalType::MilestoneBound { target_count } => Some(clock::progress_percent(
                self.state.milestone_count,
                target_count,
            )),
        };

        SessionSnapshot {
            phase: self.state.phase,
            elapsed_seconds: self.state.elapsed_seconds,
            elapsed_display: pace::format_elapsed(self.state.elapsed_seconds),
            distance_m: self.route.cumulative_distance_m(),
            distance_display: pace::format_distance(self.route.cumulative_distance_m()),
            current_speed_kmh: pace::format_speed_kmh(self.route.current_speed_mps()),
            average_speed_kmh: pace::format_speed_kmh(self.route.average_speed_mps()),
            current_pace: pace::format_pace(self.route.current_speed_mps()),
            average_pace: pace::format_pace(self.route.average_speed_mps()),
            calories: self.state.calories,
            milestone_count: self.state.milestone_count,
            streak_count: self.state.streak_count,
            goal_progress_percent,
            distance_to_goal_m: self.goal.as_ref().and_then(GoalTracker::distance_to_goal_m),
            coaching_text: self.last_cue.as_ref().map(|cue| cue.text.clone()),
        }
    }

    fn ensure_phase(&self, action: &str, allowed: &[Phase]) -> Result<(), PacekeeperError> {
        if allowed.contains(&self.state.phase) {
            Ok(())
        } else {
            Err(PacekeeperError::InvalidTransition {
                action: action.to_string(),
                phase: self.state.phase,
            })
        }
    }

    /// Render the coaching for an event and record it. Throttled categories
    /// are dropped until the intensity interval has passed since the last
    /// message. Every rendered message restarts that interval.
    fn emit(&mut self, event: WorkoutEvent, events: &mut Vec<WorkoutEvent>) {
        if let Some(category) = event.coaching_category() {
            if !category.bypasses_throttle()
                && !encouragement_due(
                    self.state.elapsed_seconds,
                    self.state.last_coaching_at_seconds,
                    self.config.intensity,
                )
            {
                return;
            }
        }

        if event.is_milestone() {
            self.state.milestone_count += 1;
            self.state.streak_count += 1;
            debug!(
                "Milestone #{} at {}s: {:?}",
                self.state.milestone_count, self.state.elapsed_seconds, event
            );
        }

        if let Some(category) = event.coaching_category() {
            let cue = self
                .dispatcher
                .dispatch(category, event.coaching_detail().as_deref());
            self.last_cue = Some(cue);
            self.state.last_coaching_at_seconds = self.state.elapsed_seconds;
        }
        events.push(event);
    }

    fn check_milestone_goal(&mut self, events: &mut Vec<WorkoutEvent>) {
        if self.state.phase != Phase::Active {
            return;
        }
        if let GoalType::MilestoneBound { target_count } = self.config.goal {
            if self.state.milestone_count >= target_count {
                self.complete(CompletionReason::MilestoneGoal, events);
            }
        }
    }

    fn complete(&mut self, reason: CompletionReason, events: &mut Vec<WorkoutEvent>) {
        if self.state.phase == Phase::Completed {
            return;
        }
        self.state.phase = Phase::Completed;
        self.route.update_average_speed(self.state.elapsed_seconds);

        let summary = self.build_summary(reason);
        info!(
            "Session completed ({:?}) after {}s, {} milestones, {:.0} kcal",
            reason, summary.duration_seconds, summary.milestone_count, summary.calories
        );

        self.emit(WorkoutEvent::Completed { reason }, events);
        self.dispatcher.end_session();

        if let Err(e) = self.summary_sink.submit(&summary) {
            error!("Summary sink rejected the workout summary: {}", e);
        }
        self.summary = Some(summary);
    }

    fn build_summary(&self, reason: CompletionReason) -> WorkoutSummary {
        let route_tracked =
            self.tracking == TrackingStatus::Enabled || !self.route.samples().is_empty();
        let route = (self.config.track_position && route_tracked).then(|| RouteSummary {
            total_distance_m: self.route.cumulative_distance_m(),
            average_speed_mps: self.route.average_speed_mps(),
            average_pace_s_per_km: pace::seconds_per_km(self.route.average_speed_mps()),
            route: self.route.coordinates(),
        });

        WorkoutSummary {
            activity: self.config.activity,
            intensity: self.config.intensity,
            duration_seconds: self.state.elapsed_seconds,
            milestone_count: self.state.milestone_count,
            calories: self.state.calories,
            completion: reason,
            route,
        }
    }
}
