pub mod config;

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::PacekeeperError;
use crate::tracking::{GoalPin, PermissionState, PositionProducer};
use crate::workout::{Phase, SessionConfig, WorkoutEvent, WorkoutSession};

use config::AppConfig;

pub const POSITION_POLL_MS: u64 = 1000;
pub const RESUBSCRIBE_DELAY_S: u64 = 5;
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Requests from the athlete, applied in the order they were sent.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionCommand {
    Start(SessionConfig),
    Pause,
    Resume,
    Checkpoint,
    Stop,
    Finish,
    Reset,
    SetGoalPin(Option<GoalPin>),
    SetAudio(bool),
    Shutdown,
}

enum Step {
    Tick,
    Poll,
    Command(Option<SessionCommand>),
}

/// Drives a [`WorkoutSession`] in real time.
///
/// A single task owns the session, so ticks, position fixes and commands are
/// handled one at a time in the order they arrive. The one-second tick only
/// runs while the session is active, and the position subscription follows
/// the phase: subscribed while active with tracking enabled, released on
/// pause, stop and completion.
///
/// The runner returns once the session completed, on `Shutdown`, or when the
/// command channel closed while no session is running.
pub struct SessionRunner<P: PositionProducer> {
    session: WorkoutSession,
    producer: P,
    commands: UnboundedReceiver<SessionCommand>,
    events: Option<UnboundedSender<WorkoutEvent>>,
    poll_period: Duration,
    resubscribe_delay: Duration,
    resubscribe_at: Option<Instant>,
}

impl<P: PositionProducer> SessionRunner<P> {
    pub fn new(session: WorkoutSession, producer: P, commands: UnboundedReceiver<SessionCommand>) -> Self {
        Self {
            session,
            producer,
            commands,
            events: None,
            poll_period: Duration::from_millis(POSITION_POLL_MS),
            resubscribe_delay: Duration::from_secs(RESUBSCRIBE_DELAY_S),
            resubscribe_at: None,
        }
    }

    pub fn with_config(mut self, app_config: &AppConfig) -> Self {
        self.poll_period = app_config.poll_period();
        self.resubscribe_delay = app_config.resubscribe_delay();
        self
    }

    /// Forward every event the session produces to `events`.
    pub fn with_event_sender(mut self, events: UnboundedSender<WorkoutEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run until the session is over. Hands back the session and the producer.
    pub async fn run(mut self) -> (WorkoutSession, P) {
        let mut ticker = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut poller = time::interval(self.poll_period);
        poller.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut commands_open = true;

        loop {
            let active = self.session.phase() == Phase::Active;
            let polling = self.session.wants_positions();

            let step = tokio::select! {
                _ = ticker.tick(), if active => Step::Tick,
                _ = poller.tick(), if polling => Step::Poll,
                command = self.commands.recv(), if commands_open => Step::Command(command),
                else => break,
            };

            match step {
                Step::Tick => {
                    let events = self.session.on_tick();
                    self.forward(events);
                }
                Step::Poll => self.poll_position(),
                Step::Command(None) => {
                    debug!("Command channel closed");
                    commands_open = false;
                }
                Step::Command(Some(SessionCommand::Shutdown)) => {
                    info!("Shutdown requested");
                    break;
                }
                Step::Command(Some(command)) => {
                    self.apply(command);
                    if !active && self.session.phase() == Phase::Active {
                        // count whole seconds from the moment the clock (re)starts
                        ticker.reset();
                    }
                }
            }

            self.sync_subscription();

            if self.session.phase() == Phase::Completed {
                break;
            }
            if !commands_open && self.session.phase() != Phase::Active {
                break;
            }
        }

        if self.producer.is_subscribed() {
            self.producer.unsubscribe();
        }
        info!("Session runner stopped in phase {}", self.session.phase());
        (self.session, self.producer)
    }

    fn apply(&mut self, command: SessionCommand) {
        debug!("Applying {:?}", command);
        let result = match command {
            SessionCommand::Start(config) => self.session.start(config),
            SessionCommand::Pause => self.session.pause().map(|()| Vec::new()),
            SessionCommand::Resume => self.session.resume().map(|()| Vec::new()),
            SessionCommand::Checkpoint => self.session.manual_milestone(),
            SessionCommand::Stop => self.session.stop(),
            SessionCommand::Finish => self.session.finish(),
            SessionCommand::Reset => self.session.reset().map(|()| Vec::new()),
            SessionCommand::SetGoalPin(pin) => self.session.set_goal_pin(pin).map(|()| Vec::new()),
            SessionCommand::SetAudio(enabled) => {
                self.session.set_audio_enabled(enabled);
                Ok(Vec::new())
            }
            SessionCommand::Shutdown => Ok(Vec::new()),
        };

        match result {
            Ok(events) => self.forward(events),
            Err(e) => warn!("Ignoring command: {}", e),
        }
    }

    fn poll_position(&mut self) {
        if !self.producer.is_subscribed() {
            return;
        }

        match self.producer.next_position() {
            Ok(Some(sample)) => {
                let events = self.session.on_sample(sample);
                self.forward(events);
            }
            Ok(None) => {}
            Err(PacekeeperError::PositionTimeout) => {
                warn!(
                    "Position fix timed out, re-subscribing in {}s",
                    self.resubscribe_delay.as_secs()
                );
                self.producer.unsubscribe();
                self.resubscribe_at = Some(Instant::now() + self.resubscribe_delay);
            }
            Err(e) => {
                let events = self.session.tracking_unavailable(&e.to_string());
                self.forward(events);
            }
        }
    }

    /// Subscribe or unsubscribe so the producer matches what the session wants.
    fn sync_subscription(&mut self) {
        if !self.session.wants_positions() {
            if self.producer.is_subscribed() {
                debug!("Releasing position subscription");
                self.producer.unsubscribe();
            }
            self.resubscribe_at = None;
            return;
        }
        if self.producer.is_subscribed() {
            return;
        }
        if self.resubscribe_at.is_some_and(|at| Instant::now() < at) {
            return;
        }

        if self.producer.permission() == PermissionState::Denied {
            let events = self.session.tracking_unavailable("location permission denied");
            self.forward(events);
            return;
        }
        match self.producer.subscribe() {
            Ok(()) => {
                info!("Subscribed to position updates");
                self.resubscribe_at = None;
            }
            Err(e) => {
                let events = self.session.tracking_unavailable(&e.to_string());
                self.forward(events);
            }
        }
    }

    fn forward(&mut self, events: Vec<WorkoutEvent>) {
        let Some(sender) = self.events.as_ref() else {
            return;
        };
        for event in events {
            if sender.send(event).is_err() {
                debug!("Event receiver dropped, no longer forwarding events");
                self.events = None;
                return;
            }
        }
    }
}
