use std::{io::BufRead, path::PathBuf, thread};

use clap::{Args as ClapArgs, Parser, Subcommand};
use log::{error, info, warn};
use tokio::sync::mpsc::{self, UnboundedSender};

use pacekeeper::{
    PacekeeperError,
    coaching::{CoachingDispatcher, console::console_outputs},
    live::{SessionCommand, SessionRunner, config::AppConfig},
    presets::{FileBasedPresetStore, Preset, PresetStore},
    tracking::{GoalPin, MockPositionProducer, producer::read_positions},
    workout::{
        ActivityType, DISTANCE_MILESTONE_INTERVALS_M, GoalType, Intensity, MilestoneMode,
        SessionConfig, SummarySink, WorkoutSession, WorkoutSummary, replay_samples,
    },
    writer::{JsonLinesSummaryWriter, SummaryRecorder},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Directory holding saved presets
    #[arg(long, global = true)]
    preset_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a recorded route through a session as fast as possible
    Replay {
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        session: SessionArgs,

        /// Append the summary to this JSON Lines file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Play a recorded route back in real time, reading commands from stdin
    Live {
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        session: SessionArgs,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    #[command(subcommand)]
    Preset(PresetCommands),
    /// Show or change the stored application config
    Config {
        #[arg(long)]
        audio: Option<bool>,
        #[arg(long)]
        poll_ms: Option<u64>,
        #[arg(long)]
        resubscribe_s: Option<u64>,
        #[arg(long)]
        interval: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
enum PresetCommands {
    Save {
        name: String,
        #[command(flatten)]
        session: SessionArgs,
    },
    Show {
        name: String,
    },
    List,
    Delete {
        name: String,
    },
}

#[derive(ClapArgs, Debug)]
struct SessionArgs {
    /// Start from a saved preset, the other session options are ignored
    #[arg(long)]
    preset: Option<String>,

    #[arg(short, long, default_value = "running")]
    activity: ActivityType,

    #[arg(long, default_value = "moderate")]
    intensity: Intensity,

    /// Complete after this many seconds
    #[arg(long, conflicts_with = "goal_milestones")]
    goal_seconds: Option<u32>,

    /// Complete after this many milestones
    #[arg(long)]
    goal_milestones: Option<u32>,

    /// Distance milestone interval in meters (250, 500, 1000 or 2000)
    #[arg(long)]
    interval: Option<u32>,

    /// Add a milestone every N seconds
    #[arg(long)]
    auto_interval: Option<u32>,

    /// Ignore positions and track time only
    #[arg(long)]
    no_position: bool,

    #[arg(long, requires = "goal_lon", allow_hyphen_values = true)]
    goal_lat: Option<f64>,

    #[arg(long, requires = "goal_lat", allow_hyphen_values = true)]
    goal_lon: Option<f64>,

    #[arg(long)]
    goal_label: Option<String>,

    /// Banners only, no spoken coaching
    #[arg(long)]
    mute: bool,
}

impl SessionArgs {
    fn session_config(
        &self,
        app_config: &AppConfig,
        preset_dir: Option<&PathBuf>,
    ) -> Result<SessionConfig, PacekeeperError> {
        if let Some(name) = &self.preset {
            let store = open_store(preset_dir)?;
            return store
                .load_preset(name)?
                .map(|preset| preset.config)
                .ok_or_else(|| PacekeeperError::InvalidUserInput {
                    field: "preset".to_string(),
                    reason: format!("No preset named '{name}'"),
                });
        }

        let interval = self.interval.unwrap_or(app_config.default_distance_interval_m);
        if !DISTANCE_MILESTONE_INTERVALS_M.contains(&interval) {
            return Err(PacekeeperError::InvalidUserInput {
                field: "interval".to_string(),
                reason: format!("{interval} m is not one of {DISTANCE_MILESTONE_INTERVALS_M:?}"),
            });
        }

        let goal = match (self.goal_seconds, self.goal_milestones) {
            (Some(target_seconds), _) => GoalType::TimeBound { target_seconds },
            (None, Some(target_count)) => GoalType::MilestoneBound { target_count },
            (None, None) => GoalType::Free,
        };
        let milestone_mode = match self.auto_interval {
            Some(interval_seconds) => MilestoneMode::Auto { interval_seconds },
            None => MilestoneMode::Manual,
        };

        let config = SessionConfig {
            activity: self.activity,
            goal,
            milestone_mode,
            intensity: self.intensity,
            distance_milestone_interval_m: interval,
            track_position: !self.no_position,
        };
        config.validate()?;
        Ok(config)
    }

    fn goal_pin(&self) -> Option<GoalPin> {
        match (self.goal_lat, self.goal_lon) {
            (Some(latitude), Some(longitude)) => {
                Some(GoalPin::new(latitude, longitude, self.goal_label.clone()))
            }
            _ => None,
        }
    }
}

fn open_store(preset_dir: Option<&PathBuf>) -> Result<FileBasedPresetStore, PacekeeperError> {
    match preset_dir {
        Some(dir) => FileBasedPresetStore::new(dir.clone()),
        None => FileBasedPresetStore::new_default(),
    }
}

fn summary_sink(output: Option<&PathBuf>) -> Result<Box<dyn SummarySink>, PacekeeperError> {
    let sink: Box<dyn SummarySink> = match output {
        Some(file) => Box::new(JsonLinesSummaryWriter::open(file)?),
        None => Box::new(SummaryRecorder::default()),
    };
    Ok(sink)
}

fn new_session(
    session_args: &SessionArgs,
    app_config: &AppConfig,
    output: Option<&PathBuf>,
) -> Result<WorkoutSession, PacekeeperError> {
    let mut dispatcher = CoachingDispatcher::new(console_outputs());
    dispatcher.set_audio_enabled(app_config.audio_enabled && !session_args.mute);

    let mut session = WorkoutSession::new(dispatcher, summary_sink(output)?);
    session.set_goal_pin(session_args.goal_pin())?;
    Ok(session)
}

fn print_summary(summary: Option<&WorkoutSummary>) {
    match summary.map(serde_json::to_string_pretty) {
        Some(Ok(json)) => println!("{json}"),
        Some(Err(e)) => error!("Could not format summary: {}", e),
        None => println!("Session ended without a summary"),
    }
}

fn replay(
    input: &PathBuf,
    session_args: &SessionArgs,
    output: Option<&PathBuf>,
    app_config: &AppConfig,
    preset_dir: Option<&PathBuf>,
) -> Result<(), PacekeeperError> {
    let samples = read_positions(input)?;
    let config = session_args.session_config(app_config, preset_dir)?;
    let mut session = new_session(session_args, app_config, output)?;

    let events = replay_samples(&mut session, config, &samples)?;
    info!("{} samples produced {} events", samples.len(), events.len());
    print_summary(session.summary());
    Ok(())
}

/// Map a line typed during a live session to a command. `start` begins a
/// new session with the configuration given on the command line, which is
/// how a session discarded by an early stop is restarted.
fn parse_command(line: &str, config: &SessionConfig) -> Option<SessionCommand> {
    match line.trim() {
        "start" => Some(SessionCommand::Start(config.clone())),
        "p" | "pause" => Some(SessionCommand::Pause),
        "r" | "resume" => Some(SessionCommand::Resume),
        "c" | "checkpoint" => Some(SessionCommand::Checkpoint),
        "s" | "stop" => Some(SessionCommand::Stop),
        "f" | "finish" => Some(SessionCommand::Finish),
        "x" | "reset" => Some(SessionCommand::Reset),
        "mute" => Some(SessionCommand::SetAudio(false)),
        "unmute" => Some(SessionCommand::SetAudio(true)),
        "q" | "quit" => Some(SessionCommand::Shutdown),
        _ => None,
    }
}

fn read_commands(commands: UnboundedSender<SessionCommand>, config: SessionConfig) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line, &config) {
                Some(command) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                None => println!("Commands: start p(ause) r(esume) c(heckpoint) s(top) f(inish) x (reset) mute unmute q(uit)"),
            }
        }
    });
}

fn live(
    input: &PathBuf,
    session_args: &SessionArgs,
    output: Option<&PathBuf>,
    app_config: &AppConfig,
    preset_dir: Option<&PathBuf>,
) -> Result<(), PacekeeperError> {
    let producer = MockPositionProducer::from_file(input)?;
    let config = session_args.session_config(app_config, preset_dir)?;
    let session = new_session(session_args, app_config, output)?;

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let ctrlc_tx = command_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!("Exiting...");
        let _ = ctrlc_tx.send(SessionCommand::Shutdown);
    }) {
        warn!("Could not set Ctrl-C handler: {}", e);
    }

    command_tx
        .send(SessionCommand::Start(config.clone()))
        .map_err(|_| PacekeeperError::InvalidUserInput {
            field: "command".to_string(),
            reason: "session runner is not listening".to_string(),
        })?;
    read_commands(command_tx, config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| PacekeeperError::RuntimeError { source: e })?;
    let runner = SessionRunner::new(session, producer, command_rx).with_config(app_config);
    let (session, _) = runtime.block_on(runner.run());

    print_summary(session.summary());
    Ok(())
}

fn preset(
    command: &PresetCommands,
    app_config: &AppConfig,
    preset_dir: Option<&PathBuf>,
) -> Result<(), PacekeeperError> {
    let mut store = open_store(preset_dir)?;
    match command {
        PresetCommands::Save { name, session } => {
            let preset = Preset::new(name, session.session_config(app_config, preset_dir)?)?;
            store.save_preset(&preset)?;
            println!("Saved preset '{}'", preset.name);
        }
        PresetCommands::Show { name } => match store.load_preset(name)? {
            Some(preset) => println!(
                "{}",
                serde_json::to_string_pretty(&preset)
                    .map_err(|e| PacekeeperError::ConfigSerializeError { source: e })?
            ),
            None => println!("No preset named '{name}'"),
        },
        PresetCommands::List => {
            for name in store.list_presets()? {
                println!("{name}");
            }
        }
        PresetCommands::Delete { name } => {
            store.delete_preset(name)?;
            println!("Deleted preset '{name}'");
        }
    }
    Ok(())
}

fn config(
    mut app_config: AppConfig,
    audio: Option<bool>,
    poll_ms: Option<u64>,
    resubscribe_s: Option<u64>,
    interval: Option<u32>,
) -> Result<(), PacekeeperError> {
    let changed = audio.is_some() || poll_ms.is_some() || resubscribe_s.is_some() || interval.is_some();
    if let Some(interval) = interval {
        if !DISTANCE_MILESTONE_INTERVALS_M.contains(&interval) {
            return Err(PacekeeperError::InvalidUserInput {
                field: "interval".to_string(),
                reason: format!("{interval} m is not one of {DISTANCE_MILESTONE_INTERVALS_M:?}"),
            });
        }
        app_config.default_distance_interval_m = interval;
    }
    if let Some(audio) = audio {
        app_config.audio_enabled = audio;
    }
    if let Some(poll_ms) = poll_ms {
        app_config.position_poll_ms = poll_ms;
    }
    if let Some(resubscribe_s) = resubscribe_s {
        app_config.resubscribe_delay_s = resubscribe_s;
    }

    if changed {
        app_config.save()?;
        info!("Config saved to {}", AppConfig::default_path()?.display());
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&app_config)
            .map_err(|e| PacekeeperError::ConfigSerializeError { source: e })?
    );
    Ok(())
}

fn main() {
    colog::init();

    let cli = Args::parse();
    let app_config = match AppConfig::from_local_file() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            warn!("Ignoring unreadable config file: {}", e);
            AppConfig::default()
        }
    };
    let preset_dir = cli.preset_dir.as_ref();

    let result = match &cli.command {
        Commands::Replay {
            input,
            session,
            output,
        } => replay(input, session, output.as_ref(), &app_config, preset_dir),
        Commands::Live {
            input,
            session,
            output,
        } => live(input, session, output.as_ref(), &app_config, preset_dir),
        Commands::Preset(command) => preset(command, &app_config, preset_dir),
        Commands::Config {
            audio,
            poll_ms,
            resubscribe_s,
            interval,
        } => config(app_config.clone(), *audio, *poll_ms, *resubscribe_s, *interval),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
