pub mod console;
pub mod messages;
pub mod recorder;

use std::time::Duration;

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::workout::Intensity;

/// How long a standard coaching banner stays on screen
pub const BANNER_DURATION: Duration = Duration::from_secs(4);
/// Completion gets a longer intermission
pub const COMPLETION_BANNER_DURATION: Duration = Duration::from_secs(8);

const MIN_DUCK_MS: u64 = 1_500;
const DUCK_MS_PER_CHAR: u64 = 65;

/// Kinds of feedback the athlete can receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoachingCategory {
    Start,
    Encouragement,
    Milestone,
    AutoMilestone,
    Halfway,
    AlmostDone,
    GoalReached,
    Complete,
    /// Degraded tracking notice
    Advisory,
}

impl CoachingCategory {
    pub const ALL: [CoachingCategory; 9] = [
        CoachingCategory::Start,
        CoachingCategory::Encouragement,
        CoachingCategory::Milestone,
        CoachingCategory::AutoMilestone,
        CoachingCategory::Halfway,
        CoachingCategory::AlmostDone,
        CoachingCategory::GoalReached,
        CoachingCategory::Complete,
        CoachingCategory::Advisory,
    ];

    /// Everything except generic encouragement skips the throttle.
    pub fn bypasses_throttle(&self) -> bool {
        !matches!(self, CoachingCategory::Encouragement)
    }

    pub fn banner_duration(&self) -> Duration {
        match self {
            CoachingCategory::Complete => COMPLETION_BANNER_DURATION,
            _ => BANNER_DURATION,
        }
    }

    /// Particle burst accompanying the message, if the category celebrates.
    pub fn burst(&self) -> Option<Burst> {
        match self {
            CoachingCategory::Milestone | CoachingCategory::AutoMilestone => Some(Burst {
                particle_count: 80,
                spread_deg: 70.0,
                origin: (0.5, 0.6),
                colors: vec!["#22c55e".to_string(), "#3b82f6".to_string()],
            }),
            CoachingCategory::GoalReached => Some(Burst {
                particle_count: 150,
                spread_deg: 90.0,
                origin: (0.5, 0.5),
                colors: vec![
                    "#f59e0b".to_string(),
                    "#22c55e".to_string(),
                    "#ec4899".to_string(),
                ],
            }),
            CoachingCategory::Complete => Some(Burst {
                particle_count: 200,
                spread_deg: 120.0,
                origin: (0.5, 0.4),
                colors: vec![
                    "#f59e0b".to_string(),
                    "#3b82f6".to_string(),
                    "#ec4899".to_string(),
                    "#22c55e".to_string(),
                ],
            }),
            _ => None,
        }
    }
}

impl Intensity {
    /// Minimum gap between two generic encouragement messages.
    pub fn coaching_interval_seconds(&self) -> u32 {
        match self {
            Intensity::Intense => 35,
            Intensity::Moderate => 45,
            Intensity::Easy => 60,
        }
    }
}

/// Whether a generic encouragement is due.
pub fn encouragement_due(elapsed_seconds: u32, last_coaching_at_seconds: u32, intensity: Intensity) -> bool {
    elapsed_seconds.saturating_sub(last_coaching_at_seconds) >= intensity.coaching_interval_seconds()
}

/// Transient on-screen message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub category: CoachingCategory,
    pub text: String,
    pub display_for: Duration,
}

/// Celebratory particle effect configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Burst {
    pub particle_count: u32,
    pub spread_deg: f32,
    /// Normalized screen coordinates, (0, 0) is top left
    pub origin: (f32, f32),
    pub colors: Vec<String>,
}

/// Renders text as speech. The channel holds a single utterance.
pub trait SpeechSink: Send {
    /// Start speaking, returns immediately.
    fn speak(&mut self, text: &str);
    /// Cancel whatever is being spoken. No-op when silent.
    fn cancel(&mut self);
}

pub trait BannerSink: Send {
    fn show(&mut self, banner: &Banner);
}

/// Fire and forget visual effects.
pub trait CelebrationSink: Send {
    fn burst(&mut self, burst: &Burst);
}

/// Background music control, so speech is audible over it.
pub trait MusicDucker: Send {
    /// Lower the music volume for `for_ms` milliseconds.
    fn duck(&mut self, for_ms: u64);
    fn restore(&mut self);
}

/// The collaborators a dispatcher renders coaching through.
pub struct CoachingOutputs {
    pub speech: Box<dyn SpeechSink>,
    pub banner: Box<dyn BannerSink>,
    pub celebration: Box<dyn CelebrationSink>,
    pub music: Option<Box<dyn MusicDucker>>,
}

/// A message that was dispatched, as returned to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoachingCue {
    pub category: CoachingCategory,
    pub text: String,
    pub spoken: bool,
    pub celebrated: bool,
}

/// Selects coaching messages and renders them.
///
/// The dispatcher does not keep time. The session decides when a message is
/// due and owns the throttle marker; the dispatcher only picks a message and
/// fans it out to the banner, speech and celebration collaborators.
pub struct CoachingDispatcher {
    outputs: CoachingOutputs,
    rng: StdRng,
    audio_enabled: bool,
}

impl CoachingDispatcher {
    pub fn new(outputs: CoachingOutputs) -> Self {
        Self::with_rng(outputs, StdRng::from_entropy())
    }

    pub fn with_rng(outputs: CoachingOutputs, rng: StdRng) -> Self {
        Self {
            outputs,
            rng,
            audio_enabled: true,
        }
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    /// Toggle spoken coaching. Disabling cuts the current utterance.
    pub fn set_audio_enabled(&mut self, enabled: bool) {
        if self.audio_enabled && !enabled {
            self.outputs.speech.cancel();
            if let Some(music) = self.outputs.music.as_mut() {
                music.restore();
            }
        }
        self.audio_enabled = enabled;
    }

    /// Pick a message for `category` and render it. `detail` is prepended to
    /// the message, e.g. the distance of a milestone.
    pub fn dispatch(&mut self, category: CoachingCategory, detail: Option<&str>) -> CoachingCue {
        let message = messages::pool(category)
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_default();
        let text = match detail {
            Some(detail) => format!("{detail}. {message}"),
            None => message.to_string(),
        };
        debug!("Coaching {:?}: {}", category, text);

        self.outputs.banner.show(&Banner {
            category,
            text: text.clone(),
            display_for: category.banner_duration(),
        });

        if self.audio_enabled {
            self.outputs.speech.cancel();
            if let Some(music) = self.outputs.music.as_mut() {
                music.duck(speech_duration_ms(&text));
            }
            self.outputs.speech.speak(&text);
        }

        let burst = category.burst();
        if let Some(burst) = &burst {
            self.outputs.celebration.burst(burst);
        }

        CoachingCue {
            category,
            text,
            spoken: self.audio_enabled,
            celebrated: burst.is_some(),
        }
    }

    /// Session is over: give the music back. A completion message still
    /// being spoken is left to finish.
    pub fn end_session(&mut self) {
        info!("Coaching session ended");
        if let Some(music) = self.outputs.music.as_mut() {
            music.restore();
        }
    }

    /// Cut any speech immediately, used when a session is discarded.
    pub fn silence(&mut self) {
        self.outputs.speech.cancel();
        if let Some(music) = self.outputs.music.as_mut() {
            music.restore();
        }
    }
}

/// Rough time needed to speak `text`, used to size the music duck.
fn speech_duration_ms(text: &str) -> u64 {
    (text.chars().count() as u64 * DUCK_MS_PER_CHAR).max(MIN_DUCK_MS)
}
