// Coaching collaborators for the command line: everything goes to the log.

use log::info;

use super::{Banner, BannerSink, Burst, CelebrationSink, CoachingOutputs, SpeechSink};

pub struct LogSpeech;

impl SpeechSink for LogSpeech {
    fn speak(&mut self, text: &str) {
        info!("[voice] {}", text);
    }

    fn cancel(&mut self) {}
}

pub struct LogBanner;

impl BannerSink for LogBanner {
    fn show(&mut self, banner: &Banner) {
        info!(
            "[banner {:?}, {}s] {}",
            banner.category,
            banner.display_for.as_secs(),
            banner.text
        );
    }
}

pub struct LogCelebration;

impl CelebrationSink for LogCelebration {
    fn burst(&mut self, burst: &Burst) {
        info!(
            "[celebration] {} particles, spread {}",
            burst.particle_count, burst.spread_deg
        );
    }
}

pub fn console_outputs() -> CoachingOutputs {
    CoachingOutputs {
        speech: Box::new(LogSpeech),
        banner: Box::new(LogBanner),
        celebration: Box::new(LogCelebration),
        music: None,
    }
}
