// In-memory coaching collaborators that remember everything they were asked
// to render. Used by tests and by offline replays.

use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    Banner, BannerSink, Burst, CelebrationSink, CoachingOutputs, MusicDucker, SpeechSink,
};

#[derive(Debug, Default)]
struct CoachingLog {
    spoken: Vec<String>,
    cancellations: usize,
    speaking: bool,
    banners: Vec<Banner>,
    bursts: Vec<Burst>,
    ducks: Vec<u64>,
    restores: usize,
}

/// Shared handle to a recording of rendered coaching.
///
/// Clones share the same recording, so one handle can be given to a session
/// through [`CoachingRecorder::outputs`] and another kept for inspection.
#[derive(Clone, Debug, Default)]
pub struct CoachingRecorder {
    log: Arc<Mutex<CoachingLog>>,
}

impl CoachingRecorder {
    pub fn outputs(&self) -> CoachingOutputs {
        CoachingOutputs {
            speech: Box::new(self.clone()),
            banner: Box::new(self.clone()),
            celebration: Box::new(self.clone()),
            music: Some(Box::new(self.clone())),
        }
    }

    fn log(&self) -> MutexGuard<'_, CoachingLog> {
        // a panicking test thread must not hide the recording from others
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn spoken(&self) -> Vec<String> {
        self.log().spoken.clone()
    }

    pub fn cancellations(&self) -> usize {
        self.log().cancellations
    }

    /// Utterances currently in flight, never more than one.
    pub fn active_utterances(&self) -> usize {
        usize::from(self.log().speaking)
    }

    pub fn banners(&self) -> Vec<Banner> {
        self.log().banners.clone()
    }

    pub fn bursts(&self) -> Vec<Burst> {
        self.log().bursts.clone()
    }

    pub fn ducks(&self) -> Vec<u64> {
        self.log().ducks.clone()
    }

    pub fn restores(&self) -> usize {
        self.log().restores
    }
}

impl SpeechSink for CoachingRecorder {
    fn speak(&mut self, text: &str) {
        let mut log = self.log();
        log.spoken.push(text.to_string());
        log.speaking = true;
    }

    fn cancel(&mut self) {
        let mut log = self.log();
        log.cancellations += 1;
        log.speaking = false;
    }
}

impl BannerSink for CoachingRecorder {
    fn show(&mut self, banner: &Banner) {
        self.log().banners.push(banner.clone());
    }
}

impl CelebrationSink for CoachingRecorder {
    fn burst(&mut self, burst: &Burst) {
        self.log().bursts.push(burst.clone());
    }
}

impl MusicDucker for CoachingRecorder {
    fn duck(&mut self, for_ms: u64) {
        self.log().ducks.push(for_ms);
    }

    fn restore(&mut self) {
        self.log().restores += 1;
    }
}
