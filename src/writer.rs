use std::{
    fs::{File, OpenOptions},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use log::info;
use serde_jsonlines::JsonLinesWriter;

use crate::{
    PacekeeperError,
    workout::{SummarySink, WorkoutSummary},
};

/// Appends every completed session to a JSON Lines file.
pub struct JsonLinesSummaryWriter {
    path: PathBuf,
    writer: JsonLinesWriter<BufWriter<File>>,
}

impl JsonLinesSummaryWriter {
    /// Open `file` for appending, creating it when missing.
    pub fn open(file: impl AsRef<Path>) -> Result<Self, PacekeeperError> {
        let path = file.as_ref().to_path_buf();
        let summary_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| PacekeeperError::WriterError { source: e })?;

        Ok(Self {
            path,
            writer: JsonLinesWriter::new(BufWriter::new(summary_file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SummarySink for JsonLinesSummaryWriter {
    fn submit(&mut self, summary: &WorkoutSummary) -> Result<(), PacekeeperError> {
        self.writer
            .write(summary)
            .map_err(|e| PacekeeperError::WriterError { source: e })?;
        self.writer
            .flush()
            .map_err(|e| PacekeeperError::WriterError { source: e })?;
        info!("Workout summary written to {}", self.path.display());
        Ok(())
    }
}

/// Keeps submitted summaries in memory. Clones share the same list.
#[derive(Clone, Default)]
pub struct SummaryRecorder {
    summaries: Arc<Mutex<Vec<WorkoutSummary>>>,
}

impl SummaryRecorder {
    pub fn summaries(&self) -> Vec<WorkoutSummary> {
        self.summaries
            .lock()
            .map(|summaries| summaries.clone())
            .unwrap_or_default()
    }
}

impl SummarySink for SummaryRecorder {
    fn submit(&mut self, summary: &WorkoutSummary) -> Result<(), PacekeeperError> {
        let mut summaries = self
            .summaries
            .lock()
            .map_err(|_| PacekeeperError::SummaryRejected {
                reason: "summary recorder lock poisoned".to_string(),
            })?;
        summaries.push(summary.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::{ActivityType, CompletionReason, Intensity};
    use tempfile::tempdir;

    fn summary(duration_seconds: u32) -> WorkoutSummary {
        WorkoutSummary {
            activity: ActivityType::Cycling,
            intensity: Intensity::Intense,
            duration_seconds,
            milestone_count: 2,
            calories: 42.5,
            completion: CompletionReason::Finished,
            route: None,
        }
    }

    #[test]
    fn test_summaries_are_appended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summaries.jsonl");

        let mut writer = JsonLinesSummaryWriter::open(&path).unwrap();
        writer.submit(&summary(600)).unwrap();
        drop(writer);

        // reopening keeps earlier lines
        let mut writer = JsonLinesSummaryWriter::open(&path).unwrap();
        writer.submit(&summary(1200)).unwrap();

        let written: Vec<WorkoutSummary> = serde_jsonlines::json_lines(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(written, vec![summary(600), summary(1200)]);
    }

    #[test]
    fn test_open_fails_for_missing_directory() {
        let dir = tempdir().unwrap();
        let result = JsonLinesSummaryWriter::open(dir.path().join("missing").join("out.jsonl"));
        assert!(matches!(result, Err(PacekeeperError::WriterError { .. })));
    }

    #[test]
    fn test_recorder_clones_share_summaries() {
        let recorder = SummaryRecorder::default();
        let mut sink = recorder.clone();
        sink.submit(&summary(60)).unwrap();

        assert_eq!(recorder.summaries(), vec![summary(60)]);
    }
}
