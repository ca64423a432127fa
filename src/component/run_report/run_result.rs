use crate::component::video_transcoder::SkipReason;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Walk,
    Transcode,
    Thumbnail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscodeRecord {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub phase: Phase,
    pub path: PathBuf,
    pub message: String,
}

/// 單次執行的結果；路徑皆相對於根目錄
///
/// 由流程明確傳遞並在結束時回傳，不寫入磁碟。
#[derive(Debug, Default, Serialize)]
pub struct RunResult {
    pub transcoded: Vec<TranscodeRecord>,
    pub thumbnails: Vec<PathBuf>,
    pub errors: Vec<FailureRecord>,
    pub skipped_existing: usize,
    pub skipped_busy: usize,
    pub skipped_thumbnails: usize,
    pub interrupted: bool,
    pub elapsed_secs: f64,
}

impl RunResult {
    pub fn record_transcode(&mut self, input: PathBuf, output: PathBuf) {
        self.transcoded.push(TranscodeRecord { input, output });
    }

    pub fn record_transcode_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::OutputExists => self.skipped_existing += 1,
            SkipReason::Busy => self.skipped_busy += 1,
        }
    }

    pub fn record_thumbnail(&mut self, path: PathBuf) {
        self.thumbnails.push(path);
    }

    pub fn record_thumbnail_skip(&mut self) {
        self.skipped_thumbnails += 1;
    }

    pub fn record_failure(&mut self, phase: Phase, path: PathBuf, message: impl Into<String>) {
        self.errors.push(FailureRecord {
            phase,
            path,
            message: message.into(),
        });
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed_secs = elapsed.as_secs_f64();
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let result = RunResult::default();
        assert!(result.transcoded.is_empty());
        assert!(result.thumbnails.is_empty());
        assert!(!result.has_errors());
        assert!(!result.interrupted);
    }

    #[test]
    fn test_records_keep_order() {
        let mut result = RunResult::default();
        result.record_failure(Phase::Transcode, PathBuf::from("b/bad.mov"), "exit 1");
        result.record_transcode(PathBuf::from("a/clip.mov"), PathBuf::from("a/clip.mp4"));
        result.record_failure(Phase::Thumbnail, PathBuf::from("c/clip.mp4"), "N/A");
        result.record_transcode_skip(SkipReason::Busy);
        result.record_transcode_skip(SkipReason::OutputExists);
        result.record_transcode_skip(SkipReason::OutputExists);

        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].path, PathBuf::from("b/bad.mov"));
        assert_eq!(result.errors[1].phase, Phase::Thumbnail);
        assert_eq!(result.skipped_busy, 1);
        assert_eq!(result.skipped_existing, 2);
    }

    #[test]
    fn test_serializes_to_json() {
        let mut result = RunResult::default();
        result.record_thumbnail(PathBuf::from(".thumb/a/clip.jpg"));
        result.record_failure(Phase::Walk, PathBuf::from("locked"), "Permission denied");
        result.finish(Duration::from_millis(1500));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["thumbnails"][0], ".thumb/a/clip.jpg");
        assert_eq!(json["errors"][0]["phase"], "walk");
        assert_eq!(json["elapsed_secs"], 1.5);
    }
}
