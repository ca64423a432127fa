use super::progress::{create_progress_bar, follow_progress};
use super::transcode_lock::TranscodeLock;
use crate::config::{Config, EncodingSettings};
use crate::error::NormalizeError;
use crate::tools::{FfmpegCommand, append_suffix, probe_duration};
use log::{debug, info, warn};
use std::fs;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// 心跳間隔下限
const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeStatus {
    Pending,
    SkippedExists,
    SkippedBusy,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 標準格式檔案已存在
    OutputExists,
    /// 其他程序正在處理
    Busy,
}

#[derive(Debug)]
pub enum TranscodeOutcome {
    Skipped(SkipReason),
    Transcoded(PathBuf),
    Failed(NormalizeError),
}

#[derive(Debug)]
pub struct TranscodeJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub temp_path: PathBuf,
    pub lock_path: PathBuf,
    pub status: TranscodeStatus,
}

/// 將舊格式影片轉為標準格式
///
/// 只寫入暫存檔，成功後以單一 rename 換成正式檔名，
/// 因此正式檔名出現時內容一定完整。
pub struct VideoTranscoder {
    ffmpeg_bin: PathBuf,
    ffprobe_bin: PathBuf,
    encoding: EncodingSettings,
    canonical_extension: String,
    temp_suffix: String,
    lock_suffix: String,
    lock_stale_after: Duration,
    owner: String,
    shutdown_signal: Arc<AtomicBool>,
}

impl VideoTranscoder {
    #[must_use]
    pub fn new(config: &Config, owner: &str, shutdown_signal: Arc<AtomicBool>) -> Self {
        let settings = &config.settings;
        Self {
            ffmpeg_bin: settings.ffmpeg_bin.clone(),
            ffprobe_bin: settings.ffprobe_bin.clone(),
            encoding: settings.encoding.clone(),
            canonical_extension: config.extension_table.canonical_video.clone(),
            temp_suffix: settings.temp_suffix.clone(),
            lock_suffix: settings.lock_suffix.clone(),
            lock_stale_after: Duration::from_secs(settings.lock_stale_secs),
            owner: owner.to_string(),
            shutdown_signal,
        }
    }

    #[must_use]
    pub fn plan(&self, input_path: &Path) -> TranscodeJob {
        let output_path =
            input_path.with_extension(self.canonical_extension.trim_start_matches('.'));
        TranscodeJob {
            input_path: input_path.to_path_buf(),
            temp_path: append_suffix(&output_path, &self.temp_suffix),
            lock_path: append_suffix(&output_path, &self.lock_suffix),
            output_path,
            status: TranscodeStatus::Pending,
        }
    }

    pub fn normalize(&self, input_path: &Path) -> TranscodeOutcome {
        let mut job = self.plan(input_path);
        self.normalize_job(&mut job)
    }

    pub fn normalize_job(&self, job: &mut TranscodeJob) -> TranscodeOutcome {
        if job.output_path.exists() {
            debug!("輸出檔已存在，略過: {}", job.output_path.display());
            job.status = TranscodeStatus::SkippedExists;
            return TranscodeOutcome::Skipped(SkipReason::OutputExists);
        }

        let lock =
            match TranscodeLock::acquire(&job.lock_path, &self.owner, self.lock_stale_after) {
                Ok(Some(lock)) => lock,
                Ok(None) => {
                    info!("其他程序正在處理，略過: {}", job.input_path.display());
                    job.status = TranscodeStatus::SkippedBusy;
                    return TranscodeOutcome::Skipped(SkipReason::Busy);
                }
                Err(e) => {
                    job.status = TranscodeStatus::Failed;
                    return TranscodeOutcome::Failed(NormalizeError::Transcode(
                        NormalizeError::chain_message(&e),
                    ));
                }
            };

        // 等待鎖定期間其他程序可能已完成
        if job.output_path.exists() {
            job.status = TranscodeStatus::SkippedExists;
            return TranscodeOutcome::Skipped(SkipReason::OutputExists);
        }

        // 持有鎖定時殘留的暫存檔必定來自中斷的執行
        if let Err(e) = Self::remove_temp(&job.temp_path) {
            job.status = TranscodeStatus::Failed;
            return TranscodeOutcome::Failed(NormalizeError::Transcode(format!(
                "Failed to remove leftover temp file {}: {e}",
                job.temp_path.display()
            )));
        }

        job.status = TranscodeStatus::Running;
        info!(
            "開始轉檔: {} -> {}",
            job.input_path.display(),
            job.output_path.display()
        );

        let encoded = self.with_heartbeat(&lock, || self.encode(job));

        // 鎖定被接手後，暫存檔可能是對方正在寫入的檔案，不可發布也不可刪除
        if !lock.is_held() {
            job.status = TranscodeStatus::Failed;
            warn!("鎖定已被其他程序接手，放棄發布: {}", job.input_path.display());
            return TranscodeOutcome::Failed(NormalizeError::Transcode(format!(
                "Lock was taken over by another process, output not published: {}",
                job.output_path.display()
            )));
        }

        let result = encoded.and_then(|()| Self::promote(&job.temp_path, &job.output_path));

        match result {
            Ok(()) => {
                job.status = TranscodeStatus::Completed;
                info!("轉檔完成: {}", job.output_path.display());
                TranscodeOutcome::Transcoded(job.output_path.clone())
            }
            Err(e) => {
                if let Err(cleanup) = Self::remove_temp(&job.temp_path) {
                    warn!("無法刪除暫存檔 {}: {cleanup}", job.temp_path.display());
                }
                job.status = TranscodeStatus::Failed;
                warn!("轉檔失敗 {}: {e}", job.input_path.display());
                TranscodeOutcome::Failed(e)
            }
        }
    }

    /// 執行期間定期更新鎖定心跳，讓長時間轉檔不被判定為過期
    fn with_heartbeat<T>(&self, lock: &TranscodeLock, work: impl FnOnce() -> T) -> T {
        let interval = (self.lock_stale_after / 4).max(MIN_HEARTBEAT_INTERVAL);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        thread::scope(|scope| {
            scope.spawn(move || {
                while let Err(RecvTimeoutError::Timeout) = stop_rx.recv_timeout(interval) {
                    if let Err(e) = lock.refresh() {
                        warn!("{e:#}");
                        break;
                    }
                }
            });

            let result = work();
            drop(stop_tx);
            result
        })
    }

    /// 執行 ffmpeg 寫入暫存檔
    fn encode(&self, job: &TranscodeJob) -> Result<(), NormalizeError> {
        let total_ms = probe_duration(&self.ffprobe_bin, &job.input_path)
            .ok()
            .map(|seconds| (seconds * 1000.0).round() as u64);
        let file_name = job
            .input_path
            .file_name()
            .map_or_else(String::new, |s| s.to_string_lossy().to_string());
        let progress_bar = create_progress_bar(total_ms, &file_name)
            .map_err(|e| NormalizeError::Transcode(NormalizeError::chain_message(&e)))?;

        let mut command = FfmpegCommand::new(&self.ffmpeg_bin, &job.input_path, &job.temp_path)
            .build_transcode_command(&self.encoding);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("執行: {command:?}");

        let mut child = command
            .spawn()
            .map_err(|e| NormalizeError::Transcode(format!("Failed to start ffmpeg: {e}")))?;

        // stderr 另開執行緒讀取，避免管線塞滿造成 ffmpeg 阻塞
        let stderr_reader = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                let mut buffer = String::new();
                let _ = BufReader::new(stderr).read_to_string(&mut buffer);
                buffer
            })
        });

        let interrupted = child
            .stdout
            .take()
            .is_some_and(|stdout| follow_progress(stdout, &progress_bar, &self.shutdown_signal));
        if interrupted {
            warn!("收到中斷信號，終止 ffmpeg: {}", job.input_path.display());
            let _ = child.kill();
        }

        let status = child.wait();
        progress_bar.finish_and_clear();
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if interrupted {
            return Err(NormalizeError::Interrupted);
        }

        let status = status
            .map_err(|e| NormalizeError::Transcode(format!("Failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                return Err(NormalizeError::Interrupted);
            }
            return Err(NormalizeError::Transcode(format!(
                "ffmpeg exited with {status}: {}",
                stderr.trim()
            )));
        }

        if !job.temp_path.exists() {
            return Err(NormalizeError::Transcode(format!(
                "ffmpeg did not produce {}",
                job.temp_path.display()
            )));
        }

        Ok(())
    }

    fn promote(temp_path: &Path, output_path: &Path) -> Result<(), NormalizeError> {
        fs::rename(temp_path, output_path).map_err(|e| {
            NormalizeError::Transcode(format!(
                "Failed to rename temp file to {}: {e}",
                output_path.display()
            ))
        })
    }

    fn remove_temp(temp_path: &Path) -> std::io::Result<()> {
        match fs::remove_file(temp_path) {
            Ok(()) => {
                info!("已刪除暫存檔: {}", temp_path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserSettings;
    use tempfile::TempDir;

    fn transcoder(root: &Path, settings: UserSettings) -> VideoTranscoder {
        let config = Config::with_settings(root.to_path_buf(), settings).unwrap();
        VideoTranscoder::new(&config, "test-owner", Arc::new(AtomicBool::new(false)))
    }

    fn missing_tools() -> UserSettings {
        UserSettings {
            ffmpeg_bin: PathBuf::from("/definitely/not/here/ffmpeg"),
            ffprobe_bin: PathBuf::from("/definitely/not/here/ffprobe"),
            ..UserSettings::default()
        }
    }

    #[test]
    fn test_plan_paths() {
        let transcoder = transcoder(Path::new("/videos"), UserSettings::default());
        let job = transcoder.plan(Path::new("/videos/a/my.clip.MOV"));

        assert_eq!(job.output_path, PathBuf::from("/videos/a/my.clip.mp4"));
        assert_eq!(job.temp_path, PathBuf::from("/videos/a/my.clip.mp4.tmp"));
        assert_eq!(job.lock_path, PathBuf::from("/videos/a/my.clip.mp4.lock"));
        assert_eq!(job.status, TranscodeStatus::Pending);
    }

    #[test]
    fn test_existing_output_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("clip.mov");
        fs::write(&input, b"mov").unwrap();
        fs::write(temp_dir.path().join("clip.mp4"), b"mp4").unwrap();

        let transcoder = transcoder(temp_dir.path(), missing_tools());
        let mut job = transcoder.plan(&input);
        let outcome = transcoder.normalize_job(&mut job);

        assert!(matches!(
            outcome,
            TranscodeOutcome::Skipped(SkipReason::OutputExists)
        ));
        assert_eq!(job.status, TranscodeStatus::SkippedExists);
    }

    #[test]
    fn test_locked_output_is_skipped_as_busy() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("clip.mov");
        fs::write(&input, b"mov").unwrap();

        let transcoder = transcoder(temp_dir.path(), missing_tools());
        let mut job = transcoder.plan(&input);
        let _held = TranscodeLock::acquire(&job.lock_path, "other", Duration::from_secs(60))
            .unwrap()
            .unwrap();

        let outcome = transcoder.normalize_job(&mut job);
        assert!(matches!(outcome, TranscodeOutcome::Skipped(SkipReason::Busy)));
        assert_eq!(job.status, TranscodeStatus::SkippedBusy);
        assert!(!job.output_path.exists());
    }

    #[test]
    fn test_spawn_failure_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("clip.mov");
        fs::write(&input, b"mov").unwrap();
        // 前次中斷留下的暫存檔
        fs::write(temp_dir.path().join("clip.mp4.tmp"), b"partial").unwrap();

        let transcoder = transcoder(temp_dir.path(), missing_tools());
        let mut job = transcoder.plan(&input);
        let outcome = transcoder.normalize_job(&mut job);

        match outcome {
            TranscodeOutcome::Failed(NormalizeError::Transcode(message)) => {
                assert!(message.contains("Failed to start ffmpeg"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(job.status, TranscodeStatus::Failed);
        assert!(!job.output_path.exists());
        assert!(!job.temp_path.exists());
        assert!(!job.lock_path.exists());
        assert!(input.exists());
    }
}
