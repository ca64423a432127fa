use crate::component::run_report::{Phase, RunResult};
use crate::component::thumbnail_generator::{ThumbnailGenerator, ThumbnailOutcome};
use crate::component::video_transcoder::{SkipReason, TranscodeOutcome, VideoTranscoder};
use crate::config::Config;
use crate::error::NormalizeError;
use crate::tools::{
    FileEntry, FileScanner, WalkEvent, check_media_tools, ensure_directory_exists,
    relative_to_root, validate_directory_exists,
};
use console::style;
use log::{info, warn};
use rust_i18n::t;
use std::collections::HashSet;
use std::fmt::Display;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use uuid::Uuid;

/// 依發現順序保存標準格式影片，不重複
#[derive(Debug, Default)]
struct VideoSet {
    order: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl VideoSet {
    fn insert(&mut self, path: PathBuf) {
        if self.seen.insert(path.clone()) {
            self.order.push(path);
        }
    }
}

/// 批次標準化流程
///
/// 第一階段掃描並轉檔，得到完整的標準格式影片清單；
/// 第二階段為清單中每支影片產生縮圖。
pub struct MediaNormalizer {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
    owner: String,
    quiet: bool,
}

impl MediaNormalizer {
    #[must_use]
    pub fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
            owner: Uuid::new_v4().to_string(),
            quiet: false,
        }
    }

    /// 不輸出逐檔進度（例如輸出 JSON 時）
    #[must_use]
    pub const fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn say(&self, line: impl Display) {
        if !self.quiet {
            println!("{line}");
        }
    }

    fn relative(&self, path: &Path) -> PathBuf {
        relative_to_root(&self.config.root_dir, path).unwrap_or_else(|_| path.to_path_buf())
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown_signal.load(Ordering::SeqCst)
    }

    /// 前置條件檢查，失敗時中止整個執行
    pub fn preflight(&self) -> Result<(), NormalizeError> {
        validate_directory_exists(&self.config.root_dir)?;

        self.say(style(t!("run.checking")).dim());
        check_media_tools(&self.config.settings)?;
        for tool in [&self.config.settings.ffmpeg_bin, &self.config.settings.ffprobe_bin] {
            self.say(format!(
                "{} {}",
                style("✓").green(),
                t!("run.tool_found", tool = tool.display())
            ));
        }
        Ok(())
    }

    pub fn run(&self) -> Result<RunResult, NormalizeError> {
        let started = Instant::now();
        self.say(style(t!("run.start")).cyan().bold());
        self.say(t!("run.root", root = self.config.root_dir.display()));

        self.preflight()?;

        let mut result = RunResult::default();

        let thumbnail_root = self.config.thumbnail_root();
        if let Err(e) = ensure_directory_exists(&thumbnail_root) {
            warn!("無法建立縮圖根目錄 {}: {e}", thumbnail_root.display());
            result.record_failure(
                Phase::Thumbnail,
                self.relative(&thumbnail_root),
                format!("{e:#}"),
            );
        }

        let videos = self.transcode_phase(&mut result);
        if !result.interrupted {
            self.thumbnail_phase(&videos, &mut result);
        }

        result.finish(started.elapsed());
        info!(
            "標準化完成 - 轉檔: {}, 縮圖: {}, 錯誤: {}",
            result.transcoded.len(),
            result.thumbnails.len(),
            result.errors.len()
        );
        Ok(result)
    }

    /// 第一階段：掃描並轉檔，回傳所有標準格式影片
    fn transcode_phase(&self, result: &mut RunResult) -> Vec<PathBuf> {
        self.say(format!("\n{}", style(t!("run.transcoding")).cyan()));

        let transcoder =
            VideoTranscoder::new(&self.config, &self.owner, Arc::clone(&self.shutdown_signal));
        let scanner = FileScanner::new(&self.config.root_dir, self.config.walk_exclusions());
        let table = &self.config.extension_table;
        let mut videos = VideoSet::default();

        scanner.walk(|event| {
            if self.is_shutting_down() {
                result.interrupted = true;
                return ControlFlow::Break(());
            }

            match event {
                WalkEvent::Failure(failure) => {
                    let message = NormalizeError::Walk(failure.message).to_string();
                    self.report_failure(&failure.relative_path, &message);
                    result.record_failure(Phase::Walk, failure.relative_path, message);
                }
                WalkEvent::File(entry) if table.is_source_video(&entry.path) => {
                    self.transcode_entry(&transcoder, &entry, result, &mut videos);
                }
                WalkEvent::File(entry) if table.is_canonical_video(&entry.path) => {
                    videos.insert(entry.path);
                }
                WalkEvent::File(_) => {}
            }

            if result.interrupted {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        videos.order
    }

    fn transcode_entry(
        &self,
        transcoder: &VideoTranscoder,
        entry: &FileEntry,
        result: &mut RunResult,
        videos: &mut VideoSet,
    ) {
        match transcoder.normalize(&entry.path) {
            TranscodeOutcome::Transcoded(output) => {
                let relative_output = self.relative(&output);
                self.say(format!(
                    "{} {}",
                    style("✓").green(),
                    t!(
                        "run.transcoded",
                        input = entry.relative_path.display(),
                        output = relative_output.display()
                    )
                ));
                result.record_transcode(entry.relative_path.clone(), relative_output);
                videos.insert(output);
            }
            TranscodeOutcome::Skipped(reason) => {
                if reason == SkipReason::OutputExists {
                    videos.insert(transcoder.plan(&entry.path).output_path);
                }
                result.record_transcode_skip(reason);
            }
            TranscodeOutcome::Failed(NormalizeError::Interrupted) => {
                result.interrupted = true;
            }
            TranscodeOutcome::Failed(e) => {
                let message = e.to_string();
                self.report_failure(&entry.relative_path, &message);
                result.record_failure(Phase::Transcode, entry.relative_path.clone(), message);
            }
        }
    }

    /// 第二階段：為每支標準格式影片產生縮圖
    fn thumbnail_phase(&self, videos: &[PathBuf], result: &mut RunResult) {
        self.say(format!("\n{}", style(t!("run.thumbnails")).cyan()));

        let generator = ThumbnailGenerator::new(&self.config);
        for video in videos {
            if self.is_shutting_down() {
                result.interrupted = true;
                break;
            }

            let relative_video = self.relative(video);
            match generator.thumbnail(video) {
                ThumbnailOutcome::Created(path) => {
                    let relative_thumb = self.relative(&path);
                    self.say(format!(
                        "{} {}",
                        style("✓").green(),
                        t!("run.thumbnail", path = relative_thumb.display())
                    ));
                    result.record_thumbnail(relative_thumb);
                }
                ThumbnailOutcome::Skipped(_) => result.record_thumbnail_skip(),
                // 中斷信號同時終止了 ffmpeg，失敗不記為錯誤
                ThumbnailOutcome::Failed(_) if self.is_shutting_down() => {
                    result.interrupted = true;
                    break;
                }
                ThumbnailOutcome::Failed(e) => {
                    let message = e.to_string();
                    self.report_failure(&relative_video, &message);
                    result.record_failure(Phase::Thumbnail, relative_video, message);
                }
            }
        }
    }

    fn report_failure(&self, path: &Path, message: &str) {
        warn!("{}: {message}", path.display());
        self.say(format!(
            "{} {}: {}",
            style("✗").red(),
            path.display(),
            style(message).red()
        ));
    }
}
