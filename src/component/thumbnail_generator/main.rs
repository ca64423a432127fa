use super::thumbnail_extractor::{ThumbnailTask, extract_thumbnail, sample_timestamp};
use crate::config::Config;
use crate::error::NormalizeError;
use crate::tools::{ensure_directory_exists, probe_duration, relative_to_root};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailStatus {
    Pending,
    SkippedExists,
    Running,
    Completed,
    Failed,
}

#[derive(Debug)]
pub enum ThumbnailOutcome {
    /// 已有縮圖（任一可接受的圖片副檔名）
    Skipped(PathBuf),
    Created(PathBuf),
    Failed(NormalizeError),
}

#[derive(Debug)]
pub struct ThumbnailJob {
    pub video_path: PathBuf,
    pub thumbnail_path: PathBuf,
    pub timestamp: Option<f64>,
    pub status: ThumbnailStatus,
}

/// 為每支標準格式影片產生一張預覽縮圖
///
/// 縮圖位置：`<縮圖根目錄>/<影片相對資料夾>/<檔名><縮圖副檔名>`，
/// 列表 API 依同樣規則尋找縮圖。
pub struct ThumbnailGenerator {
    root_dir: PathBuf,
    thumbnail_root: PathBuf,
    thumbnail_extension: String,
    lookup_extensions: Vec<String>,
    width: u32,
    ffmpeg_bin: PathBuf,
    ffprobe_bin: PathBuf,
}

impl ThumbnailGenerator {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let table = &config.extension_table;
        let mut lookup_extensions = table.thumbnail_lookup.clone();
        if !lookup_extensions.contains(&table.thumbnail) {
            lookup_extensions.insert(0, table.thumbnail.clone());
        }

        Self {
            root_dir: config.root_dir.clone(),
            thumbnail_root: config.thumbnail_root(),
            thumbnail_extension: table.thumbnail.clone(),
            lookup_extensions,
            width: config.settings.thumbnail_width,
            ffmpeg_bin: config.settings.ffmpeg_bin.clone(),
            ffprobe_bin: config.settings.ffprobe_bin.clone(),
        }
    }

    /// 計算縮圖路徑
    pub fn destination_for(&self, video_path: &Path) -> Result<PathBuf> {
        let relative = relative_to_root(&self.root_dir, video_path)?;
        let stem = relative
            .file_stem()
            .with_context(|| format!("Failed to get file name of {}", video_path.display()))?;

        let mut file_name = stem.to_os_string();
        file_name.push(&self.thumbnail_extension);

        let parent = relative.parent().unwrap_or(Path::new(""));
        Ok(self.thumbnail_root.join(parent).join(file_name))
    }

    /// 尋找已存在的縮圖（任一可接受的副檔名）
    fn existing_thumbnail(&self, destination: &Path) -> Option<PathBuf> {
        self.lookup_extensions
            .iter()
            .map(|ext| destination.with_extension(ext.trim_start_matches('.')))
            .find(|candidate| candidate.exists())
    }

    pub fn plan(&self, video_path: &Path) -> Result<ThumbnailJob> {
        Ok(ThumbnailJob {
            video_path: video_path.to_path_buf(),
            thumbnail_path: self.destination_for(video_path)?,
            timestamp: None,
            status: ThumbnailStatus::Pending,
        })
    }

    pub fn thumbnail(&self, video_path: &Path) -> ThumbnailOutcome {
        match self.plan(video_path) {
            Ok(mut job) => self.thumbnail_job(&mut job),
            Err(e) => {
                ThumbnailOutcome::Failed(NormalizeError::Thumbnail(NormalizeError::chain_message(&e)))
            }
        }
    }

    pub fn thumbnail_job(&self, job: &mut ThumbnailJob) -> ThumbnailOutcome {
        if let Some(existing) = self.existing_thumbnail(&job.thumbnail_path) {
            debug!("縮圖已存在，略過: {}", existing.display());
            job.status = ThumbnailStatus::SkippedExists;
            return ThumbnailOutcome::Skipped(existing);
        }

        let duration = match probe_duration(&self.ffprobe_bin, &job.video_path) {
            Ok(duration) => duration,
            Err(e) => {
                job.status = ThumbnailStatus::Failed;
                return ThumbnailOutcome::Failed(NormalizeError::Probe(
                    NormalizeError::chain_message(&e),
                ));
            }
        };
        let timestamp = sample_timestamp(duration);
        job.timestamp = Some(timestamp);
        job.status = ThumbnailStatus::Running;

        match self.create(job, timestamp) {
            Ok(()) => {
                job.status = ThumbnailStatus::Completed;
                info!("縮圖已建立: {}", job.thumbnail_path.display());
                ThumbnailOutcome::Created(job.thumbnail_path.clone())
            }
            Err(e) => {
                // 失敗時留下的不完整縮圖會讓下次執行誤判為已完成
                if job.thumbnail_path.exists() {
                    if let Err(cleanup) = fs::remove_file(&job.thumbnail_path) {
                        warn!(
                            "無法刪除不完整的縮圖 {}: {cleanup}",
                            job.thumbnail_path.display()
                        );
                    }
                }
                job.status = ThumbnailStatus::Failed;
                ThumbnailOutcome::Failed(NormalizeError::Thumbnail(NormalizeError::chain_message(
                    &e,
                )))
            }
        }
    }

    fn create(&self, job: &ThumbnailJob, timestamp: f64) -> Result<()> {
        if let Some(parent) = job.thumbnail_path.parent() {
            ensure_directory_exists(parent)
                .with_context(|| format!("Failed to create thumbnail directory {}", parent.display()))?;
        }

        let task = ThumbnailTask {
            video_path: job.video_path.clone(),
            timestamp,
            output_path: job.thumbnail_path.clone(),
        };
        extract_thumbnail(&self.ffmpeg_bin, &task, self.width)
    }
}
