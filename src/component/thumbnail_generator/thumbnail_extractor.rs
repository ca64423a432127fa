use crate::tools::FfmpegCommand;
use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// 縮圖擷取任務
#[derive(Debug, Clone)]
pub struct ThumbnailTask {
    pub video_path: PathBuf,
    pub timestamp: f64,
    pub output_path: PathBuf,
}

/// 取樣時間點：影片中點，長度為 0 時取 0
#[must_use]
pub fn sample_timestamp(duration_seconds: f64) -> f64 {
    if duration_seconds > 0.0 {
        duration_seconds / 2.0
    } else {
        0.0
    }
}

/// 擷取單一縮圖，直接寫入目的地（不經暫存檔）
pub fn extract_thumbnail(ffmpeg_bin: &Path, task: &ThumbnailTask, width: u32) -> Result<()> {
    debug!(
        "擷取縮圖: {} @ {:.3}s -> {}",
        task.video_path.display(),
        task.timestamp,
        task.output_path.display()
    );

    let output = FfmpegCommand::new(ffmpeg_bin, &task.video_path, &task.output_path)
        .build_frame_command(task.timestamp, width)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run ffmpeg for {}", task.video_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffmpeg exited with {}: {}", output.status, stderr.trim());
    }

    // 確認輸出檔案存在
    if !task.output_path.exists() {
        anyhow::bail!("ffmpeg did not produce {}", task.output_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_timestamp_is_midpoint() {
        assert!((sample_timestamp(10.0) - 5.0).abs() < f64::EPSILON);
        assert!((sample_timestamp(3.5) - 1.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sample_timestamp_zero_duration() {
        assert!(sample_timestamp(0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_extract_with_missing_ffmpeg_fails() {
        let task = ThumbnailTask {
            video_path: PathBuf::from("/test/video.mp4"),
            timestamp: 1.0,
            output_path: PathBuf::from("/test/thumb.jpg"),
        };
        let err = extract_thumbnail(Path::new("/definitely/not/here/ffmpeg"), &task, 160)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to run ffmpeg"));
    }
}
