use crate::tools::ffmpeg_command::file_url;
use anyhow::{Context, Result, bail};
use log::debug;
use std::path::Path;
use std::process::{Command, Stdio};

/// 使用 ffprobe 取得影片長度（秒）
pub fn probe_duration(ffprobe_bin: &Path, path: &Path) -> Result<f64> {
    let output = Command::new(ffprobe_bin)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(file_url(path))
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe exited with {}: {}", output.status, stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let duration = parse_duration(&stdout)?;
    debug!("影片長度 {:.3}s: {}", duration, path.display());
    Ok(duration)
}

/// 解析 ffprobe 輸出的純數字秒數
fn parse_duration(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let duration: f64 = trimmed
        .parse()
        .with_context(|| format!("Failed to parse duration {trimmed:?}"))?;

    if !duration.is_finite() || duration < 0.0 {
        bail!("Invalid duration {trimmed}");
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_decimal() {
        assert!((parse_duration("10.000000\n").unwrap() - 10.0).abs() < f64::EPSILON);
        assert!((parse_duration("  3.5 ").unwrap() - 3.5).abs() < f64::EPSILON);
        assert!(parse_duration("0").unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("N/A").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-1.0").is_err());
        assert!(parse_duration("inf").is_err());
        assert!(parse_duration("NaN").is_err());
    }
}
