use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};

/// ffmpeg `-progress` 輸出中的一行
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressUpdate {
    OutTimeMs(u64),
    Speed(f64),
    End,
}

/// 解析 `key=value` 形式的進度行
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_ms" | "out_time" => parse_out_time_ms(value).map(ProgressUpdate::OutTimeMs),
        "speed" => parse_speed(value).map(ProgressUpdate::Speed),
        "progress" if value == "end" => Some(ProgressUpdate::End),
        _ => None,
    }
}

fn parse_out_time_ms(raw: &str) -> Option<u64> {
    if let Ok(us) = raw.parse::<u64>() {
        return Some(us / 1000); // ffmpeg out_time_ms 單位為微秒
    }

    // 後備：解析 out_time=HH:MM:SS.micro
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() == 3 {
        let h = parts[0].parse::<u64>().ok()?;
        let m = parts[1].parse::<u64>().ok()?;
        let s_part = parts[2];
        let (s, frac) = if let Some((sec, micro)) = s_part.split_once('.') {
            (sec.parse::<u64>().ok()?, micro.parse::<u64>().unwrap_or(0))
        } else {
            (s_part.parse::<u64>().ok()?, 0)
        };
        let total_ms = ((h * 3600 + m * 60 + s) * 1000) + (frac / 1000);
        return Some(total_ms);
    }
    None
}

fn parse_speed(raw: &str) -> Option<f64> {
    raw.trim().trim_end_matches('x').parse::<f64>().ok()
}

/// 建立單一轉檔的進度條；長度未知時顯示 spinner
pub fn create_progress_bar(total_ms: Option<u64>, file_name: &str) -> Result<ProgressBar> {
    let progress_bar = match total_ms {
        Some(total) if total > 0 => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")?
                    .progress_chars("#>-"),
            );
            bar
        }
        _ => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
            );
            spinner
        }
    };
    progress_bar.set_message(file_name.to_string());
    Ok(progress_bar)
}

/// 讀取 ffmpeg 進度輸出直到結束
///
/// 收到中斷信號時回傳 `true`，呼叫端負責終止 ffmpeg。
pub fn follow_progress<R: Read>(
    stdout: R,
    progress_bar: &ProgressBar,
    shutdown_signal: &AtomicBool,
) -> bool {
    let file_name = progress_bar.message();
    for line in BufReader::new(stdout).lines().map_while(std::result::Result::ok) {
        if shutdown_signal.load(Ordering::SeqCst) {
            return true;
        }

        match parse_progress_line(&line) {
            Some(ProgressUpdate::OutTimeMs(ms)) => {
                progress_bar.set_position(ms.min(progress_bar.length().unwrap_or(ms)));
            }
            Some(ProgressUpdate::Speed(speed)) => {
                progress_bar.set_message(format!("{file_name} ({speed:.2}x)"));
            }
            Some(ProgressUpdate::End) | None => {}
        }
        progress_bar.tick();
    }
    shutdown_signal.load(Ordering::SeqCst)
}
