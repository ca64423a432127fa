use crate::config::EncodingSettings;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 以 `file:` 協定指定路徑，避免檔名中的 `:` 被 ffmpeg 當成協定
#[must_use]
pub fn file_url(path: &Path) -> OsString {
    let mut url = OsString::from("file:");
    url.push(path.as_os_str());
    url
}

/// ffmpeg 參數建構器
///
/// 路徑以獨立參數傳入，不經過 shell，檔名中的引號、空白、`#` 不需跳脫。
pub struct FfmpegCommand {
    program: PathBuf,
    source_path: PathBuf,
    destination_path: PathBuf,
}

impl FfmpegCommand {
    #[must_use]
    pub fn new(program: &Path, source_path: &Path, destination_path: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            source_path: source_path.to_path_buf(),
            destination_path: destination_path.to_path_buf(),
        }
    }

    #[must_use]
    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }

    /// 重新編碼為標準格式，進度輸出到 stdout
    #[must_use]
    pub fn transcode_args(&self, encoding: &EncodingSettings) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-nostdin",
            "-loglevel",
            "error",
            "-y",
            "-progress",
            "pipe:1",
            "-nostats",
            "-i",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        args.push(file_url(&self.source_path));
        let crf = encoding.crf.to_string();
        args.extend(
            [
                "-c:v",
                encoding.video_codec.as_str(),
                "-preset",
                encoding.preset.as_str(),
                "-crf",
                crf.as_str(),
                "-c:a",
                encoding.audio_codec.as_str(),
                "-movflags",
                encoding.movflags.as_str(),
                "-f",
                encoding.container.as_str(),
            ]
            .iter()
            .map(OsString::from),
        );
        args.push(file_url(&self.destination_path));
        args
    }

    /// 於指定時間點擷取單一畫面並縮放到固定寬度（高度依比例）
    #[must_use]
    pub fn frame_args(&self, timestamp: f64, width: u32) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-ss"]
            .iter()
            .map(OsString::from)
            .collect();

        args.push(OsString::from(format!("{timestamp:.3}")));
        args.push(OsString::from("-i"));
        args.push(file_url(&self.source_path));
        let scale = format!("scale={width}:-1");
        args.extend(
            [
                "-frames:v",
                "1",
                "-vf",
                scale.as_str(),
                "-q:v",
                "2",
            ]
            .iter()
            .map(OsString::from),
        );
        args.push(file_url(&self.destination_path));
        args
    }

    #[must_use]
    pub fn build_transcode_command(&self, encoding: &EncodingSettings) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.transcode_args(encoding));
        cmd
    }

    #[must_use]
    pub fn build_frame_command(&self, timestamp: f64, width: u32) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.frame_args(timestamp, width));
        cmd
    }
}
