use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// 介面語言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    #[value(name = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    #[value(name = "zh-TW")]
    ZhTw,
}

impl Language {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "English"),
            Self::ZhTw => write!(f, "繁體中文"),
        }
    }
}

/// 副檔名對照表（編譯時嵌入）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaExtensionTable {
    #[serde(rename = "SOURCE_VIDEO")]
    pub source_video: Vec<String>,
    #[serde(rename = "CANONICAL_VIDEO")]
    pub canonical_video: String,
    #[serde(rename = "THUMBNAIL")]
    pub thumbnail: String,
    /// 列表 API 視為「已有縮圖」的圖片副檔名
    #[serde(rename = "THUMBNAIL_LOOKUP")]
    pub thumbnail_lookup: Vec<String>,
}

impl MediaExtensionTable {
    #[must_use]
    pub fn is_source_video(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| {
            self.source_video
                .iter()
                .any(|source| source.eq_ignore_ascii_case(&ext))
        })
    }

    #[must_use]
    pub fn is_canonical_video(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| self.canonical_video.eq_ignore_ascii_case(&ext))
    }
}

/// 取得小寫且含前置點的副檔名，例如 `.mov`
#[must_use]
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// ffmpeg 編碼參數
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub movflags: String,
    pub container: String,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
            movflags: "+faststart".to_string(),
            container: "mp4".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// 縮圖根目錄（相對於根目錄）
    pub thumbnail_dir: String,
    /// 不掃描的第一層資料夾名稱
    pub excluded_dirs: Vec<String>,
    pub thumbnail_width: u32,
    pub temp_suffix: String,
    pub lock_suffix: String,
    /// 鎖定檔超過此秒數視為過期
    pub lock_stale_secs: u64,
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
    pub encoding: EncodingSettings,
    pub language: Language,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            thumbnail_dir: ".thumb".to_string(),
            excluded_dirs: vec![
                "tags".to_string(),
                ".trash".to_string(),
                ".thumb".to_string(),
            ],
            thumbnail_width: 160,
            temp_suffix: ".tmp".to_string(),
            lock_suffix: ".lock".to_string(),
            lock_stale_secs: 6 * 60 * 60,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            encoding: EncodingSettings::default(),
            language: Language::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub root_dir: PathBuf,
    pub extension_table: MediaExtensionTable,
    pub settings: UserSettings,
}

impl Config {
    #[must_use]
    pub fn thumbnail_root(&self) -> PathBuf {
        self.root_dir.join(&self.settings.thumbnail_dir)
    }

    /// 掃描時排除的第一層資料夾，包含位於根目錄內的縮圖根目錄
    #[must_use]
    pub fn walk_exclusions(&self) -> HashSet<String> {
        let mut excluded: HashSet<String> = self.settings.excluded_dirs.iter().cloned().collect();
        let thumbnail_root = self.thumbnail_root();
        let first_segment = thumbnail_root
            .strip_prefix(&self.root_dir)
            .ok()
            .and_then(|relative| {
                relative
                    .components()
                    .find(|c| !matches!(c, Component::CurDir))
            })
            .and_then(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            });
        if let Some(name) = first_segment {
            excluded.insert(name.to_string());
        }
        excluded
    }
}
