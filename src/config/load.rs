use crate::config::file_type::load_extension_table;
use crate::config::types::{Config, UserSettings};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 未指定時使用工作目錄下的設定檔
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

impl Config {
    /// 載入設定；設定檔不存在時使用預設值
    pub fn load(root_dir: PathBuf, settings_path: &Path) -> Result<Self> {
        let extension_table = load_extension_table()?;
        let settings = Self::load_settings(settings_path)?;

        Ok(Self {
            root_dir,
            extension_table,
            settings,
        })
    }

    /// 以指定設定建立，不讀取設定檔
    pub fn with_settings(root_dir: PathBuf, settings: UserSettings) -> Result<Self> {
        Ok(Self {
            root_dir,
            extension_table: load_extension_table()?,
            settings,
        })
    }

    fn load_settings(path: &Path) -> Result<UserSettings> {
        if !path.exists() {
            return Ok(UserSettings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }
}
