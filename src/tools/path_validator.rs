use crate::error::NormalizeError;
use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

pub fn validate_directory_exists(path: &Path) -> Result<(), NormalizeError> {
    if !path.exists() {
        return Err(NormalizeError::RootMissing(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(NormalizeError::RootNotDirectory(path.to_path_buf()));
    }
    Ok(())
}

pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// 取得相對於根目錄的路徑；不在根目錄內的路徑視為錯誤（防止路徑穿越）
pub fn relative_to_root(root: &Path, path: &Path) -> Result<PathBuf> {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(|_| anyhow!("Path is outside ROOT_DIR: {}", path.display()))
}

/// 在路徑尾端附加後綴，例如 `clip.mp4` + `.tmp` -> `clip.mp4.tmp`
#[must_use]
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}
