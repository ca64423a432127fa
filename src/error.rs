//! 錯誤分類
//!
//! 前置條件錯誤會中止整個執行；其餘錯誤只影響單一檔案或資料夾，
//! 記錄後繼續處理。

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("ROOT_DIR does not exist: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("ROOT_DIR is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("Required tool {tool} is not available: {detail}")]
    ToolMissing { tool: String, detail: String },

    #[error("Failed to read directory: {0}")]
    Walk(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Failed to get video duration: {0}")]
    Probe(String),

    #[error("Failed to generate thumbnail: {0}")]
    Thumbnail(String),

    #[error("Interrupted")]
    Interrupted,
}

impl NormalizeError {
    /// 前置條件錯誤：中止整個執行並以非零代碼結束
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RootMissing(_) | Self::RootNotDirectory(_) | Self::ToolMissing { .. }
        )
    }

    /// 將 anyhow 錯誤鏈攤平成單行訊息
    pub(crate) fn chain_message(err: &anyhow::Error) -> String {
        format!("{err:#}")
    }
}
