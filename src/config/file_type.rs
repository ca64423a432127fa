use crate::config::types::MediaExtensionTable;
use anyhow::{Context, Result};

/// 編譯時嵌入的副檔名對照表（不需要外部檔案）
const MEDIA_EXTENSION_TABLE_JSON: &str = include_str!("../data/media_extension_table.json");

pub fn load_extension_table() -> Result<MediaExtensionTable> {
    serde_json::from_str(MEDIA_EXTENSION_TABLE_JSON).context("Failed to parse embedded extension table")
}
