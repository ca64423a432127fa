use crate::config::Language;
use crate::config::load::DEFAULT_SETTINGS_FILE;
use clap::Parser;
use std::path::PathBuf;

/// 將舊格式影片轉為 mp4，並為每支 mp4 產生預覽縮圖
#[derive(Debug, Parser)]
#[command(name = "media-normalize", version)]
pub struct Cli {
    /// 媒體根目錄，未指定時使用目前工作目錄
    #[arg(value_name = "ROOT_DIR", env = "ROOT_DIR")]
    pub root_dir: Option<PathBuf>,

    /// 設定檔路徑
    #[arg(short = 's', long = "settings", value_name = "FILE", default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    /// 將預設設定寫入設定檔後結束
    #[arg(long)]
    pub init_settings: bool,

    /// 以 JSON 輸出執行結果
    #[arg(long)]
    pub json: bool,

    /// 介面語言（覆寫設定檔）
    #[arg(long, value_enum)]
    pub language: Option<Language>,
}
